//! 에러 타입 정의

use thiserror::Error;

/// SWP 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("페이로드 초과: {len} > 1478 bytes")]
    OversizedPayload { len: usize },

    #[error("잘린 데이터그램: {len} bytes (최소 2 필요)")]
    Truncated { len: usize },

    #[error("인증 거부: {reason}")]
    AuthRejected { reason: String },

    #[error("요청 거부: {reason}")]
    RequestRejected { reason: String },

    #[error("ACK 타임아웃: {attempts}회 시도 후 포기")]
    AckTimeout { attempts: u32 },

    #[error("세션 상태 위반: {got} 수신 (현재 상태 {state})")]
    SessionStateViolation { state: String, got: String },

    #[error("유효하지 않은 주소: {0}")]
    InvalidAddress(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
