//! 프로토콜 설정

use std::path::PathBuf;
use std::time::Duration;

use crate::arq::RetryPolicy;
use crate::MAX_PAYLOAD_SIZE;

/// SWP 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 시도당 ACK 대기 타임아웃 (밀리초)
    pub ack_timeout_ms: u64,

    /// 논리 단계당 최대 전송 시도 횟수 (최초 전송 포함)
    pub max_attempts: u32,

    /// DATA 블록 크기 (바이트, 최대 1478)
    pub block_size: usize,

    /// 서버측 유휴 세션 퇴거 타임아웃 (밀리초)
    pub idle_timeout_ms: u64,

    /// 유휴 세션 점검 주기 (밀리초)
    pub sweep_interval_ms: u64,

    /// 수신 버퍼 크기 (최대 PDU보다 크게)
    pub recv_buffer_size: usize,

    /// 서버가 기대하는 credential
    pub credential: String,

    /// 업로드 파일 저장 디렉터리 (서버측)
    pub upload_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 1000,             // 1초
            max_attempts: 5,
            block_size: MAX_PAYLOAD_SIZE,     // 1478
            idle_timeout_ms: 30_000,          // 30초
            sweep_interval_ms: 1000,
            recv_buffer_size: 2048,
            credential: "g21-0e29".to_string(),
            upload_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 클라이언트 ARQ 재시도 정책
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
            max_attempts: self.max_attempts,
        }
    }

    /// 유휴 세션 타임아웃
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// 블록 크기 (1478 초과 금지)
    pub fn effective_block_size(&self) -> usize {
        self.block_size.clamp(1, MAX_PAYLOAD_SIZE)
    }

    /// 손실 많은 네트워크용 설정
    pub fn lossy_network() -> Self {
        Self {
            ack_timeout_ms: 2000,             // 2초
            max_attempts: 8,
            block_size: 1024,                 // 작은 블록
            idle_timeout_ms: 60_000,          // 60초
            ..Self::default()
        }
    }
}
