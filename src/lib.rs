//! # SWP (Stop-and-wait Push Protocol)
//!
//! UDP 기반 stop-and-wait 파일 업로드 프로토콜
//!
//! ## 핵심 특징
//! - **Stop-and-wait ARQ**: 한 번에 하나의 PDU만 전송, ACK 대기 후 다음 전송
//! - **교대 비트 (alternating bit)**: 1비트 시퀀스로 중복/순서이탈 판별
//! - **인증 핸드쉐이크**: HELLO(credential) → WRQ(filename) → DATA* → FIN
//! - **타임아웃 재전송**: ACK 미수신 시 동일 PDU 재전송, 시도 횟수 제한
//! - **다중 클라이언트**: 서버는 peer 주소별 독립 세션 테이블 유지
//! - **침묵 폐기(silent discard)**: 순서 위반 요청에는 응답하지 않음

pub mod arq;
pub mod client;
pub mod config;
pub mod error;
pub mod pdu;
pub mod server;
pub mod stats;
pub mod validate;

pub use arq::{send_with_retry, AckReply, RetryPolicy};
pub use client::{ClientState, Uploader};
pub use config::Config;
pub use error::{Error, Result};
pub use pdu::{Pdu, PduType, SeqBit};
pub use server::Server;
pub use stats::{ServerStats, TransferStats};

/// PDU 헤더 크기 (type 1바이트 + seq 1바이트)
pub const HEADER_SIZE: usize = 2;

/// 최대 페이로드 크기 (바이트)
///
/// 헤더 포함 1480바이트로 일반적인 링크 MTU 아래에서 IP 단편화 없이 전송
pub const MAX_PAYLOAD_SIZE: usize = 1478;

/// 최대 PDU 크기 (헤더 + 페이로드)
pub const MAX_PDU_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// 기본 서버 포트
pub const DEFAULT_SERVER_PORT: u16 = 20252;
