//! Stop-and-wait ARQ 프리미티브 (클라이언트 역할)
//!
//! 하나의 논리 단계 = PDU 1개 전송 + 일치하는 ACK 대기.
//! 타임아웃 시 동일 PDU 재전송, 시도 횟수 제한 초과 시 실패.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::pdu::{Pdu, PduType};
use crate::MAX_PDU_SIZE;

/// 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 시도당 ACK 대기 시간
    pub ack_timeout: Duration,

    /// 최대 전송 시도 횟수 (최초 전송 포함)
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

/// 일치하는 ACK의 결과
#[derive(Debug, Clone)]
pub struct AckReply {
    /// ACK 페이로드. 비어있으면 성공, 아니면 서버측 에러 메시지
    pub payload: Bytes,

    /// 소요된 전송 시도 횟수
    pub attempts: u32,
}

/// PDU를 전송하고 seq가 일치하는 ACK를 기다린다
///
/// 판정 규칙:
/// - 기대하는 peer가 아닌 출처의 데이터그램은 침묵 폐기
/// - 디코딩 실패, ACK가 아닌 타입, seq 불일치도 침묵 폐기
/// - 불일치 응답을 받아도 타이머는 리셋하지 않는다 (시도당 마감 고정,
///   교차 트래픽이 있어도 총 대기 시간이 유계)
/// - 마감 도달 시 동일 seq로 재전송, `max_attempts` 초과 시 `AckTimeout`
pub async fn send_with_retry(
    socket: &UdpSocket,
    peer: SocketAddr,
    pdu: &Pdu,
    policy: &RetryPolicy,
) -> Result<AckReply> {
    let encoded = pdu.encode()?;
    let mut buf = vec![0u8; MAX_PDU_SIZE];

    for attempt in 1..=policy.max_attempts {
        socket.send_to(&encoded, peer).await?;
        trace!("{} seq={} 전송 (attempt {})", pdu.ty, pdu.seq, attempt);

        // 시도당 마감은 전송 직후 한 번만 고정
        let deadline = Instant::now() + policy.ack_timeout;

        loop {
            let recv = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await;

            let (len, from) = match recv {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_) => {
                    debug!("{} seq={} ACK 타임아웃 (attempt {})", pdu.ty, pdu.seq, attempt);
                    break; // 재전송
                }
            };

            if from != peer {
                trace!("기대하지 않은 peer {}의 데이터그램 폐기", from);
                continue;
            }

            let reply = match Pdu::decode(&buf[..len]) {
                Ok(reply) => reply,
                Err(_) => {
                    trace!("잘린 데이터그램 폐기 ({} bytes)", len);
                    continue;
                }
            };

            if reply.ty != PduType::Ack || reply.seq != pdu.seq {
                trace!(
                    "불일치 응답 폐기: {} seq={} (기대: ACK seq={})",
                    reply.ty,
                    reply.seq,
                    pdu.seq
                );
                continue;
            }

            return Ok(AckReply {
                payload: reply.payload,
                attempts: attempt,
            });
        }
    }

    warn!("{} seq={}: {}회 시도 모두 실패", pdu.ty, pdu.seq, policy.max_attempts);
    Err(Error::AckTimeout {
        attempts: policy.max_attempts,
    })
}
