//! 클라이언트 세션 상태 기계
//!
//! HELLO → WRQ → DATA* → FIN 순서로 진행하며 각 논리 단계는
//! ARQ 프리미티브(`send_with_retry`)의 1회 요청/응답 교환이다.
//!
//! - HELLO는 seq=0, WRQ는 seq=1
//! - DATA 단계는 seq=0부터 교대 재시작
//! - FIN은 마지막 DATA 다음 교대 비트 사용

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::arq::{send_with_retry, AckReply, RetryPolicy};
use crate::error::{Error, Result};
use crate::pdu::{Pdu, SeqBit};
use crate::stats::TransferStats;
use crate::Config;

/// 클라이언트 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Authenticating,
    Requesting,
    Transferring,
    Closing,
    Done,
    Aborted,
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClientState::Idle => "Idle",
            ClientState::Authenticating => "Authenticating",
            ClientState::Requesting => "Requesting",
            ClientState::Transferring => "Transferring",
            ClientState::Closing => "Closing",
            ClientState::Done => "Done",
            ClientState::Aborted => "Aborted",
        };
        f.write_str(s)
    }
}

/// 파일 데이터를 DATA 블록들로 분할
///
/// 빈 파일도 최소 교환이 정의되도록 빈 블록 1개를 낸다.
pub(crate) fn split_blocks(data: &[u8], block_size: usize) -> Vec<Bytes> {
    if data.is_empty() {
        return vec![Bytes::new()];
    }
    data.chunks(block_size).map(Bytes::copy_from_slice).collect()
}

/// 업로드 전송 (프로세스 호출당 1회)
pub struct Uploader {
    socket: UdpSocket,
    server_addr: SocketAddr,
    credential: String,
    source: PathBuf,
    remote_name: String,
    policy: RetryPolicy,
    block_size: usize,
    state: ClientState,
    stats: TransferStats,
}

impl Uploader {
    /// 새 업로더 생성 (로컬 포트 자동 할당)
    pub async fn new(
        config: &Config,
        server_addr: SocketAddr,
        credential: &str,
        source: &Path,
        remote_name: &str,
    ) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;

        Ok(Self {
            socket,
            server_addr,
            credential: credential.to_string(),
            source: source.to_path_buf(),
            remote_name: remote_name.to_string(),
            policy: config.retry_policy(),
            block_size: config.effective_block_size(),
            state: ClientState::Idle,
            stats: TransferStats::new(),
        })
    }

    /// 현재 상태
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// 전체 업로드 실행
    ///
    /// 성공 시 `Done` 상태로 통계를 반환하고, 어느 단계든 실패하면
    /// `Aborted` 상태로 에러를 반환한다. 서버에는 정리 메시지를 보내지
    /// 않는다 (서버측 유휴 타임아웃에 맡김).
    pub async fn run(&mut self) -> Result<TransferStats> {
        match self.run_inner().await {
            Ok(()) => {
                self.state = ClientState::Done;
                info!(
                    "전송 완료: {} blocks, {} bytes, 재전송 {}회",
                    self.stats.blocks_sent, self.stats.bytes_sent, self.stats.retransmits
                );
                Ok(self.stats.clone())
            }
            Err(e) => {
                warn!("전송 중단 ({}): {}", self.state, e);
                self.state = ClientState::Aborted;
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<()> {
        // 파일은 핸드쉐이크 전에 읽는다. 못 읽으면 서버에 아무것도 보내지 않음
        let data = std::fs::read(&self.source)?;

        // --- 인증 ---
        self.transition(ClientState::Authenticating);
        let reply = self.step(&Pdu::hello(&self.credential)).await?;
        if !reply.payload.is_empty() {
            return Err(Error::AuthRejected {
                reason: String::from_utf8_lossy(&reply.payload).into_owned(),
            });
        }

        // --- 쓰기 요청 ---
        self.transition(ClientState::Requesting);
        let reply = self.step(&Pdu::wrq(&self.remote_name)).await?;
        if !reply.payload.is_empty() {
            return Err(Error::RequestRejected {
                reason: String::from_utf8_lossy(&reply.payload).into_owned(),
            });
        }

        // --- 데이터 전송 (교대 비트는 0부터 재시작) ---
        self.transition(ClientState::Transferring);
        let mut bit = SeqBit::Zero;

        for block in split_blocks(&data, self.block_size) {
            let len = block.len() as u64;
            self.step(&Pdu::data(bit, block)).await?;

            self.stats.blocks_sent += 1;
            self.stats.bytes_sent += len;
            bit = bit.toggle();
        }

        // --- 종료 핸드쉐이크 ---
        self.transition(ClientState::Closing);
        self.step(&Pdu::fin(bit, &self.remote_name)).await?;

        Ok(())
    }

    /// 논리 단계 1회 실행 + 통계 기록
    async fn step(&mut self, pdu: &Pdu) -> Result<AckReply> {
        let reply = send_with_retry(&self.socket, self.server_addr, pdu, &self.policy).await?;
        self.stats.record_step(reply.attempts);
        Ok(reply)
    }

    fn transition(&mut self, next: ClientState) {
        debug!("상태 전이: {} → {}", self.state, next);
        self.state = next;
    }
}
