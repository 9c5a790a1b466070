//! 전송 통계

use std::time::Instant;

/// 클라이언트측 전송 통계 (프로세스당 1회 전송)
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 전송 시작 시간
    pub started_at: Instant,

    /// ACK까지 완료된 DATA 블록 수
    pub blocks_sent: u64,

    /// ACK까지 완료된 페이로드 바이트 수
    pub bytes_sent: u64,

    /// 전체 전송 시도 수 (재전송 포함, 모든 단계 합산)
    pub attempts: u64,

    /// 재전송 횟수 (attempts - 논리 단계 수)
    pub retransmits: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            blocks_sent: 0,
            bytes_sent: 0,
            attempts: 0,
            retransmits: 0,
        }
    }

    /// 단계 완료 기록
    pub fn record_step(&mut self, attempts: u32) {
        self.attempts += attempts as u64;
        self.retransmits += attempts.saturating_sub(1) as u64;
    }

    /// 처리량 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.bytes_sent as f64 / elapsed
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

/// 서버측 누적 통계
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// 수신한 데이터그램 수
    pub datagrams: u64,

    /// 생성된 세션 수
    pub sessions_created: u64,

    /// FIN까지 완료된 전송 수
    pub completed_transfers: u64,

    /// 파일에 기록된 바이트 수
    pub bytes_written: u64,

    /// 재전송 중복으로 재ACK한 DATA 블록 수
    pub duplicate_blocks: u64,

    /// 순서이탈로 폐기한 DATA 블록 수
    pub out_of_order_blocks: u64,

    /// 거부된 HELLO 수
    pub rejected_hello: u64,

    /// 거부된 WRQ 수
    pub rejected_wrq: u64,

    /// 상태 위반으로 침묵 폐기한 PDU 수
    pub state_violations: u64,

    /// 잘렸거나 알 수 없는 타입의 데이터그램 수
    pub malformed: u64,

    /// 유휴 타임아웃으로 퇴거된 세션 수
    pub evicted_sessions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_step_counts_retransmits() {
        let mut stats = TransferStats::new();
        stats.record_step(1);
        stats.record_step(3);
        assert_eq!(stats.attempts, 4);
        assert_eq!(stats.retransmits, 2);
    }
}
