//! 서버 세션 테이블과 수신 루프
//!
//! 단일 수신 루프가 도착한 데이터그램마다 출처 주소로 세션을
//! 조회/생성하여 디스패치한다. 세션은 peer별로 완전히 독립이며
//! 목적지 파일 핸들은 해당 세션이 배타적으로 소유한다.
//!
//! 순서 위반 요청(인증 전 WRQ, WRQ 전 DATA)은 응답 없이 폐기한다.
//! 미인증 송신자에게 프로토콜 상태를 노출하지 않기 위한 의도된 동작.

use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::pdu::{Pdu, PduType, SeqBit};
use crate::stats::ServerStats;
use crate::validate::{check_credential, check_filename};
use crate::{Config, MAX_PDU_SIZE};

/// 세션 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// 첫 데이터그램 수신, 아직 인증 전
    New,

    /// HELLO 수락됨
    Authenticated,

    /// WRQ 수락됨, 파일 핸들 열림
    Receiving,
}

/// peer별 세션 (첫 데이터그램 수신 시 생성)
struct Session {
    state: SessionState,

    /// WRQ 수락 시 열리는 목적지 파일 (세션이 배타 소유)
    file: Option<File>,

    /// 수락된 filename
    filename: Option<String>,

    /// 다음에 기대하는 DATA 교대 비트
    expected: SeqBit,

    /// 마지막으로 수락한 비트 (중복 판별용, DATA 수락 전에는 None)
    last_accepted: Option<SeqBit>,

    /// 유휴 퇴거용 최근 활동 시각
    last_activity: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            state: SessionState::New,
            file: None,
            filename: None,
            expected: SeqBit::Zero,
            last_accepted: None,
            last_activity: Instant::now(),
        }
    }
}

/// SWP 서버
pub struct Server {
    config: Config,
    sessions: DashMap<SocketAddr, Session>,
    stats: RwLock<ServerStats>,
    running: AtomicBool,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            stats: RwLock::new(ServerStats::default()),
            running: AtomicBool::new(false),
        }
    }

    /// 수신 루프 실행
    ///
    /// 데이터그램 처리와 유휴 세션 점검 외에는 블록하지 않는다.
    /// 한 peer의 오류가 프로세스를 중단시키지 않는다.
    pub async fn run(&self, socket: &UdpSocket) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);

        let mut buf = vec![0u8; MAX_PDU_SIZE.max(self.config.recv_buffer_size)];
        let mut sweep = tokio::time::interval(Duration::from_millis(self.config.sweep_interval_ms));

        info!("SWP Server listening on {}", socket.local_addr()?);

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, addr)) => {
                            if let Some(reply) = self.dispatch(&buf[..len], addr) {
                                match reply.encode() {
                                    Ok(bytes) => {
                                        if let Err(e) = socket.send_to(&bytes, addr).await {
                                            warn!("{} ACK 전송 실패: {}", addr, e);
                                        }
                                    }
                                    Err(e) => warn!("ACK 인코딩 실패: {}", e),
                                }
                            }
                        }
                        Err(e) => warn!("수신 에러: {}", e),
                    }
                }
                _ = sweep.tick() => {
                    self.evict_idle();
                }
            }
        }

        Ok(())
    }

    /// 데이터그램 1개 처리, 회신할 ACK 반환
    ///
    /// 세션 상태 변경과 파일 쓰기는 모두 여기서 동기적으로 끝난다.
    /// 회신 전송은 세션 가드를 놓은 뒤 호출측에서 수행.
    fn dispatch(&self, datagram: &[u8], addr: SocketAddr) -> Option<Pdu> {
        self.stats.write().datagrams += 1;

        let pdu = match Pdu::decode(datagram) {
            Ok(pdu) => pdu,
            Err(_) => {
                debug!("{}: 잘린 데이터그램 폐기 ({} bytes)", addr, datagram.len());
                self.stats.write().malformed += 1;
                return None;
            }
        };

        match pdu.ty {
            PduType::Hello => self.handle_hello(&pdu, addr),
            PduType::Wrq => self.handle_wrq(&pdu, addr),
            PduType::Data => self.handle_data(&pdu, addr),
            PduType::Fin => self.handle_fin(&pdu, addr),
            PduType::Ack => {
                debug!("{}: 예상 밖의 ACK 폐기", addr);
                self.stats.write().state_violations += 1;
                None
            }
            PduType::Unknown(code) => {
                debug!("{}: 알 수 없는 타입 {} 폐기", addr, code);
                self.stats.write().malformed += 1;
                None
            }
        }
    }

    /// HELLO: credential 검증 (상태와 무관하게 반복 가능)
    ///
    /// 수락이든 거부든 수신한 seq를 그대로 에코하여 응답한다.
    fn handle_hello(&self, pdu: &Pdu, addr: SocketAddr) -> Option<Pdu> {
        match check_credential(&pdu.payload, &self.config.credential) {
            Ok(()) => {
                let mut session = self.sessions.entry(addr).or_insert_with(|| {
                    self.stats.write().sessions_created += 1;
                    debug!("{}: 세션 생성", addr);
                    Session::new()
                });
                session.last_activity = Instant::now();
                if session.state == SessionState::New {
                    session.state = SessionState::Authenticated;
                    info!("{}: 인증 성공", addr);
                }
                Some(Pdu::ack(pdu.seq, ""))
            }
            Err(reason) => {
                info!("{}: 인증 거부 ({})", addr, reason);
                self.stats.write().rejected_hello += 1;
                // 남아있던 세션은 초기화
                self.sessions.remove(&addr);
                Some(Pdu::ack(pdu.seq, reason.as_str()))
            }
        }
    }

    /// WRQ: 인증된 peer만. 미인증이면 응답 없이 폐기
    fn handle_wrq(&self, pdu: &Pdu, addr: SocketAddr) -> Option<Pdu> {
        let mut session = match self.sessions.get_mut(&addr) {
            Some(s) if s.state != SessionState::New => s,
            _ => {
                debug!("{}: 인증 전 WRQ 침묵 폐기", addr);
                self.stats.write().state_violations += 1;
                return None;
            }
        };
        session.last_activity = Instant::now();

        let name = match check_filename(&pdu.payload) {
            Ok(name) => name.to_string(),
            Err(reason) => {
                info!("{}: WRQ 거부 ({})", addr, reason);
                self.stats.write().rejected_wrq += 1;
                return Some(Pdu::ack(pdu.seq, reason.as_str()));
            }
        };

        // WRQ 재전송(ACK 유실)이어도 동작이 같도록 truncate로 연다
        let path = self.destination_path(&name);
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!("{}: 파일 열기 실패 {:?}: {}", addr, path, e);
                self.stats.write().rejected_wrq += 1;
                return Some(Pdu::ack(pdu.seq, "server error"));
            }
        };

        info!("{}: WRQ 수락, 파일 {:?} 열림", addr, path);
        session.file = Some(file);
        session.filename = Some(name);
        session.state = SessionState::Receiving;
        session.expected = SeqBit::Zero;
        session.last_accepted = None;

        Some(Pdu::ack(pdu.seq, ""))
    }

    /// DATA: 수락된 WRQ 이후에만. 교대 비트로 중복/순서이탈 판별
    fn handle_data(&self, pdu: &Pdu, addr: SocketAddr) -> Option<Pdu> {
        let mut session = match self.sessions.get_mut(&addr) {
            Some(s) if s.state == SessionState::Receiving => s,
            _ => {
                debug!("{}: WRQ 전 DATA 침묵 폐기", addr);
                self.stats.write().state_violations += 1;
                return None;
            }
        };
        session.last_activity = Instant::now();

        // 직전에 수락한 블록의 재전송: 다시 쓰지 않고 ACK만 재전송
        if session.last_accepted.is_some_and(|last| last.matches(pdu.seq)) {
            debug!("{}: 중복 DATA seq={} 재ACK", addr, pdu.seq);
            self.stats.write().duplicate_blocks += 1;
            return Some(Pdu::ack(pdu.seq, ""));
        }

        if session.expected.matches(pdu.seq) {
            let file = session.file.as_mut()?;
            if let Err(e) = file.write_all(&pdu.payload).and_then(|()| file.flush()) {
                warn!("{}: 파일 쓰기 실패: {}", addr, e);
                // 쓰지 못한 블록은 ACK하지 않는다. 클라이언트가 재전송
                return None;
            }

            {
                let mut stats = self.stats.write();
                stats.bytes_written += pdu.payload.len() as u64;
            }

            session.last_accepted = Some(session.expected);
            session.expected = session.expected.toggle();
            return Some(Pdu::ack(pdu.seq, ""));
        }

        // expected도 last_accepted도 아님 (0/1 밖의 seq 포함): 침묵 폐기
        debug!(
            "{}: 순서이탈 DATA seq={} 폐기 (expected {})",
            addr, pdu.seq, session.expected
        );
        self.stats.write().out_of_order_blocks += 1;
        None
    }

    /// FIN: 상태와 무관하게 ACK, 파일 닫고 세션 제거
    fn handle_fin(&self, pdu: &Pdu, addr: SocketAddr) -> Option<Pdu> {
        if let Some((_, session)) = self.sessions.remove(&addr) {
            if session.state == SessionState::Receiving {
                self.stats.write().completed_transfers += 1;
                info!(
                    "{}: FIN, 전송 완료 ({})",
                    addr,
                    session.filename.as_deref().unwrap_or("?")
                );
            } else {
                debug!("{}: FIN, 전송 없이 세션 종료", addr);
            }
            // session drop으로 파일 핸들 닫힘
        }
        Some(Pdu::ack(pdu.seq, ""))
    }

    /// 유휴 세션 퇴거 (FIN 없이 떠난 peer의 자원 회수)
    fn evict_idle(&self) {
        let idle_timeout = self.config.idle_timeout();
        let mut evicted = 0u64;

        self.sessions.retain(|addr, session| {
            if session.last_activity.elapsed() > idle_timeout {
                warn!("{}: 유휴 세션 퇴거", addr);
                evicted += 1;
                false
            } else {
                true
            }
        });

        if evicted > 0 {
            self.stats.write().evicted_sessions += evicted;
        }
    }

    fn destination_path(&self, name: &str) -> PathBuf {
        self.config.upload_dir.join(name)
    }

    /// 중지 요청 (수신 루프가 점검 주기 내에 종료)
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// 세션 정리와 통계 요약 (종료 시 호출)
    pub fn shutdown(&self) {
        self.stop();
        let open = self.sessions.len();
        self.sessions.clear();

        let stats = self.stats.read();
        info!(
            "서버 종료: 세션 {}개 정리, 전송 완료 {}, 기록 {} bytes, 중복 {}, 순서이탈 {}",
            open,
            stats.completed_transfers,
            stats.bytes_written,
            stats.duplicate_blocks,
            stats.out_of_order_blocks
        );
    }

    /// 현재 세션 수
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// 통계 반환
    pub fn get_stats(&self) -> ServerStats {
        self.stats.read().clone()
    }
}
