//! SWP 서버 - Stop-and-wait Push Protocol
//!
//! 여러 클라이언트의 파일 업로드를 동시에 수신하는 UDP 서버
//! - peer 주소별 독립 세션, 교대 비트로 중복/순서이탈 판별
//! - 순서 위반 요청은 침묵 폐기
//!
//! 사용법:
//!   cargo run --release --bin swp-server -- [OPTIONS]
//!
//! 예시:
//!   # 기본 포트(20252)로 수신
//!   cargo run --release --bin swp-server -- --credential g21-0e29
//!
//!   # 업로드 디렉터리 지정
//!   cargo run --release --bin swp-server -- -d uploads --bind 0.0.0.0:20252

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::net::UdpSocket;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use swp::{Config, Server, DEFAULT_SERVER_PORT};

/// 서버 실행 설정
struct ServerConfig {
    bind_addr: SocketAddr,
    config: Config,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_SERVER_PORT}").parse().unwrap(),
            config: Config::default(),
        }
    }
}

fn parse_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ServerConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--credential" | "-c" => {
                if i + 1 < args.len() {
                    config.config.credential = args[i + 1].clone();
                    i += 1;
                }
            }
            "--dir" | "-d" => {
                if i + 1 < args.len() {
                    config.config.upload_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--idle-timeout" => {
                if i + 1 < args.len() {
                    config.config.idle_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"SWP Server - Stop-and-wait Push Protocol 서버

UDP 기반 교대 비트 파일 업로드 프로토콜 서버
- 다중 클라이언트 동시 수신 (peer 주소별 독립 세션)
- HELLO(credential) / WRQ(filename) 검증, 순서 위반은 침묵 폐기

사용법:
  cargo run --release --bin swp-server -- [OPTIONS]

옵션:
  -b, --bind <ADDR>        바인드 주소 (기본: 0.0.0.0:20252)
  -c, --credential <STR>   기대하는 credential (10자 이하)
  -d, --dir <PATH>         업로드 저장 디렉터리 (기본: .)
  --idle-timeout <MS>      유휴 세션 퇴거 타임아웃 밀리초 (기본: 30000)
  -h, --help               이 도움말 출력

예시:
  # 기본 설정으로 실행
  cargo run --release --bin swp-server

  # 업로드 디렉터리와 credential 지정
  cargo run --release --bin swp-server -- -d uploads -c g21-0e29
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let server_config = parse_args();

    info!("SWP Server starting...");
    info!("Bind address: {}", server_config.bind_addr);
    info!("Upload dir: {:?}", server_config.config.upload_dir);
    info!(
        "Idle timeout: {} ms",
        server_config.config.idle_timeout_ms
    );

    std::fs::create_dir_all(&server_config.config.upload_dir)?;

    let socket = UdpSocket::bind(server_config.bind_addr).await?;
    let server = Server::new(server_config.config);

    tokio::select! {
        result = server.run(&socket) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
        }
    }

    // 열린 파일 핸들 정리 + 통계 요약
    server.shutdown();
    Ok(())
}
