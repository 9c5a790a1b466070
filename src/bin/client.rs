//! SWP 클라이언트 - Stop-and-wait Push Protocol
//!
//! 파일 1개를 서버로 업로드하는 클라이언트 (프로세스 호출당 1회 전송)
//!
//! 종료 코드:
//!   0  전송 완료 (FIN까지 ACK됨)
//!   1  타임아웃 또는 기타 실패
//!   2  credential 거부
//!   3  filename 거부
//!   64 사용법 오류
//!
//! 사용법:
//!   cargo run --release --bin swp-client -- [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin swp-client -- -s 127.0.0.1:20252 \
//!       -c g21-0e29 -f local.bin -n remote.bin

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use swp::{Config, Error, Uploader, DEFAULT_SERVER_PORT};

/// 클라이언트 실행 설정
struct ClientConfig {
    server_addr: SocketAddr,
    credential: Option<String>,
    source: Option<PathBuf>,
    remote_name: Option<String>,
    config: Config,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: format!("127.0.0.1:{DEFAULT_SERVER_PORT}").parse().unwrap(),
            credential: None,
            source: None,
            remote_name: None,
            config: Config::default(),
        }
    }
}

fn parse_args() -> ClientConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ClientConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--server" | "-s" => {
                if i + 1 < args.len() {
                    config.server_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--credential" | "-c" => {
                if i + 1 < args.len() {
                    config.credential = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    config.source = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--name" | "-n" => {
                if i + 1 < args.len() {
                    config.remote_name = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--timeout" => {
                if i + 1 < args.len() {
                    config.config.ack_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--attempts" => {
                if i + 1 < args.len() {
                    config.config.max_attempts = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"SWP Client - Stop-and-wait Push Protocol 클라이언트

UDP 기반 교대 비트 파일 업로드 클라이언트
- HELLO → WRQ → DATA* → FIN, 각 단계 stop-and-wait ACK
- ACK 미수신 시 동일 PDU 재전송 (기본 1초 타임아웃, 최대 5회)

사용법:
  cargo run --release --bin swp-client -- [OPTIONS]

옵션:
  -s, --server <ADDR>      서버 주소 (기본: 127.0.0.1:20252)
  -c, --credential <STR>   인증 credential (필수, 10자 이하)
  -f, --file <PATH>        업로드할 로컬 파일 (필수)
  -n, --name <STR>         서버측 파일 이름 (필수, 4~10자)
  --timeout <MS>           시도당 ACK 타임아웃 밀리초 (기본: 1000)
  --attempts <N>           단계당 최대 시도 횟수 (기본: 5)
  -h, --help               이 도움말 출력

예시:
  cargo run --release --bin swp-client -- -c g21-0e29 -f data.bin -n remote.bin
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
async fn main() {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("로깅 초기화 실패");
    }

    let client_config = parse_args();

    let (credential, source, remote_name) = match (
        &client_config.credential,
        &client_config.source,
        &client_config.remote_name,
    ) {
        (Some(c), Some(f), Some(n)) => (c.clone(), f.clone(), n.clone()),
        _ => {
            error!("--credential, --file, --name 모두 필요 (--help 참조)");
            std::process::exit(64);
        }
    };

    info!("SWP Client starting...");
    info!("Server: {}", client_config.server_addr);
    info!("Source: {:?} -> {}", source, remote_name);

    let mut uploader = match Uploader::new(
        &client_config.config,
        client_config.server_addr,
        &credential,
        &source,
        &remote_name,
    )
    .await
    {
        Ok(uploader) => uploader,
        Err(e) => {
            error!("초기화 실패: {}", e);
            std::process::exit(1);
        }
    };

    match uploader.run().await {
        Ok(stats) => {
            info!(
                "Upload complete: {} bytes in {} blocks ({:.1} KB/s)",
                stats.bytes_sent,
                stats.blocks_sent,
                stats.throughput() / 1024.0
            );
            std::process::exit(0);
        }
        Err(Error::AuthRejected { reason }) => {
            error!("서버가 credential을 거부: {}", reason);
            std::process::exit(2);
        }
        Err(Error::RequestRejected { reason }) => {
            error!("서버가 filename을 거부: {}", reason);
            std::process::exit(3);
        }
        Err(e) => {
            error!("전송 실패: {}", e);
            std::process::exit(1);
        }
    }
}
