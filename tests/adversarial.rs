//! 적대적 peer 시나리오 테스트
//!
//! - 각본대로 움직이는 가짜 서버로 클라이언트의 재전송 규율 검증
//! - 소켓 너머의 진짜 서버에 순서 위반 PDU를 보내 침묵 폐기 검증

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tempfile::TempDir;
use tokio::net::UdpSocket;

use swp::{Config, Pdu, PduType, SeqBit, Server, Uploader, MAX_PDU_SIZE};

fn fast_config() -> Config {
    Config {
        ack_timeout_ms: 200,
        max_attempts: 5,
        ..Config::default()
    }
}

async fn recv_pdu(socket: &UdpSocket) -> (Pdu, SocketAddr) {
    let mut buf = vec![0u8; MAX_PDU_SIZE];
    let (len, from) = socket.recv_from(&mut buf).await.unwrap();
    (Pdu::decode(&buf[..len]).unwrap(), from)
}

async fn send_ack(socket: &UdpSocket, to: SocketAddr, seq: u8) {
    let ack = Pdu::ack(seq, "").encode().unwrap();
    socket.send_to(&ack, to).await.unwrap();
}

/// 각본 서버에 대고 업로드를 실행하는 클라이언트 태스크
fn spawn_uploader(
    server_addr: SocketAddr,
    data: &[u8],
    dir: &TempDir,
) -> tokio::task::JoinHandle<swp::Result<swp::TransferStats>> {
    let source = dir.path().join("src.bin");
    std::fs::write(&source, data).unwrap();

    tokio::spawn(async move {
        let mut uploader =
            Uploader::new(&fast_config(), server_addr, "secret", &source, "dest.bin").await?;
        uploader.run().await
    })
}

#[tokio::test]
async fn test_dropped_data_ack_retransmits_identical_block() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let peer_addr = peer.local_addr().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let client = spawn_uploader(peer_addr, b"only block", &dir);

    // HELLO, WRQ는 정상 수락
    let (hello, from) = recv_pdu(&peer).await;
    assert_eq!(hello.ty, PduType::Hello);
    send_ack(&peer, from, hello.seq).await;

    let (wrq, from) = recv_pdu(&peer).await;
    assert_eq!(wrq.ty, PduType::Wrq);
    send_ack(&peer, from, wrq.seq).await;

    // 첫 DATA의 ACK를 유실시킨다
    let (data1, _) = recv_pdu(&peer).await;
    assert_eq!(data1.ty, PduType::Data);
    assert_eq!(data1.seq, 0);

    // 재전송은 seq와 페이로드가 원본과 동일해야 한다
    let (data2, from) = recv_pdu(&peer).await;
    assert_eq!(data2, data1);
    send_ack(&peer, from, data2.seq).await;

    let (fin, from) = recv_pdu(&peer).await;
    assert_eq!(fin.ty, PduType::Fin);
    assert_eq!(fin.seq, 1);
    send_ack(&peer, from, fin.seq).await;

    let stats = client.await.unwrap().unwrap();
    assert_eq!(stats.retransmits, 1);
}

#[tokio::test]
async fn test_delayed_ack_beyond_deadline_is_harmless() {
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let peer_addr = peer.local_addr().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let client = spawn_uploader(peer_addr, b"slow ack", &dir);

    let (hello, from) = recv_pdu(&peer).await;
    send_ack(&peer, from, hello.seq).await;
    let (wrq, from) = recv_pdu(&peer).await;
    send_ack(&peer, from, wrq.seq).await;

    // 첫 DATA의 ACK를 마감 이후에야 보낸다
    let (data1, from) = recv_pdu(&peer).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    send_ack(&peer, from, data1.seq).await;

    // 클라이언트는 이미 재전송했을 것. 늦은 ACK가 재전송의 ACK로
    // 수용되어도 상태는 깨지지 않는다
    loop {
        let (pdu, from) = recv_pdu(&peer).await;
        match pdu.ty {
            PduType::Data => {
                // 늦은 ACK가 소비되기 전에 도착한 재전송
                assert_eq!(pdu, data1);
            }
            PduType::Fin => {
                send_ack(&peer, from, pdu.seq).await;
                break;
            }
            other => panic!("unexpected pdu: {other}"),
        }
    }

    client.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_ack_exhaustion_aborts_client() {
    // 어떤 응답도 하지 않는 peer
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let peer_addr = peer.local_addr().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let client = spawn_uploader(peer_addr, b"never acked", &dir);
    let err = client.await.unwrap().unwrap_err();
    assert!(matches!(err, swp::Error::AckTimeout { attempts: 5 }));
}

// ── 진짜 서버에 대한 순서 위반 시나리오 ──

async fn spawn_real_server() -> (SocketAddr, Arc<Server>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    let server = Arc::new(Server::new(Config {
        credential: "secret".to_string(),
        upload_dir: dir.path().to_path_buf(),
        ..Config::default()
    }));

    let server_task = server.clone();
    tokio::spawn(async move {
        let _ = server_task.run(&socket).await;
    });

    (addr, server, dir)
}

/// 지정 시간 안에 아무 응답도 오지 않아야 한다
async fn assert_no_reply(socket: &UdpSocket) {
    let mut buf = vec![0u8; MAX_PDU_SIZE];
    let result = tokio::time::timeout(Duration::from_millis(300), socket.recv_from(&mut buf)).await;
    assert!(result.is_err(), "침묵해야 할 상황에서 응답이 도착");
}

#[tokio::test]
async fn test_wrq_before_hello_gets_no_reply() {
    let (addr, server, dir) = spawn_real_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let wrq = Pdu::wrq("data.bin").encode().unwrap();
    socket.send_to(&wrq, addr).await.unwrap();

    assert_no_reply(&socket).await;
    assert!(!dir.path().join("data.bin").exists());
    assert!(server.get_stats().state_violations >= 1);
}

#[tokio::test]
async fn test_data_before_wrq_gets_no_reply() {
    let (addr, _server, dir) = spawn_real_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    // HELLO는 수락시키고 WRQ 없이 바로 DATA
    let hello = Pdu::hello("secret").encode().unwrap();
    socket.send_to(&hello, addr).await.unwrap();
    let mut buf = vec![0u8; MAX_PDU_SIZE];
    socket.recv_from(&mut buf).await.unwrap();

    let data = Pdu::data(SeqBit::Zero, Bytes::from_static(b"stray")).encode().unwrap();
    socket.send_to(&data, addr).await.unwrap();

    assert_no_reply(&socket).await;
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_out_of_order_first_data_not_written() {
    let (addr, _server, dir) = spawn_real_server().await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut buf = vec![0u8; MAX_PDU_SIZE];

    socket.send_to(&Pdu::hello("secret").encode().unwrap(), addr).await.unwrap();
    socket.recv_from(&mut buf).await.unwrap();
    socket.send_to(&Pdu::wrq("dest.bin").encode().unwrap(), addr).await.unwrap();
    socket.recv_from(&mut buf).await.unwrap();

    // 첫 DATA를 seq=1로 보낸다 (기대는 0)
    let bad = Pdu::data(SeqBit::One, Bytes::from_static(b"wrong")).encode().unwrap();
    socket.send_to(&bad, addr).await.unwrap();
    assert_no_reply(&socket).await;

    // 파일은 비어 있어야 한다
    assert_eq!(std::fs::read(dir.path().join("dest.bin")).unwrap(), b"");

    // 올바른 seq=0 블록은 정상 수락
    let good = Pdu::data(SeqBit::Zero, Bytes::from_static(b"right")).encode().unwrap();
    socket.send_to(&good, addr).await.unwrap();
    let (len, _) = socket.recv_from(&mut buf).await.unwrap();
    let ack = Pdu::decode(&buf[..len]).unwrap();
    assert_eq!(ack.ty, PduType::Ack);
    assert_eq!(ack.seq, 0);

    assert_eq!(std::fs::read(dir.path().join("dest.bin")).unwrap(), b"right");
}
