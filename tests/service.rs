use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use collatz_bench::collatz::{sequential_average, Collatz};
use collatz_bench::service::client::{query, ClientError};
use collatz_bench::service::{bind, serve, ServiceError, MAX_REQUEST_LEN};
use utils::TestHelper;

mod utils;

/// Start the service on an ephemeral port and return its address.
async fn start_service() -> SocketAddr {
    TestHelper::setup();
    let listener = bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener));
    addr
}

/// Send `request` verbatim and return every byte the server writes before closing.
async fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

fn is_two_decimals_line(response: &str) -> bool {
    let Some(body) = response.strip_suffix('\n') else {
        return false;
    };
    let Some((int, frac)) = body.split_once('.') else {
        return false;
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.len() == 2
        && frac.bytes().all(|b| b.is_ascii_digit())
}

#[tokio::test]
async fn valid_request() {
    let addr = start_service().await;
    let response = exchange(addr, b"5\n").await;
    let response = String::from_utf8(response).unwrap();

    assert!(is_two_decimals_line(&response), "{response:?}");
    let expected = sequential_average(5, &Collatz::default()).unwrap().unwrap();
    assert_eq!(response, format!("{expected:.2}\n"));
    assert_eq!(response, "3.00\n");
}

#[tokio::test]
async fn known_averages() {
    let addr = start_service().await;
    assert_eq!(exchange(addr, b"10\n").await, b"6.70\n");
    assert_eq!(exchange(addr, b"1\n").await, b"0.00\n");
    assert_eq!(exchange(addr, b" 27 \r\n").await.last(), Some(&b'\n'));
}

#[tokio::test]
async fn negative_request_closes_silently() {
    let addr = start_service().await;
    assert!(exchange(addr, b"-3\n").await.is_empty());
    assert!(exchange(addr, b"0\n").await.is_empty());
}

#[tokio::test]
async fn non_numeric_request_closes_silently() {
    let addr = start_service().await;
    assert!(exchange(addr, b"abc\n").await.is_empty());
    assert!(exchange(addr, b"\n").await.is_empty());
    assert!(exchange(addr, b"12abc\n").await.is_empty());
}

#[tokio::test]
async fn unterminated_request_closes_silently() {
    let addr = start_service().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"5").await.unwrap();
    stream.shutdown().await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn zero_padded_request() {
    let addr = start_service().await;
    let request = format!("{}5\n", "0".repeat(70));
    assert_eq!(exchange(addr, request.as_bytes()).await, b"3.00\n");
    assert_eq!(query(addr, &format!("{}5", "0".repeat(200))).await.unwrap(), 3.0);
}

#[tokio::test]
async fn oversized_request_closes_cleanly() {
    let addr = start_service().await;
    let request = format!("{}5\n", "0".repeat(2 * MAX_REQUEST_LEN as usize));
    // the server must not reset the connection while part of the request is unread
    assert!(exchange(addr, request.as_bytes()).await.is_empty());
    assert!(matches!(
        query(addr, &"7".repeat(3 * MAX_REQUEST_LEN as usize)).await,
        Err(ClientError::Rejected)
    ));
}

#[tokio::test]
async fn trailing_bytes_are_discarded() {
    let addr = start_service().await;
    assert!(exchange(addr, b"abc\nsome more garbage\n").await.is_empty());
    assert!(exchange(addr, b"-1\n2\n3\n").await.is_empty());
    assert_eq!(exchange(addr, b"5\nextra bytes").await, b"3.00\n");
}

#[tokio::test]
async fn service_survives_bad_clients() {
    let addr = start_service().await;
    for _ in 0..5 {
        assert!(exchange(addr, b"nope\n").await.is_empty());
    }
    assert_eq!(exchange(addr, b"5\n").await, b"3.00\n");
}

#[tokio::test]
async fn concurrent_clients() {
    let addr = start_service().await;
    let handles: Vec<_> = (1..=8u64)
        .map(|n| tokio::spawn(async move { (n, exchange(addr, format!("{n}\n").as_bytes()).await) }))
        .collect();
    for handle in handles {
        let (n, response) = handle.await.unwrap();
        let expected = sequential_average(n, &Collatz::default()).unwrap().unwrap();
        assert_eq!(String::from_utf8(response).unwrap(), format!("{expected:.2}\n"));
    }
}

#[tokio::test]
async fn client_query() {
    let addr = start_service().await;
    assert_eq!(query(addr, "10").await.unwrap(), 6.7);
    assert!(matches!(query(addr, "-3").await, Err(ClientError::Rejected)));
    assert!(matches!(query(addr, "abc").await, Err(ClientError::Rejected)));
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let listener = bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    match bind(addr).await {
        Err(ServiceError::Bind { addr: name, .. }) => assert_eq!(name, addr.to_string()),
        other => panic!("unexpected {other:?}"),
    }
}
