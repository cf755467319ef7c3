//! Line-oriented TCP service computing the average step count of `1..=N`.
//!
//! The protocol is a single exchange per connection:
//!
//! - the client sends a decimal integer `N` terminated by `\n`;
//! - the server answers with `sum(steps(1..=N)) / N` with two fractional digits and a `\n`,
//!   e.g. `20.16\n`, then closes the connection.
//!
//! A request that can't be served (not a number, not positive, not terminated, too long, or an
//! item that doesn't converge) makes the server close the connection without writing anything.
//! Clients must treat an empty answer as a failure. Whatever the client sends after the request
//! line is read and discarded before closing, so the client always observes a clean EOF.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::collatz::{sequential_average, Collatz, ComputeError};

pub mod client;

/// The address the service binds to when nothing else is configured.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:9000";

/// Longest accepted request, newline included.
pub const MAX_REQUEST_LEN: u64 = 1024;

/// Bytes read and thrown away after the response before giving up on a clean close.
const DISCARD_LIMIT: u64 = 64 * 1024;
const DISCARD_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Why a request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request not terminated by a newline")]
    Unterminated,
    #[error("request longer than {MAX_REQUEST_LEN} bytes")]
    TooLong,
    #[error("invalid number: {0:?}")]
    NotANumber(String),
    #[error("not a positive number: {0}")]
    NotPositive(i64),
}

/// Failure serving a single connection. None of these reach the client.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Compute(#[from] ComputeError),
    #[error("computation aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Parse a request line, trailing newline included.
pub fn parse_request(line: &str) -> Result<u64, RequestError> {
    if !line.ends_with('\n') {
        if line.len() as u64 >= MAX_REQUEST_LEN {
            return Err(RequestError::TooLong);
        }
        return Err(RequestError::Unterminated);
    }
    let trimmed = line.trim();
    let n: i64 = trimmed
        .parse()
        .map_err(|_| RequestError::NotANumber(trimmed.to_string()))?;
    if n <= 0 {
        return Err(RequestError::NotPositive(n));
    }
    Ok(n as u64)
}

/// The response line for a valid request, computed sequentially.
pub fn respond(n: u64) -> Result<String, ComputeError> {
    let average = sequential_average(n, &Collatz::default()).unwrap_or(Ok(0.0))?;
    Ok(format!("{average:.2}\n"))
}

/// Bind the listening socket. Failing to bind is fatal for the service.
pub async fn bind<A: ToSocketAddrs + std::fmt::Display>(addr: A) -> Result<TcpListener, ServiceError> {
    let name = addr.to_string();
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServiceError::Bind { addr: name, source })
}

/// Accept connections forever, serving each one on its own task.
///
/// Errors accepting or serving a connection are logged and only affect that connection.
pub async fn serve(listener: TcpListener) -> Result<(), ServiceError> {
    let address = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!("service listening on {}", address);

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("failed to accept incoming connection at {}: {:?}", address, e);
                continue;
            }
        };
        debug!("client connected from {}", peer_addr);
        tokio::spawn(async move {
            match handle_connection(stream).await {
                Ok(n) => debug!("served {} to {}", n, peer_addr),
                Err(ConnectionError::Request(e)) => warn!("rejected request from {}: {}", peer_addr, e),
                Err(e) => warn!("error serving {}: {}", peer_addr, e),
            }
        });
    }
}

/// Serve a single request. On error nothing is written.
///
/// Either way the write side is shut down and the pending input is discarded, so the client reads
/// an EOF instead of a connection reset.
pub async fn handle_connection(mut stream: TcpStream) -> Result<u64, ConnectionError> {
    let served = serve_request(&mut stream).await;
    if let Err(e) = stream.shutdown().await {
        debug!("failed to shut down the connection: {:?}", e);
    }
    discard_input(&mut stream).await;
    served
}

async fn serve_request(stream: &mut TcpStream) -> Result<u64, ConnectionError> {
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half.take(MAX_REQUEST_LEN));
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let n = parse_request(&line)?;
    let response = tokio::task::spawn_blocking(move || respond(n)).await??;

    write_half.write_all(response.as_bytes()).await?;
    Ok(n)
}

/// Read and drop what the client keeps sending, until it closes or a bound is hit.
async fn discard_input(stream: &mut TcpStream) {
    let mut rest = stream.take(DISCARD_LIMIT);
    let mut sink = tokio::io::sink();
    let discard = tokio::io::copy(&mut rest, &mut sink);
    match tokio::time::timeout(DISCARD_TIMEOUT, discard).await {
        Ok(Ok(discarded)) if discarded > 0 => trace!("discarded {} trailing bytes", discarded),
        Ok(Ok(_)) => {}
        Ok(Err(e)) => debug!("error discarding the input: {:?}", e),
        Err(_) => debug!("client kept the connection open, closing"),
    }
}

/// Bind `addr` and serve forever.
pub async fn run(addr: &str) -> Result<(), ServiceError> {
    let listener = bind(addr).await?;
    serve(listener).await
}
