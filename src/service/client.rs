use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The server closed the connection without answering: the request was invalid.
    #[error("the server rejected the request")]
    Rejected,
    #[error("malformed response: {0:?}")]
    Malformed(String),
}

/// Send `count` to the service and return the average it answers with.
///
/// `count` is sent verbatim, the server is the one validating it.
pub async fn query<A: ToSocketAddrs>(addr: A, count: &str) -> Result<f64, ClientError> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(format!("{count}\n").as_bytes()).await?;

    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    let read = reader.read_line(&mut response).await?;
    if read == 0 {
        return Err(ClientError::Rejected);
    }
    let trimmed = response.trim();
    trimmed
        .parse()
        .map_err(|_| ClientError::Malformed(trimmed.to_string()))
}
