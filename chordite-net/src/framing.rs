//! Timeout-wrapped length-prefixed framing over a `compio` stream.
//!
//! Generalizes the teacher crate's `read_exact_with_timeout` /
//! `write_all_with_timeout` helpers (`monocoque-core/src/timeout.rs`) from
//! raw byte counts to whole JSON messages, and its handshake's
//! stack-buffer-header / heap-buffer-body split
//! (`monocoque-zmtp/src/handshake.rs`) from the ZMTP frame header to
//! `chordite-wire`'s `u32` length prefix.

use crate::error::{NetError, Result};
use chordite_wire::codec::MAX_FRAME_LEN;
use compio::buf::BufResult;
use compio::io::{AsyncReadExt, AsyncWriteExt};
use compio::net::TcpStream;
use compio::time::timeout;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const LEN_PREFIX_BYTES: usize = 4;

/// Read one complete length-prefixed JSON message, failing after
/// `net_timeout` if the peer never finishes sending it.
pub async fn read_message<T: DeserializeOwned>(stream: &mut TcpStream, net_timeout: Duration) -> Result<T> {
    let len_buf = [0u8; LEN_PREFIX_BYTES];
    let BufResult(res, len_buf) = timeout(net_timeout, stream.read_exact(len_buf))
        .await
        .map_err(|_| NetError::Timeout(net_timeout))?;
    res.map_err(classify_read_error)?;

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(NetError::Wire(chordite_wire::codec::WireError::FrameTooLarge(len)));
    }

    let body_buf = vec![0u8; len as usize];
    let BufResult(res, body_buf) = timeout(net_timeout, stream.read_exact(body_buf))
        .await
        .map_err(|_| NetError::Timeout(net_timeout))?;
    res.map_err(classify_read_error)?;

    Ok(serde_json::from_slice(&body_buf)?)
}

/// Encode and write one message, failing after `net_timeout`.
pub async fn write_message<T: Serialize>(stream: &mut TcpStream, msg: &T, net_timeout: Duration) -> Result<()> {
    let frame = chordite_wire::codec::encode(msg)?;
    let BufResult(res, _) = timeout(net_timeout, stream.write_all(frame))
        .await
        .map_err(|_| NetError::Timeout(net_timeout))?;
    res.map_err(NetError::Io)?;
    Ok(())
}

fn classify_read_error(e: std::io::Error) -> NetError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        NetError::ConnectionClosed
    } else {
        NetError::Io(e)
    }
}

impl From<serde_json::Error> for NetError {
    fn from(e: serde_json::Error) -> Self {
        NetError::Wire(chordite_wire::codec::WireError::Malformed(e))
    }
}
