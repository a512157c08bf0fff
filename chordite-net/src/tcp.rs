//! TCP socket tuning, generalized from the teacher crate's
//! `monocoque-core/src/tcp.rs` (same unsafe-isolated `TCP_NODELAY` trick,
//! same platform split).

#![allow(unsafe_code)]

use std::io;

/// Disable Nagle's algorithm on a compio `TcpStream`. Request/response
/// RPC traffic is latency-sensitive and small; buffering for bandwidth
/// efficiency only adds to `T_net`.
#[inline]
pub fn enable_tcp_nodelay(stream: &compio::net::TcpStream) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::io::{AsRawFd, FromRawFd};
        let fd = stream.as_raw_fd();
        let sock = unsafe { socket2::Socket::from_raw_fd(fd) };
        sock.set_nodelay(true)?;
        std::mem::forget(sock);
        Ok(())
    }

    #[cfg(windows)]
    {
        use std::os::windows::io::{AsRawSocket, FromRawSocket};
        let raw = stream.as_raw_socket();
        let sock = unsafe { socket2::Socket::from_raw_socket(raw) };
        sock.set_nodelay(true)?;
        std::mem::forget(sock);
        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    {
        Ok(())
    }
}
