//! Chordite Wire
//!
//! Sans-IO protocol layer: typed request/response messages for the ring
//! RPCs and the bootstrap registry, plus the length-prefixed JSON codec
//! that frames them. No sockets here — `chordite-net` and
//! `chordite-bootstrap` own the actual I/O.

pub mod codec;
pub mod message;

pub mod prelude {
    pub use crate::codec::{FrameDecoder, WireError};
    pub use crate::message::{RegistryRequest, RegistryResponse, Request, Response};
}
