#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// re-export sub-crates
pub use sdp;

pub mod api;
pub mod dtls_transport;
pub mod error;
pub mod ice_transport;
pub mod peer;
pub mod peer_connection;
pub mod rtp_transceiver;

pub use error::Error;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";
