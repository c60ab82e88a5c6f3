//! Playback backend for the NTS remote: drives a local player and serves
//! the panel's RPC methods over HTTP.

pub mod backend;
pub mod metadata;
pub mod player;
pub mod server;

pub use backend::{Backend, BackendError};
