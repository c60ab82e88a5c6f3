//! Wire types, configuration and platform paths shared by the NTS remote
//! panel and its playback daemon.

pub mod config;
pub mod platform;
pub mod protocol;
