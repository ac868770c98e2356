//! kairpc server: serves a populated [`kairpc_core::Registry`] over HTTP.

pub mod cli;
pub mod logging;
pub mod network;
pub mod service;

pub use cli::{LogFormat, ServerArgs};
pub use network::{NetworkConfig, NetworkModule};
pub use service::ServerConfig;
