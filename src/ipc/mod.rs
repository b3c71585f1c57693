//! IPC module for daemon-to-front-end communication

mod protocol;
mod server;

pub use server::Server;
