//! HTTP surface running alongside the gateway client

mod server;

pub use server::start_health_server;
