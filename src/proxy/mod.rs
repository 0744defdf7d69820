// Proxy service module

pub mod aspect_ratio;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod poller;
pub mod server;
pub mod translator;
pub mod types;
pub mod upstream;

pub use error::{ApiError, ErrorKind};
pub use server::GatewayServer;
