pub mod auth;
pub mod cli;
pub mod core;
pub mod error;
pub mod handler;
pub mod pool;
pub mod protocol;
pub mod sse;
pub mod upstream;

pub use crate::auth::{BearerAuth, sha256_hex};
pub use crate::cli::Cli;
pub use crate::core::{Gateway, GatewayState};
pub use crate::error::GatewayError;
pub use crate::pool::{KeyPool, PoolError, ReloadError, SelectionPolicy, SessionKey};
pub use crate::upstream::{UpstreamClient, UpstreamError};
