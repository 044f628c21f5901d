pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod relay;
pub mod router;
pub mod types;

pub use config::Config;
pub use error::{ClientError, RelayError};
pub use router::{RelayState, relay_router};
