//! HTTP surface of the query service.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::{ApiError, ErrorCode};
pub use handlers::{AppState, FEED_STATUS_HEADER};
pub use router::{create_cors_layer, create_router};
pub use server::WebServer;
