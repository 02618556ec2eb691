//! API Module
//!
//! HTTP surface of the service: the `/_sw` control routes and the
//! interception proxy.
//!
//! # Endpoints
//! - `GET /_sw/health`, `GET /_sw/stats`, `GET /_sw/status`
//! - `GET /_sw/events` - Consumer message stream
//! - `POST /_sw/messages` - Control commands
//! - `POST /_sw/connectivity`, `POST /_sw/push`, `POST /_sw/notification-click`
//! - Everything else is intercepted

pub mod handlers;
pub mod proxy;
pub mod routes;

pub use handlers::*;
pub use proxy::{intercepted_request, into_http_response, proxy_handler, SOURCE_HEADER};
pub use routes::create_router;
