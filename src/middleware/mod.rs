//! Built-in middleware.
//!
//! Every item here is a plain [`Handler`](crate::Handler) produced by a
//! factory function from a configuration struct. Register them globally with
//! [`Router::middleware`](crate::Router::middleware) or put them in front of
//! a single route's handlers:
//!
//! ```rust
//! use std::time::Duration;
//! use strand::{Router, middleware};
//!
//! let app = Router::new()
//!     .middleware(middleware::logger(Default::default()))
//!     .middleware(middleware::cors(Default::default()))
//!     .middleware(middleware::timeout(Duration::from_secs(10)))
//!     .middleware(middleware::json(Default::default()));
//! ```
//!
//! Global middleware only runs for requests that matched a route.
//!
//! | factory | short-circuits with |
//! |---|---|
//! | [`cors`] | `204` on preflight |
//! | [`logger`] | never |
//! | [`serve_static`] | `200` with the file |
//! | [`rate_limit`] | `429` |
//! | [`basic_auth`] | `401` |
//! | [`timeout`] | `408` when the timer fires first |
//! | [`size_limit`] | `413` |
//! | [`json`], [`urlencoded`], [`text`], [`raw`] | `400` / `413` |

mod basic_auth;
mod body;
mod cors;
mod logger;
mod rate_limit;
mod size_limit;
mod static_files;
mod timeout;

pub use basic_auth::{BasicAuthConfig, basic_auth};
pub use body::{JsonConfig, RawConfig, TextConfig, UrlencodedConfig, json, raw, text, urlencoded};
pub use cors::{CorsConfig, cors};
pub use logger::{LoggerConfig, logger};
pub use rate_limit::{RateDecision, RateLimitConfig, RateLimiter, rate_limit};
pub use size_limit::size_limit;
pub use static_files::{StaticConfig, serve_static};
pub use timeout::{TimeoutConfig, timeout, timeout_with};
