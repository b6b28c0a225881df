//! # strand
//!
//! A minimal HTTP application framework on top of hyper: routes with path
//! parameters, an ordered middleware pipeline, response helpers, and a
//! handful of common middleware.
//!
//! ## The model
//!
//! - A [`Router`] collects global middleware and routes, then freezes into
//!   an [`App`].
//! - For each request the app scans its routes in registration order. The
//!   first route whose method matches and whose pattern accepts the path
//!   wins. No match means `404`, and no middleware runs.
//! - On a match, global middleware followed by the route's own handlers run
//!   as one chain against a fresh [`Context`].
//! - A [`Handler`] is either *simple* (the chain moves on after it) or
//!   *chained* (it gets a [`Next`] and decides). The chain stops as soon as
//!   the [`Response`] has ended.
//! - A handler that returns `Err` or panics gets the request a `500`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strand::{Handler, ParsedBody, Router, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strand::Error> {
//!     let get_user = Handler::simple(|ctx| Box::pin(async move {
//!         let id = ctx.param("id").unwrap_or("unknown").to_owned();
//!         ctx.response().json(&serde_json::json!({ "id": id }))?;
//!         Ok(())
//!     }));
//!
//!     let create_user = Handler::simple(|ctx| Box::pin(async move {
//!         let Some(ParsedBody::Json(user)) = ctx.body.take() else {
//!             ctx.response().status(400).text("expected a JSON body");
//!             return Ok(());
//!         };
//!         ctx.response().status(201).json(&user)?;
//!         Ok(())
//!     }));
//!
//!     Router::new()
//!         .middleware(middleware::logger(Default::default()))
//!         .middleware(middleware::json(Default::default()))
//!         .get("/users/:id", get_user)
//!         .post("/users", create_user)
//!         .listen("0.0.0.0:3000")
//!         .await
//! }
//! ```

mod context;
mod error;
mod handler;
mod method;
mod path;
mod pipeline;
mod request;
mod response;
mod router;
mod server;

#[cfg(test)]
mod testing;

pub mod middleware;

pub use context::{Context, ParsedBody};
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, Handler, HandlerResult, IntoHandlers, Next};
pub use method::{Method, UnknownMethod};
pub use path::PathPattern;
pub use request::{Body, Request};
pub use response::{ContentType, Delivery, IntoBody, Response, Sent};
pub use router::{App, Group, Route, Router};
pub use server::Server;
