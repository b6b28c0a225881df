//! Cross-origin resource sharing headers.

use std::sync::Arc;

use crate::handler::Handler;
use crate::method::Method;

/// Configuration for [`cors`].
#[derive(Clone, Debug)]
pub struct CorsConfig {
    /// `access-control-allow-origin`. Default `*`.
    pub origin: String,
    /// `access-control-allow-methods` on preflight.
    /// Default `GET,HEAD,PUT,PATCH,POST,DELETE`.
    pub methods: String,
    /// `access-control-allow-headers` on preflight. `None` reflects the
    /// request's `access-control-request-headers`.
    pub allowed_headers: Option<String>,
    /// `access-control-expose-headers`, if any.
    pub exposed_headers: Option<String>,
    /// Sends `access-control-allow-credentials: true`. Default `false`.
    pub credentials: bool,
    /// `access-control-max-age` in seconds on preflight. Default `86400`.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: "*".to_owned(),
            methods: "GET,HEAD,PUT,PATCH,POST,DELETE".to_owned(),
            allowed_headers: None,
            exposed_headers: None,
            credentials: false,
            max_age: 86_400,
        }
    }
}

/// Sets CORS headers and answers `OPTIONS` preflight requests with `204`.
///
/// Preflights only reach this handler when an `OPTIONS` route matches the
/// path, like any other global middleware.
pub fn cors(config: CorsConfig) -> Handler {
    let config = Arc::new(config);
    Handler::chained(move |ctx, next| {
        let config = Arc::clone(&config);
        Box::pin(async move {
            let res = ctx.response();
            res.set_header("access-control-allow-origin", config.origin.as_str());
            if config.origin != "*" {
                res.set_header("vary", "Origin");
            }
            if config.credentials {
                res.set_header("access-control-allow-credentials", "true");
            }
            if let Some(exposed) = &config.exposed_headers {
                res.set_header("access-control-expose-headers", exposed.as_str());
            }

            if ctx.request().method() != Method::Options {
                next.run(ctx).await;
                return Ok(());
            }

            res.set_header("access-control-allow-methods", config.methods.as_str());
            let allowed = config.allowed_headers.as_deref()
                .or_else(|| ctx.request().header("access-control-request-headers"));
            if let Some(allowed) = allowed {
                res.set_header("access-control-allow-headers", allowed);
            }
            res.set_header("access-control-max-age", config.max_age.to_string());
            res.status(204).end(bytes::Bytes::new());
            Ok(())
        })
    })
}
