//! Minimal strand example: JSON endpoints, a route group, and middleware.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -u admin:secret http://localhost:3000/admin/stats
//!   curl http://localhost:3000/old-home

use std::time::Duration;

use serde_json::json;
use strand::middleware::{self, BasicAuthConfig, CorsConfig, LoggerConfig, RateLimitConfig};
use strand::{Handler, ParsedBody, Router};

#[tokio::main]
async fn main() -> Result<(), strand::Error> {
    tracing_subscriber::fmt::init();

    let admin = middleware::basic_auth(BasicAuthConfig::new("admin", "secret"))?;

    Router::new()
        .middleware(middleware::logger(LoggerConfig::default()))
        .middleware(middleware::cors(CorsConfig::default()))
        .middleware(middleware::rate_limit(RateLimitConfig::default()))
        .middleware(middleware::timeout(Duration::from_secs(10)))
        .middleware(middleware::json(Default::default()))
        .get("/users/:id", get_user())
        .post("/users", create_user())
        .delete("/users/:id", delete_user())
        .get("/old-home", moved())
        .group("/admin", |admin_routes| admin_routes.get("/stats", [admin, stats()]))
        .listen("0.0.0.0:3000")
        .await
}

// GET /users/:id
fn get_user() -> Handler {
    Handler::simple(|ctx| Box::pin(async move {
        let id = ctx.param("id").unwrap_or("unknown").to_owned();
        ctx.response().json(&json!({ "id": id, "name": "alice" }))?;
        Ok(())
    }))
}

// POST /users: the json() middleware has already parsed the body.
fn create_user() -> Handler {
    Handler::simple(|ctx| Box::pin(async move {
        let name = match &ctx.body {
            Some(ParsedBody::Json(body)) => body.get("name").and_then(|n| n.as_str()).map(str::to_owned),
            _ => None,
        };
        let Some(name) = name else {
            ctx.response().status(400).json(&json!({ "error": "name is required" }))?;
            return Ok(());
        };
        ctx.response()
            .status(201)
            .set_header("location", "/users/99")
            .json(&json!({ "id": "99", "name": name }))?;
        Ok(())
    }))
}

// DELETE /users/:id → 204 No Content
fn delete_user() -> Handler {
    Handler::simple(|ctx| Box::pin(async move {
        ctx.response().status(204).end(Vec::<u8>::new());
        Ok(())
    }))
}

fn moved() -> Handler {
    Handler::simple(|ctx| Box::pin(async move {
        ctx.response().redirect_with("/users/42", 301);
        Ok(())
    }))
}

fn stats() -> Handler {
    Handler::simple(|ctx| Box::pin(async move {
        ctx.response().send(json!({ "uptime": "fine" }));
        Ok(())
    }))
}
