//! End-to-end dispatch behaviour: routing, ordering, short-circuits, faults
//! and body parsing, driven through `App::dispatch` without a socket.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use strand::middleware::{self, JsonConfig, UrlencodedConfig};
use strand::{App, Handler, Method, ParsedBody, Request, Response, Router, Sent};

type Log = Arc<Mutex<Vec<String>>>;

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Simple handler appending `name` to `log`.
fn mark(log: &Log, name: &'static str) -> Handler {
    let log = Arc::clone(log);
    Handler::simple(move |_ctx| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(name.to_owned());
            Ok(())
        })
    })
}

/// Simple handler appending `name` to `log` and ending the response.
fn finish(log: &Log, name: &'static str) -> Handler {
    let log = Arc::clone(log);
    Handler::simple(move |ctx| {
        let log = Arc::clone(&log);
        Box::pin(async move {
            log.lock().unwrap().push(name.to_owned());
            ctx.response().send(name);
            Ok(())
        })
    })
}

async fn send(app: &App, req: Request) -> Option<Sent> {
    let (res, rx) = Response::channel();
    app.dispatch(req, res).await;
    rx.await.ok()
}

async fn get(app: &App, url: &str) -> Sent {
    send(app, Request::new(Method::Get, url)).await.expect("a response")
}

#[tokio::test]
async fn parameters_are_extracted() {
    let seen = Arc::new(Mutex::new(None));
    let capture = {
        let seen = Arc::clone(&seen);
        Handler::simple(move |ctx| {
            let seen = Arc::clone(&seen);
            Box::pin(async move {
                *seen.lock().unwrap() = Some(ctx.params.clone());
                ctx.response().json(&ctx.params)?;
                Ok(())
            })
        })
    };
    let app = Router::new()
        .get("/posts/:postId/comments/:commentId", capture)
        .into_app();

    let sent = get(&app, "/posts/42/comments/7").await;

    assert_eq!(sent.status, 200);
    let params = seen.lock().unwrap().take().unwrap();
    assert_eq!(params["postId"], "42");
    assert_eq!(params["commentId"], "7");
    let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body, json!({ "postId": "42", "commentId": "7" }));
}

#[tokio::test]
async fn registration_order_decides_overlapping_routes() {
    let log = Log::default();
    let param_first = Router::new()
        .get("/users/:id", finish(&log, "param"))
        .get("/users/new", finish(&log, "exact"))
        .into_app();
    assert_eq!(get(&param_first, "/users/new").await.text(), "param");

    let exact_first = Router::new()
        .get("/users/new", finish(&log, "exact"))
        .get("/users/:id", finish(&log, "param"))
        .into_app();
    assert_eq!(get(&exact_first, "/users/new").await.text(), "exact");
    assert_eq!(get(&exact_first, "/users/9").await.text(), "param");
}

#[tokio::test]
async fn global_middleware_runs_first_in_order() {
    let log = Log::default();
    let app = Router::new()
        .middleware(mark(&log, "A"))
        .middleware(mark(&log, "B"))
        .get("/thing", [mark(&log, "H1"), finish(&log, "H2")])
        .into_app();

    get(&app, "/thing").await;

    assert_eq!(entries(&log), ["A", "B", "H1", "H2"]);
}

#[tokio::test]
async fn ending_the_response_short_circuits() {
    let log = Log::default();
    let redirect = Handler::simple(|ctx| Box::pin(async move {
        ctx.response().redirect("/login");
        Ok(())
    }));
    let app = Router::new()
        .middleware(mark(&log, "A"))
        .middleware(redirect)
        .middleware(mark(&log, "B"))
        .get("/private", finish(&log, "H"))
        .into_app();

    let sent = get(&app, "/private").await;

    assert_eq!(sent.status, 302);
    assert_eq!(sent.header("location"), Some("/login"));
    assert_eq!(entries(&log), ["A"]);
}

#[tokio::test]
async fn chained_handler_that_never_continues_stalls() {
    let log = Log::default();
    let forgetful = Handler::chained(|_ctx, _next| Box::pin(async move { Ok(()) }));
    let app = Router::new()
        .middleware(forgetful)
        .get("/hang", finish(&log, "H"))
        .into_app();

    let sent = tokio::time::timeout(
        Duration::from_millis(200),
        send(&app, Request::new(Method::Get, "/hang")),
    )
    .await
    .expect("dispatch settles");

    assert!(sent.is_none(), "nothing should have answered");
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn faulting_handler_yields_500_and_skips_the_rest() {
    let log = Log::default();
    let broken = Handler::simple(|_ctx| Box::pin(async move {
        Err(strand::Error::handler("database unavailable"))
    }));
    let app = Router::new()
        .middleware(mark(&log, "A"))
        .get("/boom", [broken, finish(&log, "H")])
        .into_app();

    let sent = get(&app, "/boom").await;

    assert_eq!(sent.status, 500);
    assert_eq!(sent.text(), "Internal Server Error");
    assert_eq!(sent.header("content-type"), Some("text/plain"));
    assert_eq!(entries(&log), ["A"]);
}

#[tokio::test]
async fn fault_inside_next_is_contained_at_its_own_level() {
    let log = Log::default();
    let outer = {
        let log = Arc::clone(&log);
        Handler::chained(move |ctx, next| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                next.run(ctx).await;
                log.lock().unwrap().push(format!("outer saw ended={}", ctx.response().is_ended()));
                Ok(())
            })
        })
    };
    let broken = Handler::simple(|_ctx| Box::pin(async move {
        Err(strand::Error::handler("nope"))
    }));
    let app = Router::new().middleware(outer).get("/x", broken).into_app();

    assert_eq!(get(&app, "/x").await.status, 500);
    assert_eq!(entries(&log), ["outer saw ended=true"]);
}

#[tokio::test]
async fn unmatched_route_is_404_without_middleware() {
    let log = Log::default();
    let app = Router::new()
        .middleware(mark(&log, "A"))
        .get("/exists", finish(&log, "H"))
        .into_app();

    let sent = get(&app, "/nonexistent").await;

    assert_eq!(sent.status, 404);
    assert_eq!(sent.header("content-type"), Some("text/plain"));
    assert_eq!(sent.text(), "Not Found");
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn json_parser_claims_body_before_urlencoded() {
    let seen = Arc::new(Mutex::new(None));
    let capture = {
        let seen = Arc::clone(&seen);
        Handler::simple(move |ctx| {
            let seen = Arc::clone(&seen);
            Box::pin(async move {
                *seen.lock().unwrap() = ctx.body.clone();
                ctx.response().status(201).send("stored");
                Ok(())
            })
        })
    };
    let app = Router::new()
        .middleware(middleware::json(JsonConfig::default()))
        .middleware(middleware::urlencoded(UrlencodedConfig::default()))
        .post("/items", capture)
        .into_app();

    let req = Request::new(Method::Post, "/items")
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"widget"}"#);
    let sent = send(&app, req).await.unwrap();

    assert_eq!(sent.status, 201);
    assert_eq!(
        seen.lock().unwrap().take(),
        Some(ParsedBody::Json(json!({ "name": "widget" })))
    );
}

#[tokio::test]
async fn oversized_content_length_is_413_before_the_handler() {
    let log = Log::default();
    let app = Router::new()
        .middleware(middleware::json(JsonConfig { limit: 16, ..JsonConfig::default() }))
        .post("/upload", finish(&log, "H"))
        .into_app();

    let req = Request::new(Method::Post, "/upload")
        .with_header("content-type", "application/json")
        .with_header("content-length", "1048576")
        .with_body("{}");
    let sent = send(&app, req).await.unwrap();

    assert_eq!(sent.status, 413);
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn route_specific_middleware_only_guards_its_route() {
    let log = Log::default();
    let auth = middleware::basic_auth(middleware::BasicAuthConfig::new("u", "p")).unwrap();
    let app = Router::new()
        .get("/public", finish(&log, "public"))
        .get("/private", [auth, finish(&log, "private")])
        .into_app();

    assert_eq!(get(&app, "/public").await.status, 200);
    assert_eq!(get(&app, "/private").await.status, 401);
    assert_eq!(entries(&log), ["public"]);
}

#[tokio::test]
async fn query_string_is_available_to_handlers() {
    let echo = Handler::simple(|ctx| Box::pin(async move {
        let term = ctx.query_param("q").unwrap_or_default().to_owned();
        ctx.response().send(term);
        Ok(())
    }));
    let app = Router::new().get("/search", echo).into_app();

    assert_eq!(get(&app, "/search?q=rust&q=tokio").await.text(), "tokio");
}
