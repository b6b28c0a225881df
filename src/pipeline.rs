//! The middleware pipeline.
//!
//! Executes an ordered handler list against one [`Context`]:
//!
//! ```text
//!            ┌────────── response ended ──────────▶ Ended
//! Running(i) ├────────── i == len ────────────────▶ Exhausted
//!            ├────────── handler failed ──────────▶ Faulted (500 unless ended)
//!            └── Simple done / Chained ran next ──▶ Running(i + 1)
//! ```
//!
//! A `Simple` handler is awaited and the cursor advances by itself. A
//! `Chained` handler gets a [`Next`] and the cursor only advances when it
//! runs it; if it does neither that nor end the response, the request stalls.
//!
//! A failure is an `Err` returned by the handler or a panic while polling
//! its future. It is caught at the level of the handler that raised it, so
//! a fault deep in the chain shows up in a `Chained` handler above it as
//! `next.run(ctx)` returning normally with the response already ended.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::error;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxFuture, Handler, Next};
use crate::response::ContentType;

pub(crate) const FAULT_BODY: &str = "Internal Server Error";

/// Runs `chain` from `start` until the response ends, the chain runs out,
/// a handler faults, or a `Chained` handler returns.
pub(crate) fn run<'a>(chain: &'a [Handler], start: usize, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        let mut index = start;
        loop {
            if ctx.response().is_ended() {
                return;
            }
            let Some(handler) = chain.get(index) else {
                return;
            };

            // The call sits inside the guarded future so a panic raised before
            // the handler's own future exists is caught as well.
            let call = async {
                match handler {
                    Handler::Simple(f) => f(&mut *ctx).await,
                    Handler::Chained(f) => f(&mut *ctx, Next::new(chain, index + 1)).await,
                }
            };
            let outcome = AssertUnwindSafe(call).catch_unwind().await;

            match outcome {
                Ok(Ok(())) if handler.is_chained() => return,
                Ok(Ok(())) => index += 1,
                Ok(Err(err)) => return fault(ctx, index, &err),
                Err(panic) => return fault(ctx, index, &Error::handler(panic_message(&*panic))),
            }
        }
    })
}

fn fault(ctx: &Context, index: usize, err: &Error) {
    error!(
        method = %ctx.request().method(),
        path = ctx.pathname(),
        handler = index,
        "handler failed: {err}"
    );
    ctx.response().end_if_open(500, ContentType::Text, FAULT_BODY);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::method::Method;
    use crate::request::Request;
    use crate::response::{Delivery, Response};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn context() -> (Context, Delivery) {
        let (res, rx) = Response::channel();
        let req = Request::new(Method::Get, "/");
        (Context::new(req, "/".into(), HashMap::new(), HashMap::new(), res), rx)
    }

    fn mark(log: &Log, name: &'static str) -> Handler {
        let log = Arc::clone(log);
        Handler::simple(move |_ctx| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().unwrap().push(name);
                Ok(())
            })
        })
    }

    fn entries(log: &Log) -> Vec<&'static str> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn simple_handlers_advance_automatically() {
        let log = Log::default();
        let chain = vec![mark(&log, "a"), mark(&log, "b"), mark(&log, "c")];
        let (mut ctx, _rx) = context();

        run(&chain, 0, &mut ctx).await;

        assert_eq!(entries(&log), ["a", "b", "c"]);
        assert!(!ctx.response().is_ended());
    }

    #[tokio::test]
    async fn chained_handler_wraps_downstream() {
        let log = Log::default();
        let outer = {
            let log = Arc::clone(&log);
            Handler::chained(move |ctx, next| {
                let log = Arc::clone(&log);
                Box::pin(async move {
                    log.lock().unwrap().push("before");
                    next.run(ctx).await;
                    log.lock().unwrap().push("after");
                    Ok(())
                })
            })
        };
        let chain = vec![outer, mark(&log, "inner")];
        let (mut ctx, _rx) = context();

        run(&chain, 0, &mut ctx).await;

        assert_eq!(entries(&log), ["before", "inner", "after"]);
    }

    #[tokio::test]
    async fn ended_response_stops_the_chain() {
        let log = Log::default();
        let stop = Handler::simple(|ctx| Box::pin(async move {
            ctx.response().redirect("/elsewhere");
            Ok(())
        }));
        let chain = vec![mark(&log, "a"), stop, mark(&log, "b")];
        let (mut ctx, rx) = context();

        run(&chain, 0, &mut ctx).await;

        assert_eq!(entries(&log), ["a"]);
        assert_eq!(rx.await.unwrap().status, 302);
    }

    #[tokio::test]
    async fn chained_handler_without_next_stalls() {
        let log = Log::default();
        let swallow = Handler::chained(|_ctx, _next| Box::pin(async move { Ok(()) }));
        let chain = vec![swallow, mark(&log, "never")];
        let (mut ctx, rx) = context();

        run(&chain, 0, &mut ctx).await;

        assert!(entries(&log).is_empty());
        assert!(!ctx.response().is_ended());
        drop(ctx);
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn error_becomes_500_and_stops_the_chain() {
        let log = Log::default();
        let fail = Handler::simple(|_ctx| Box::pin(async move {
            Err(Error::handler("boom"))
        }));
        let chain = vec![fail, mark(&log, "after")];
        let (mut ctx, rx) = context();

        run(&chain, 0, &mut ctx).await;

        let sent = rx.await.unwrap();
        assert_eq!(sent.status, 500);
        assert_eq!(sent.text(), FAULT_BODY);
        assert_eq!(sent.header("content-type"), Some("text/plain"));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn panic_is_caught_like_an_error() {
        let log = Log::default();
        let explode = Handler::chained(|_ctx, _next| Box::pin(async move {
            if true {
                panic!("kaboom");
            }
            Ok(())
        }));
        let chain = vec![explode, mark(&log, "after")];
        let (mut ctx, rx) = context();

        run(&chain, 0, &mut ctx).await;

        assert_eq!(rx.await.unwrap().status, 500);
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn fault_after_end_keeps_the_first_response() {
        let fail = Handler::simple(|ctx| Box::pin(async move {
            ctx.response().status(201).send("made it");
            Err(Error::handler("late failure"))
        }));
        let chain = vec![fail];
        let (mut ctx, rx) = context();

        run(&chain, 0, &mut ctx).await;

        let sent = rx.await.unwrap();
        assert_eq!(sent.status, 201);
        assert_eq!(sent.text(), "made it");
    }

    #[tokio::test]
    async fn running_next_twice_repeats_downstream() {
        let log = Log::default();
        let twice = Handler::chained(|ctx, next| Box::pin(async move {
            next.run(ctx).await;
            next.run(ctx).await;
            Ok(())
        }));
        let chain = vec![twice, mark(&log, "downstream")];
        let (mut ctx, _rx) = context();

        run(&chain, 0, &mut ctx).await;

        assert_eq!(entries(&log), ["downstream", "downstream"]);
    }
}
