//! Helpers for driving handler chains in unit tests.

use std::collections::HashMap;

use crate::context::Context;
use crate::handler::Handler;
use crate::pipeline;
use crate::request::Request;
use crate::response::{Delivery, Response, Sent};

/// A context for `req` with the path taken verbatim from its url.
pub(crate) fn context(req: Request) -> (Context, Delivery) {
    let (res, rx) = Response::channel();
    let pathname = req.url().split('?').next().unwrap_or("/").to_owned();
    (Context::new(req, pathname, HashMap::new(), HashMap::new(), res), rx)
}

/// Runs `chain` and returns the context afterwards, plus the delivery.
pub(crate) async fn run_ctx(chain: &[Handler], req: Request) -> (Context, Delivery) {
    let (mut ctx, rx) = context(req);
    pipeline::run(chain, 0, &mut ctx).await;
    (ctx, rx)
}

/// Runs `chain` and waits for the response. `None` when nothing ended it.
pub(crate) async fn run(chain: &[Handler], req: Request) -> Option<Sent> {
    let (ctx, rx) = run_ctx(chain, req).await;
    drop(ctx);
    rx.await.ok()
}

/// A handler that ends the response with `body`.
pub(crate) fn terminal(body: &'static str) -> Handler {
    Handler::simple(move |ctx| Box::pin(async move {
        ctx.response().send(body);
        Ok(())
    }))
}
