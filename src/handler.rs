//! Handlers, the continuation, and type erasure.
//!
//! # Two shapes
//!
//! A [`Handler`] is one of two explicitly tagged variants:
//!
//! ```text
//! Simple   (ctx)        → the pipeline awaits it, then moves on by itself
//! Chained  (ctx, next)  → the pipeline moves on only when the handler runs `next`
//! ```
//!
//! The shape is picked at construction with [`Handler::simple`] or
//! [`Handler::chained`]; it is never inferred from the callable.
//!
//! # How async handlers are stored
//!
//! Routes and middleware hold handlers of different concrete types in one
//! `Vec`, so each closure is erased behind an `Arc<dyn Fn …>`. The closure
//! borrows the [`Context`] for the duration of its future, which is why the
//! future is boxed with the borrow's lifetime:
//!
//! ```text
//! |ctx| Box::pin(async move { … })          ← user writes this
//!        ↓ Handler::simple(…)
//! Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, …>>
//!        ↓ at request time
//! one virtual call + one boxed future per handler
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::pipeline;

/// A heap-allocated, type-erased future borrowing from the request.
///
/// `Send` lets tokio move the request's task across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What every handler resolves to. `Err` becomes a `500`.
pub type HandlerResult = Result<(), Error>;

type SimpleFn = dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync;

type ChainedFn =
    dyn for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// A unit of request-processing logic.
///
/// Cloning is one `Arc` increment.
#[derive(Clone)]
pub enum Handler {
    /// Runs to completion, then the pipeline advances automatically unless
    /// the response has ended.
    Simple(Arc<SimpleFn>),
    /// Receives the continuation and decides whether to run it.
    Chained(Arc<ChainedFn>),
}

impl Handler {
    /// Builds a [`Handler::Simple`].
    ///
    /// ```rust
    /// use strand::Handler;
    ///
    /// let hello = Handler::simple(|ctx| Box::pin(async move {
    ///     ctx.response().send("hello");
    ///     Ok(())
    /// }));
    /// ```
    pub fn simple<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        Self::Simple(Arc::new(f))
    }

    /// Builds a [`Handler::Chained`].
    ///
    /// ```rust
    /// use strand::Handler;
    ///
    /// let stamp = Handler::chained(|ctx, next| Box::pin(async move {
    ///     ctx.response().set_header("x-powered-by", "strand");
    ///     next.run(ctx).await;
    ///     Ok(())
    /// }));
    /// ```
    pub fn chained<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        Self::Chained(Arc::new(f))
    }

    pub fn is_chained(&self) -> bool {
        matches!(self, Self::Chained(_))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Simple(_) => "Handler::Simple",
            Self::Chained(_) => "Handler::Chained",
        })
    }
}

// ── Continuation ──────────────────────────────────────────────────────────────

/// The continuation handed to a [`Handler::Chained`].
///
/// Running it executes the rest of the chain, starting right after the
/// handler that received it, and resolves once that part of the chain has
/// settled. Nothing stops a handler from running it twice; the downstream
/// handlers then run twice.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Handler],
    index: usize,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Handler], index: usize) -> Self {
        Self { chain, index }
    }

    /// Resumes the pipeline at the next handler.
    pub fn run<'c>(self, ctx: &'c mut Context) -> BoxFuture<'c, ()>
    where
        'a: 'c,
    {
        pipeline::run(self.chain, self.index, ctx)
    }

    /// Position of the handler this continuation resumes at.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &self.chain.len().saturating_sub(self.index))
            .finish()
    }
}

// ── Registration input ────────────────────────────────────────────────────────

/// Anything that can stand in for a route's handler list.
pub trait IntoHandlers {
    fn into_handlers(self) -> Vec<Handler>;
}

impl IntoHandlers for Handler {
    fn into_handlers(self) -> Vec<Handler> { vec![self] }
}

impl IntoHandlers for Vec<Handler> {
    fn into_handlers(self) -> Vec<Handler> { self }
}

impl<const N: usize> IntoHandlers for [Handler; N] {
    fn into_handlers(self) -> Vec<Handler> { self.into() }
}
