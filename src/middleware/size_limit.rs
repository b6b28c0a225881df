//! Request body size ceiling.

use http_body_util::{BodyExt, Limited};

use crate::handler::Handler;

/// Rejects requests whose advertised `content-length` exceeds `max_bytes`
/// with `413`, before any body bytes are read.
///
/// Requests without a length (chunked) pass through with their body stream
/// capped at `max_bytes`; a body parser reading past the cap answers `413`.
pub fn size_limit(max_bytes: usize) -> Handler {
    Handler::chained(move |ctx, next| Box::pin(async move {
        let too_large = ctx.request()
            .content_length()
            .is_some_and(|len| len > max_bytes as u64);
        if too_large {
            ctx.response().status(413).text("Payload Too Large");
            return Ok(());
        }

        if let Some(body) = ctx.take_body_stream() {
            ctx.set_body_stream(Limited::new(body, max_bytes).boxed_unsync());
        }
        next.run(ctx).await;
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::request::Request;
    use crate::testing::{run, terminal};

    #[tokio::test]
    async fn advertised_length_over_limit_is_413() {
        let chain = vec![size_limit(4), terminal("ok")];
        let req = Request::new(Method::Post, "/")
            .with_header("content-length", "5")
            .with_body("hello");
        let sent = run(&chain, req).await.unwrap();
        assert_eq!(sent.status, 413);
        assert_eq!(sent.text(), "Payload Too Large");
    }

    #[tokio::test]
    async fn within_limit_passes() {
        let chain = vec![size_limit(5), terminal("ok")];
        let req = Request::new(Method::Post, "/")
            .with_header("content-length", "5")
            .with_body("hello");
        assert_eq!(run(&chain, req).await.unwrap().status, 200);
    }
}
