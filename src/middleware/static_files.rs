//! Files from a directory.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::handler::Handler;
use crate::method::Method;

/// Configuration for [`serve_static`].
#[derive(Clone, Debug)]
pub struct StaticConfig {
    /// Directory files are served from.
    pub root: PathBuf,
    /// File served for a path naming a directory. Default `index.html`.
    pub index: Option<String>,
    /// URL prefix stripped before mapping to `root`, e.g. `/assets`.
    pub prefix: Option<String>,
}

impl StaticConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), index: Some("index.html".to_owned()), prefix: None }
    }
}

/// Serves `GET`/`HEAD` requests from `config.root`, mapping the request's
/// pathname onto the directory. Anything else, including misses and paths
/// escaping the root, falls through to the next handler.
///
/// Like all middleware it only sees requests that matched a route, so pair
/// it with a route covering the files, e.g. `/assets/:file`.
pub fn serve_static(config: StaticConfig) -> Handler {
    let config = Arc::new(config);
    Handler::chained(move |ctx, next| {
        let config = Arc::clone(&config);
        Box::pin(async move {
            let method = ctx.request().method();
            let file = if matches!(method, Method::Get | Method::Head) {
                resolve(&config, ctx.pathname())
            } else {
                None
            };
            let loaded = match file {
                Some(path) => load(path, config.index.as_deref()).await,
                None => None,
            };

            let Some((bytes, content_type)) = loaded else {
                next.run(ctx).await;
                return Ok(());
            };
            let res = ctx.response();
            res.set_header("content-type", content_type);
            if method == Method::Head {
                res.set_header("content-length", bytes.len().to_string());
                res.end(bytes::Bytes::new());
            } else {
                res.end(bytes);
            }
            Ok(())
        })
    })
}

/// Maps a URL path onto `root`, refusing anything but plain components.
fn resolve(config: &StaticConfig, pathname: &str) -> Option<PathBuf> {
    let relative = match &config.prefix {
        Some(prefix) => pathname.strip_prefix(prefix.as_str())?,
        None => pathname,
    };
    let mut path = config.root.clone();
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

async fn load(path: PathBuf, index: Option<&str>) -> Option<(Vec<u8>, &'static str)> {
    let meta = tokio::fs::metadata(&path).await.ok()?;
    let path = if meta.is_dir() { path.join(index?) } else { path };
    match tokio::fs::read(&path).await {
        Ok(bytes) => Some((bytes, content_type(&path))),
        Err(e) => {
            debug!(path = %path.display(), "static file not served: {e}");
            None
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
