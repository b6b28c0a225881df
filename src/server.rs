//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server:
//! 1. Stops `listener.accept()` immediately, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Waits for dispatches still running after their response went out.
//! 4. Returns from [`Server::serve`], which lets `main` exit cleanly.
//!
//! # One request
//!
//! The connection task hands the request to [`App::dispatch`] on a task of
//! its own and waits for the response to be ended, not for the pipeline to
//! finish. Handlers still running after the response went out keep running.
//!
//! Methods outside [`Method`] cannot match any route and get the same plain
//! `404` as any other routing miss.
//!
//! A pipeline that settles without any response cannot be held open here:
//! hyper needs a response or an error from the service, so the connection is
//! closed without an answer.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::{Response, Sent};
use crate::router::{App, Router};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use strand::Server;
    /// let server = Server::bind("0.0.0.0:3000")?;
    /// # Ok::<(), strand::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|_| Error::Addr(addr.to_owned()))?;
        Ok(Self { addr })
    }

    /// Freezes `router` and serves it until a shutdown signal arrives.
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_app(router.into_app()).await
    }

    /// Serves an already frozen [`App`].
    pub async fn serve_app(self, app: App) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, routes = app.routes().len(), "strand listening");

        accept_loop(listener, Arc::new(app), shutdown_signal()).await;

        info!("strand stopped");
        Ok(())
    }
}

impl Router {
    /// Binds `addr` and serves this router. Shorthand for
    /// `Server::bind(addr)?.serve(router)`.
    pub async fn listen(self, addr: &str) -> Result<(), Error> {
        Server::bind(addr)?.serve(self).await
    }
}

/// Accepts connections until `shutdown` resolves, then drains.
///
/// Every dispatch task holds a clone of `dispatches`; the drain is over
/// once the receiver sees all of them dropped.
async fn accept_loop(listener: TcpListener, app: Arc<App>, shutdown: impl Future<Output = ()>) {
    let mut connections = JoinSet::new();
    let (dispatches, mut settled) = mpsc::channel::<()>(1);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!(connections = connections.len(), "shutdown signal received, draining");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };
                let svc = {
                    let app = Arc::clone(&app);
                    let dispatches = dispatches.clone();
                    service_fn(move |req| {
                        handle(Arc::clone(&app), dispatches.clone(), req, remote_addr)
                    })
                };
                connections.spawn(async move {
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    while connections.join_next().await.is_some() {}
    drop(dispatches);
    let _ = settled.recv().await;
}

/// Adapts one hyper request to the dispatcher and waits for its response.
///
/// Returning `Err` makes hyper close the connection without answering.
async fn handle(
    app: Arc<App>,
    dispatch_guard: mpsc::Sender<()>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Error> {
    let Ok(method) = req.method().as_str().parse::<Method>() else {
        debug!(peer = %remote_addr, method = %req.method(), path = req.uri().path(), "no route matched");
        return Ok(Sent::plain(404, "Not Found").into_http());
    };
    let request = Request::from_hyper(req, method, remote_addr);
    let (response, delivery) = Response::channel();

    tokio::spawn(async move {
        app.dispatch(request, response).await;
        drop(dispatch_guard);
    });

    match delivery.await {
        Ok(sent) => Ok(sent.into_http()),
        Err(_) => {
            debug!(peer = %remote_addr, %method, "pipeline settled without a response");
            Err(Error::Unanswered)
        }
    }
}

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C
/// is available. A signal handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
