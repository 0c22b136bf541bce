//! HTTP server and graceful shutdown.
//!
//! hyper owns the wire protocol; this module accepts connections, hands each
//! request to [`App::handle`], and drains in-flight connections on shutdown.
//!
//! By default the server stops on **SIGTERM** (Kubernetes, systemd) or
//! **SIGINT** (Ctrl-C). [`Server::shutdown_on`] replaces that with any future.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::app::App;
use crate::error::Error;

type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    shutdown: Option<ShutdownSignal>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use spry::Server;
    /// let server = Server::bind(([0, 0, 0, 0], 3000));
    /// ```
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into(), shutdown: None }
    }

    /// Stops accepting connections when `signal` resolves instead of on
    /// SIGTERM / Ctrl-C.
    #[must_use]
    pub fn shutdown_on(mut self, signal: impl Future<Output = ()> + Send + 'static) -> Self {
        self.shutdown = Some(Box::pin(signal));
        self
    }

    /// Starts accepting connections and dispatching them through `app`.
    pub async fn serve(self, app: App) -> Result<(), Error> {
        self.serve_with(app, |_| {}).await
    }

    /// Like [`serve`](Server::serve), calling `on_ready` with the bound
    /// address once the listener is up.
    ///
    /// Returns only after a full graceful shutdown: the signal fired and all
    /// in-flight connections completed.
    pub async fn serve_with<F>(self, app: App, on_ready: F) -> Result<(), Error>
    where
        F: FnOnce(SocketAddr),
    {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let app = Arc::new(app);

        info!(addr = %local_addr, routes = app.routes().len(), "spry listening");
        on_ready(local_addr);

        let mut tasks = tokio::task::JoinSet::new();

        let mut shutdown = self.shutdown.unwrap_or_else(|| Box::pin(shutdown_signal()));

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even if more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
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

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { Ok::<_, Infallible>(app.handle(req).await) }
                        });

                        // HTTP/1.1 or HTTP/2, whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set does not grow
                // without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("spry stopped");
        Ok(())
    }
}

/// Resolves on SIGTERM (Unix) or Ctrl-C.
///
/// A signal that cannot be installed is logged and never fires.
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
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
