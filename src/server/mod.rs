//! The Trello webhook server.
//!
//! Lifecycle: a [`WebhookServer`] is constructed from validated config and
//! collects subscribers; [`WebhookServer::start`] binds the listener,
//! resolves the public hostname, and registers the webhook with Trello,
//! yielding a [`RunningServer`]; [`RunningServer::cleanup`] deregisters
//! (best-effort) and shuts the listener down.
//!
//! `start` consumes the server, so a second start of the same instance is a
//! compile error rather than undefined behavior. A failed `start` tears the
//! listener back down before returning, so no half-started state escapes.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub mod webhook;

pub use webhook::{HEADER_SIGNATURE, relay_handler};

use crate::config::ServerConfig;
use crate::hostname::{HostnameError, HostnameProvider};
use crate::trello::{TrelloApi, TrelloApiError};
use crate::types::WebhookId;
use crate::webhooks::{EventHandler, EventKind, HandlerRegistry};

/// Description attached to the webhook registration on Trello's side.
const WEBHOOK_DESCRIPTION: &str = "Trello relay webhook";

/// Maximum accepted request body. Trello action payloads are a few KiB;
/// anything near this limit is not a legitimate delivery.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Errors from [`WebhookServer::start`]. All are fatal for that start
/// attempt; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum StartError {
    /// The listener could not bind the configured port.
    #[error("failed to bind listener: {0}")]
    Listen(#[source] std::io::Error),

    /// The public hostname could not be resolved. No registration was
    /// attempted.
    #[error("failed to resolve public hostname: {0}")]
    HostnameResolution(#[source] HostnameError),

    /// Trello rejected (or failed) the webhook registration.
    #[error("failed to register Trello webhook: {0}")]
    Registration(#[source] TrelloApiError),
}

/// Shared state for request handlers.
///
/// The hostname is the only late-bound field: it is written exactly once
/// during `start`, after the listener is already accepting, and read-only
/// thereafter.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Shared secret for signature verification.
    client_secret: Vec<u8>,

    /// Resolved public hostname; part of the signed content.
    hostname: OnceLock<String>,

    /// Subscribers, fixed before the listener starts.
    registry: HandlerRegistry,
}

impl AppState {
    pub fn new(client_secret: impl Into<Vec<u8>>, registry: HandlerRegistry) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                client_secret: client_secret.into(),
                hostname: OnceLock::new(),
                registry,
            }),
        }
    }

    /// Stores the resolved hostname. Only the first call takes effect.
    pub fn set_hostname(&self, hostname: impl Into<String>) {
        let _ = self.inner.hostname.set(hostname.into());
    }

    /// The resolved hostname, or the empty string before resolution.
    pub fn hostname(&self) -> &str {
        self.inner.hostname.get().map(String::as_str).unwrap_or("")
    }

    pub fn client_secret(&self) -> &[u8] {
        &self.inner.client_secret
    }

    /// The "data" subscribers, in registration order.
    pub fn data_handlers(&self) -> Vec<EventHandler> {
        self.inner.registry.handlers(EventKind::Data).to_vec()
    }
}

/// Builds the axum router. Every path and method lands in the relay
/// handler; Trello does not promise a particular callback path.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(relay_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// A webhook server that has not started yet.
///
/// Collects subscribers, then [`start`](Self::start) takes over.
pub struct WebhookServer {
    config: ServerConfig,
    registry: HandlerRegistry,
}

impl WebhookServer {
    /// Creates a server with an empty registry, no hostname, and no webhook
    /// identifier. Performs no I/O.
    pub fn new(config: ServerConfig) -> Self {
        WebhookServer {
            config,
            registry: HandlerRegistry::new(),
        }
    }

    /// Registers `handler` under the named event kind, returning the server
    /// for chained registration. Unrecognized kind names are a silent no-op.
    pub fn on(mut self, kind: &str, handler: EventHandler) -> Self {
        if let Some(kind) = EventKind::parse(kind) {
            self.registry.subscribe(kind, handler);
        }
        self
    }

    /// Typed subscription; prefer this over [`on`](Self::on) when the kind
    /// is known at compile time.
    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) -> &mut Self {
        self.registry.subscribe(kind, handler);
        self
    }

    /// Starts the server: bind, resolve hostname, register with Trello.
    ///
    /// Resolves only after all three steps succeed. On failure the listener
    /// (if already bound) is shut down before the error is returned, and no
    /// webhook identifier is retained. Not retried internally.
    pub async fn start<H, T>(
        self,
        hostname_provider: &H,
        trello: T,
    ) -> Result<RunningServer<T>, StartError>
    where
        H: HostnameProvider,
        T: TrelloApi,
    {
        let port = self.config.port();
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(StartError::Listen)?;
        let local_addr = listener.local_addr().map_err(StartError::Listen)?;
        info!(port, "listening on local port");

        let state = AppState::new(self.config.client_secret(), self.registry);
        let router = build_router(state.clone());
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone().cancelled_owned();
        let serve_task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
        });

        let hostname = match hostname_provider.resolve(port).await {
            Ok(hostname) => hostname,
            Err(err) => {
                error!(error = %err, "error getting hostname");
                shutdown_listener(&cancel, serve_task).await;
                return Err(StartError::HostnameResolution(err));
            }
        };
        info!(hostname = %hostname, "now accessible");
        state.set_hostname(hostname.clone());

        let webhook_id = match trello
            .create_webhook(WEBHOOK_DESCRIPTION, &hostname, self.config.board_id())
            .await
        {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, "error setting up Trello webhook");
                shutdown_listener(&cancel, serve_task).await;
                return Err(StartError::Registration(err));
            }
        };
        info!(webhook_id = %webhook_id, "Trello webhook registered");

        Ok(RunningServer {
            webhook_id,
            hostname,
            local_addr,
            trello,
            cancel,
            serve_task,
        })
    }
}

impl std::fmt::Debug for WebhookServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookServer")
            .field("port", &self.config.port())
            .field("registry", &self.registry)
            .finish()
    }
}

async fn shutdown_listener(cancel: &CancellationToken, serve_task: JoinHandle<std::io::Result<()>>) {
    cancel.cancel();
    match serve_task.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "listener exited with error"),
        Err(err) => error!(error = %err, "listener task panicked"),
    }
}

/// A started, registered server.
///
/// Holds the webhook identifier Trello assigned; dropping this without
/// calling [`cleanup`](Self::cleanup) leaks the registration on Trello's
/// side.
pub struct RunningServer<T> {
    webhook_id: WebhookId,
    hostname: String,
    local_addr: SocketAddr,
    trello: T,
    cancel: CancellationToken,
    serve_task: JoinHandle<std::io::Result<()>>,
}

impl<T: TrelloApi> RunningServer<T> {
    /// The identifier Trello assigned to this registration.
    pub fn webhook_id(&self) -> &WebhookId {
        &self.webhook_id
    }

    /// The resolved public hostname the webhook was registered with.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The address the listener is bound on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Deregisters the webhook and shuts the listener down.
    ///
    /// Deregistration failures are logged, never propagated: cleanup always
    /// completes, and the listener is closed either way (in-flight requests
    /// are allowed to finish).
    pub async fn cleanup(self) {
        info!("shutting down");
        match self.trello.delete_webhook(&self.webhook_id).await {
            Ok(()) => info!(webhook_id = %self.webhook_id, "Trello webhook unregistered"),
            Err(err) => error!(error = %err, "error unregistering Trello webhook"),
        }
        shutdown_listener(&self.cancel, self.serve_task).await;
    }
}

impl<T> std::fmt::Debug for RunningServer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningServer")
            .field("webhook_id", &self.webhook_id)
            .field("hostname", &self.hostname)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}
