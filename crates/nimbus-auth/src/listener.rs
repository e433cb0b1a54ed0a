//! Single-use local HTTP listener for the OAuth redirect.
//!
//! [`CallbackListener::bind`] claims the configured address; [`CallbackListener::start`]
//! serves `/callback`, `/term` and `/privacy` in the background and spawns a watcher that
//! waits for the first of:
//!
//! - the HTTP server stopping on its own,
//! - SIGINT/SIGTERM,
//! - a cancel request (or every [`CancelHandle`] being dropped),
//! - the `/callback` handler's outcome.
//!
//! Whichever comes first decides the single [`AuthResult`]. The listener is then shut
//! down gracefully, bounded by [`ProviderConfig::shutdown_timeout`], and force-closed if
//! that bound is exceeded. The result is delivered only after the port has been released.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::ProviderConfig;
use crate::error::{AuthError, CancelReason, Result};
use crate::messages::Messages;
use crate::oauth::{TokenExchange, TokenResponse};
use crate::pages::Page;

/// Outcome of one login attempt: a token or the reason there is none.
pub type AuthResult = std::result::Result<TokenResponse, AuthError>;

/// A bound, not yet serving, callback listener.
pub struct CallbackListener {
    config: Arc<ProviderConfig>,
    exchanger: Arc<dyn TokenExchange>,
    messages: Arc<Messages>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl CallbackListener {
    /// Bind `config.listen_addr`.
    pub async fn bind(
        config: Arc<ProviderConfig>,
        exchanger: Arc<dyn TokenExchange>,
        messages: Arc<Messages>,
    ) -> Result<Self> {
        let listen_error = |source| AuthError::Listen {
            addr: config.listen_addr.clone(),
            source,
        };
        let listener = TcpListener::bind(config.listen_addr.as_str())
            .await
            .map_err(listen_error)?;
        let local_addr = listener.local_addr().map_err(listen_error)?;

        tracing::info!(addr = %local_addr, "Callback listener bound");
        Ok(Self {
            config,
            exchanger,
            messages,
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start serving and return the handle that yields the result.
    ///
    /// SIGINT and SIGTERM end the attempt. tokio keeps its signal handlers installed for
    /// the rest of the process, so after this the default Ctrl+C termination is gone.
    /// Long-lived hosts should use [`CallbackListener::start_with_signal`] instead.
    pub fn start(self) -> ListenerHandle {
        self.start_with_signal(shutdown_signal())
    }

    /// Like [`CallbackListener::start`], but the attempt is canceled when `signal`
    /// resolves. The output names the cause in [`CancelReason::Signal`].
    pub fn start_with_signal<S>(self, signal: S) -> ListenerHandle
    where
        S: Future<Output = String> + Send + 'static,
    {
        let Self {
            config,
            exchanger,
            messages,
            listener,
            local_addr,
        } = self;

        let (callback_tx, callback_rx) = mpsc::channel(1);
        let (cancel_tx, cancel_rx) = mpsc::channel(1);
        let (result_tx, result_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let timeout = config.shutdown_timeout;
        let state = Arc::new(CallbackState {
            config,
            exchanger,
            messages,
            claimed: AtomicBool::new(false),
            callback_tx,
        });

        let router = router(state);
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tokio::spawn(watch(
            server,
            shutdown_tx,
            cancel_rx,
            callback_rx,
            result_tx,
            timeout,
            signal,
        ));

        ListenerHandle {
            local_addr,
            result_rx,
            cancel: CancelHandle { tx: cancel_tx },
        }
    }
}

/// Handle to a running listener.
///
/// Dropping the handle (and every [`CancelHandle`] cloned from it) cancels the attempt.
pub struct ListenerHandle {
    local_addr: SocketAddr,
    result_rx: oneshot::Receiver<AuthResult>,
    cancel: CancelHandle,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the attempt to resolve. The listener is released when this returns.
    pub async fn wait(self) -> AuthResult {
        match self.result_rx.await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Canceled(CancelReason::Server(
                "listener stopped without a result".to_string(),
            ))),
        }
    }
}

/// Requests cancellation of a running login attempt.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: mpsc::Sender<()>,
}

impl CancelHandle {
    /// Ask the listener to stop. Extra requests while one is pending are dropped.
    pub fn cancel(&self) {
        let _ = self.tx.try_send(());
    }
}

struct CallbackState {
    config: Arc<ProviderConfig>,
    exchanger: Arc<dyn TokenExchange>,
    messages: Arc<Messages>,
    /// Set by the first `/callback` request; the listener serves exactly one.
    claimed: AtomicBool,
    callback_tx: mpsc::Sender<AuthResult>,
}

impl CallbackState {
    fn deliver(&self, result: AuthResult) {
        if self.callback_tx.try_send(result).is_err() {
            tracing::debug!("Callback outcome dropped; attempt already resolved");
        }
    }

    fn error_page(&self, status: StatusCode, description: &str, cause: &dyn std::fmt::Display) -> Response {
        let page = Page::error(&self.messages, description, cause);
        (status, Html(page.render(&self.messages))).into_response()
    }
}

fn router(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route("/callback", get(handle_callback))
        .route("/term", get(handle_terms))
        .route("/privacy", get(handle_privacy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Handle GET /callback
async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let messages = state.messages.clone();

    if state.claimed.swap(true, Ordering::SeqCst) {
        return state.error_page(
            StatusCode::CONFLICT,
            messages.token_failed,
            &"this login attempt has already been handled",
        );
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        let (description, cause) = match params.error {
            Some(error) => {
                let cause = match params.error_description {
                    Some(detail) if !detail.is_empty() => format!("{} ({})", error, detail),
                    _ => error,
                };
                (messages.authorization_denied, cause)
            }
            None => (
                messages.missing_code,
                "no authorization code received".to_string(),
            ),
        };
        tracing::warn!(%cause, "Callback without authorization code");
        let response = state.error_page(StatusCode::BAD_REQUEST, description, &cause);
        state.deliver(Err(AuthError::Authorization(format!(
            "no authorization code in callback: {}",
            cause
        ))));
        return response;
    };

    match state.exchanger.exchange_code_for_token(&code).await {
        Ok(token) => {
            tracing::info!("Authorization code exchanged");
            let html = Page::success(&messages).render(&messages);
            state.deliver(Ok(token));
            Html(html).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Token exchange failed");
            let response = state.error_page(StatusCode::BAD_REQUEST, messages.token_failed, &e);
            state.deliver(Err(e));
            response
        }
    }
}

/// Handle GET /term
async fn handle_terms(State(state): State<Arc<CallbackState>>) -> Redirect {
    Redirect::permanent(&state.config.terms_url)
}

/// Handle GET /privacy
async fn handle_privacy(State(state): State<Arc<CallbackState>>) -> Redirect {
    Redirect::permanent(&state.config.privacy_url)
}

async fn watch(
    mut server: JoinHandle<std::io::Result<()>>,
    shutdown_tx: oneshot::Sender<()>,
    mut cancel_rx: mpsc::Receiver<()>,
    mut callback_rx: mpsc::Receiver<AuthResult>,
    result_tx: oneshot::Sender<AuthResult>,
    timeout: Duration,
    signal: impl Future<Output = String>,
) {
    let mut server_stopped = false;

    let result = tokio::select! {
        joined = &mut server => {
            server_stopped = true;
            let msg = match joined {
                Ok(Ok(())) => "server stopped unexpectedly".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            Err(AuthError::Canceled(CancelReason::Server(msg)))
        }
        sig = signal => Err(AuthError::Canceled(CancelReason::Signal(sig))),
        _ = cancel_rx.recv() => Err(AuthError::Canceled(CancelReason::User)),
        Some(outcome) = callback_rx.recv() => outcome,
    };

    match &result {
        Ok(_) => tracing::info!("Login attempt succeeded"),
        Err(e) => tracing::info!(error = %e, "Login attempt ended"),
    }

    if !server_stopped {
        let _ = shutdown_tx.send(());
        match tokio::time::timeout(timeout, &mut server).await {
            Ok(_) => tracing::debug!("Callback listener shut down"),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Graceful shutdown timed out, closing listener"
                );
                server.abort();
                let _ = server.await;
            }
        }
    }

    let _ = result_tx.send(result);
}

/// Resolve with the name of the first termination signal received.
async fn shutdown_signal() -> String {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => tokio::select! {
                _ = sigint.recv() => "SIGINT".to_string(),
                _ = sigterm.recv() => "SIGTERM".to_string(),
            },
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to install signal handlers");
                std::future::pending().await
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "Ctrl+C".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending().await
            }
        }
    }
}
