//! TCP front end: one listener for control connections, one for data
//! connections. Each control connection becomes a test session.
mod control;
mod data;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerSettings;
use crate::control::{ControlCodec, JsonControlCodec};
use crate::error::{AppError, AppResult, TransportError};
use crate::session::{SessionLimits, SessionManager};
use crate::shutdown::{setup_signal_shutdown_handler, shutdown_channel};
use crate::transport::TcpFlowTransport;

pub use control::TcpControlChannel;

/// State shared by every connection handler.
pub(crate) struct ServerContext {
    pub(crate) transport: Arc<TcpFlowTransport>,
    pub(crate) sessions: Arc<SessionManager>,
    pub(crate) codec: Arc<dyn ControlCodec>,
    pub(crate) limits: SessionLimits,
}

/// Binds both listeners and serves until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error when a listener cannot be bound.
pub async fn run_server(settings: &ServerSettings) -> AppResult<()> {
    let control = bind(settings.control_listen).await?;
    let data = bind(settings.data_listen).await?;
    info!(
        "Listening for control connections on {} and data connections on {}",
        settings.control_listen, settings.data_listen
    );

    let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
    let result = serve_until(control, data, settings.limits, async move {
        drop(shutdown_rx.recv().await);
    })
    .await;
    drop(shutdown_tx.send(()));
    signal_handle.await?;
    result
}

/// Serves both listeners forever.
///
/// # Errors
///
/// Never returns on its own; the signature matches [`serve_until`].
pub async fn serve(control: TcpListener, data: TcpListener, limits: SessionLimits) -> AppResult<()> {
    serve_until(control, data, limits, std::future::pending()).await
}

/// Serves both listeners until `shutdown` resolves. Sessions still running
/// at that point are abandoned with the runtime.
///
/// # Errors
///
/// Currently infallible; accept failures are logged and skipped.
pub async fn serve_until<S>(
    control: TcpListener,
    data: TcpListener,
    limits: SessionLimits,
    shutdown: S,
) -> AppResult<()>
where
    S: Future<Output = ()>,
{
    let context = Arc::new(ServerContext {
        transport: Arc::new(TcpFlowTransport::new()),
        sessions: Arc::new(SessionManager::new()),
        codec: Arc::new(JsonControlCodec),
        limits,
    });
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!(
                    "Shutting down with {} sessions still open",
                    context.sessions.len()
                );
                return Ok(());
            }
            accepted = control.accept() => match accepted {
                Ok((stream, peer)) => {
                    let context = Arc::clone(&context);
                    tokio::spawn(async move {
                        control::handle_control_connection(stream, peer, context).await;
                    });
                }
                Err(err) => warn!("Failed to accept control connection: {}", err),
            },
            accepted = data.accept() => match accepted {
                Ok((stream, peer)) => {
                    let transport = Arc::clone(&context.transport);
                    tokio::spawn(async move {
                        if let Err(err) = data::handle_data_connection(stream, transport).await {
                            warn!("Data connection from {} failed: {}", peer, err);
                        }
                    });
                }
                Err(err) => warn!("Failed to accept data connection: {}", err),
            },
        }
    }
}

async fn bind(addr: std::net::SocketAddr) -> AppResult<TcpListener> {
    TcpListener::bind(addr).await.map_err(|err| {
        AppError::transport(TransportError::Bind {
            addr: addr.to_string(),
            source: err,
        })
    })
}
