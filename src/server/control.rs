use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::control::{read_frame, write_frame};
use crate::error::{AppError, TransportError};
use crate::flow::TcpWorkerFactory;
use crate::session::{
    ControlChannel, FlowId, SessionEvent, SessionId, SessionPorts, TestController,
};

use super::ServerContext;

/// Queues frames for the writer task of a control connection.
#[derive(Debug, Clone)]
pub struct TcpControlChannel {
    flow_id: FlowId,
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

impl TcpControlChannel {
    #[must_use]
    pub const fn new(flow_id: FlowId, sender: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { flow_id, sender }
    }
}

impl ControlChannel for TcpControlChannel {
    fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.sender
            .send(frame)
            .map_err(|_err| TransportError::ControlChannelClosed {
                flow_id: self.flow_id.0,
            })
    }
}

pub(super) async fn handle_control_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: Arc<ServerContext>,
) {
    let flow_id = context.transport.next_flow_id();
    let session_id = SessionId::from(flow_id);
    info!("Session {}: control connection from {}", session_id, peer);

    let (read_half, mut write_half) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(err) = write_frame(&mut write_half, &frame).await {
                debug!("Session {}: control writer stopped: {}", session_id, err);
                break;
            }
        }
    });

    let ports = SessionPorts {
        transport: Arc::clone(&context.transport),
        workers: TcpWorkerFactory,
        codec: Arc::clone(&context.codec),
        control: Box::new(TcpControlChannel::new(flow_id, out_tx)),
    };
    let limits = context.limits;
    let handle = context.sessions.open_session(session_id, |events| {
        TestController::new(limits, ports, events)
    });

    let mut reader = BufReader::new(read_half);
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(AppError::Transport(TransportError::ConnectionClosed)) => {
                info!("Session {}: control connection closed", session_id);
                break;
            }
            Err(err) => {
                warn!("Session {}: control connection failed: {}", session_id, err);
                break;
            }
        };
        if handle.send(SessionEvent::Control(frame)).is_err() {
            debug!("Session {}: finished, dropping control input", session_id);
            break;
        }
    }
}
