use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::control::{FlowAccepted, FlowHello, read_json, write_json};
use crate::error::AppResult;
use crate::flow::run_granted_flow;
use crate::session::SessionId;
use crate::transport::TcpFlowTransport;

pub(super) async fn handle_data_connection(
    stream: TcpStream,
    transport: Arc<TcpFlowTransport>,
) -> AppResult<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let hello: FlowHello = read_json(&mut reader, "flow hello").await?;
    let session_id = SessionId(hello.session_id);

    let grant = match transport.offer_connection(session_id)?.await {
        Ok(grant) => grant,
        Err(_) => {
            info!("Session {}: data connection rejected", session_id);
            return Ok(());
        }
    };
    let flow_id = grant.flow_id;
    debug!("Session {}: data connection is flow {}", session_id, flow_id);

    let result = async {
        write_json(
            &mut write_half,
            &FlowAccepted { flow_id: flow_id.0 },
            "flow accepted",
        )
        .await?;
        run_granted_flow(reader, write_half, grant).await
    }
    .await;
    transport.flow_closed(flow_id);
    result
}
