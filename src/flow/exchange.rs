use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{AppResult, TransportError};
use crate::session::CompletionSink;
use crate::utils::current_time_ms;

use super::worker::{FlowGrant, UnitPlan};

const DRAIN_BUFFER_BYTES: usize = 4_096;

/// Runs one data connection after it was accepted: waits for START, moves
/// the planned units, then keeps the connection open until the peer closes
/// it or the transport deallocates the flow.
///
/// # Errors
///
/// Returns an error when reading or writing data units fails.
pub async fn run_granted_flow<R, W>(mut reader: R, mut writer: W, grant: FlowGrant) -> AppResult<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let FlowGrant {
        flow_id,
        start,
        mut shutdown,
    } = grant;

    let run = tokio::select! {
        run = start => match run {
            Ok(run) => run,
            Err(_) => {
                debug!("Flow {}: released before START", flow_id);
                return Ok(());
            }
        },
        () = wait_for_shutdown(&mut shutdown) => {
            debug!("Flow {}: deallocated before START", flow_id);
            return Ok(());
        }
    };
    debug!("Flow {}: executing {:?}", flow_id, run.plan);

    let exchange = async {
        tokio::try_join!(
            receive_units(&mut reader, run.plan, &run.sink),
            send_units(&mut writer, run.plan, &run.sink),
        )
    };
    tokio::select! {
        result = exchange => {
            result?;
        }
        () = wait_for_shutdown(&mut shutdown) => {
            info!("Flow {}: deallocated during the test", flow_id);
            return Ok(());
        }
    }
    debug!("Flow {}: all units exchanged", flow_id);

    let mut scratch = [0u8; DRAIN_BUFFER_BYTES];
    loop {
        tokio::select! {
            read = reader.read(&mut scratch) => match read {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            },
            () = wait_for_shutdown(&mut shutdown) => break,
        }
    }
    Ok(())
}

async fn receive_units<R>(reader: &mut R, plan: UnitPlan, sink: &CompletionSink) -> AppResult<()>
where
    R: AsyncRead + Unpin,
{
    if !plan.receive {
        return Ok(());
    }
    let mut unit = vec![0u8; usize::try_from(plan.unit_size).unwrap_or(usize::MAX)];
    for index in 0..plan.units {
        reader
            .read_exact(&mut unit)
            .await
            .map_err(|err| TransportError::Io {
                context: "receiving data units",
                source: err,
            })?;
        if index == 0 {
            sink.first_received(current_time_ms());
        }
    }
    if plan.units == 0 {
        sink.first_received(current_time_ms());
    }
    sink.last_received(current_time_ms());
    Ok(())
}

async fn send_units<W>(writer: &mut W, plan: UnitPlan, sink: &CompletionSink) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    if !plan.send {
        return Ok(());
    }
    let unit = vec![0x5a_u8; usize::try_from(plan.unit_size).unwrap_or(usize::MAX)];
    for index in 0..plan.units {
        if index == 0 {
            sink.first_sent(current_time_ms());
        }
        writer
            .write_all(&unit)
            .await
            .map_err(|err| TransportError::Io {
                context: "sending data units",
                source: err,
            })?;
    }
    writer.flush().await.map_err(|err| TransportError::Io {
        context: "flushing data units",
        source: err,
    })?;
    if plan.units == 0 {
        sink.first_sent(current_time_ms());
    }
    sink.last_sent(current_time_ms());
    Ok(())
}

/// Resolves once the flow is deallocated or the transport forgot it.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
