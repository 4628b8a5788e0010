use std::sync::Arc;
use std::time::Duration;

use super::{
    CONTROL_FLOW, MockControl, MockTransport, MockWorkers, encode_parameters, upload_params,
};
use crate::control::{ControlCodec, ControlMessage, JsonControlCodec, OpCode};
use crate::error::{AppError, AppResult};
use crate::session::{
    SessionEvent, SessionId, SessionLimits, SessionManager, SessionPorts, TestController,
};

#[tokio::test]
async fn manager_forgets_session_after_completion() -> AppResult<()> {
    let manager = Arc::new(SessionManager::new());
    let control = MockControl::default();
    let session_id = SessionId::from(CONTROL_FLOW);
    let ports = SessionPorts {
        transport: Arc::new(MockTransport::default()),
        workers: MockWorkers::default(),
        codec: Arc::new(JsonControlCodec),
        control: Box::new(control.clone()),
    };
    let handle = manager.open_session(session_id, |events| {
        TestController::new(SessionLimits::default(), ports, events)
    });
    if manager.get(session_id).is_none() || manager.len() != 1 {
        return Err(AppError::session("Expected session registered"));
    }

    let mut params = upload_params(0);
    params.client_sends = false;
    let create = ControlMessage::new(OpCode::Create, 1).with_value(encode_parameters(&params)?);
    let stop = ControlMessage::new(OpCode::Stop, 3).with_value(b"{}".to_vec());
    for message in [create, ControlMessage::new(OpCode::Start, 2), stop] {
        handle.send(SessionEvent::Control(JsonControlCodec.encode(&message)?))?;
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while !manager.is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_err| AppError::session("Timed out waiting for session to finish"))?;

    if !handle.is_closed() {
        return Err(AppError::session("Expected event queue closed"));
    }
    if super::lock(&control.frames).len() != 2 {
        return Err(AppError::session("Expected CREATE and STOP responses"));
    }
    Ok(())
}

#[tokio::test]
async fn session_without_create_outlives_its_handles() -> AppResult<()> {
    let manager = Arc::new(SessionManager::new());
    let session_id = SessionId::from(CONTROL_FLOW);
    let ports = SessionPorts {
        transport: Arc::new(MockTransport::default()),
        workers: MockWorkers::default(),
        codec: Arc::new(JsonControlCodec),
        control: Box::new(MockControl::default()),
    };
    let handle = manager.open_session(session_id, |events| {
        TestController::new(SessionLimits::default(), ports, events)
    });
    drop(handle);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let live = manager
        .get(session_id)
        .ok_or_else(|| AppError::session("Expected session still registered"))?;
    if live.is_closed() || manager.len() != 1 {
        return Err(AppError::session("Expected session task still running"));
    }
    Ok(())
}
