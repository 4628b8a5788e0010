use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use super::controller::TestController;
use super::events::SessionHandle;
use super::ids::SessionId;
use super::ports::{FlowTransport, WorkerFactory};
use super::runner::run_session;

/// Owns the event queues of all live sessions.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl SessionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the event queue for `session_id`, builds its controller and
    /// spawns the task that drives it. The session is forgotten once that
    /// task returns.
    pub fn open_session<T, W, B>(self: &Arc<Self>, session_id: SessionId, build: B) -> SessionHandle
    where
        T: FlowTransport,
        W: WorkerFactory<T::Flow>,
        B: FnOnce(SessionHandle) -> TestController<T, W>,
    {
        let (handle, receiver) = SessionHandle::channel(session_id);
        let controller = build(handle.clone());
        self.lock().insert(session_id, handle.clone());
        info!("Session {}: opened", session_id);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let report = run_session(controller, receiver).await;
            manager.lock().remove(&session_id);
            match report {
                Some(report) => debug!("Session {}: closed with {:?}", session_id, report),
                None => info!("Session {}: closed without a report", session_id),
            }
        });
        handle
    }

    #[must_use]
    pub fn get(&self, session_id: SessionId) -> Option<SessionHandle> {
        self.lock().get(&session_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
