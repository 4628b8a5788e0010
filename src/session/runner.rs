use tokio::sync::mpsc;
use tracing::{debug, info};

use super::controller::TestController;
use super::events::SessionEvent;
use super::ports::{FlowTransport, WorkerFactory};
use super::stats::ThroughputReport;

/// Drives a controller from its event queue until the test completed and
/// every data flow was released.
///
/// The controller keeps a handle to its own queue, so the queue stays open
/// while the session lives. A session whose control connection closes before
/// the test completes keeps waiting here.
pub async fn run_session<T, W>(
    mut controller: TestController<T, W>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) -> Option<ThroughputReport>
where
    T: FlowTransport,
    W: WorkerFactory<T::Flow>,
{
    let session_id = controller.session_id();
    debug!("Session {}: event loop started", session_id);
    while !controller.is_finished() {
        let Some(event) = events.recv().await else {
            // Unreachable while the controller holds its own handle.
            info!(
                "Session {}: event queue closed in {} state",
                session_id,
                controller.state()
            );
            break;
        };
        controller.handle_event(event);
    }
    debug!("Session {}: event loop finished", session_id);
    controller.report()
}
