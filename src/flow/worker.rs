use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::control::TestParameters;
use crate::session::{AllocatedFlow, CompletionSink, FlowId, FlowWorker, WorkerFactory};

/// What a data connection has to move once the test starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPlan {
    pub units: u32,
    pub unit_size: u32,
    /// The client sends, so this side reads.
    pub receive: bool,
    /// The server sends, so this side writes.
    pub send: bool,
}

impl UnitPlan {
    #[must_use]
    pub const fn from_parameters(params: &TestParameters) -> Self {
        Self {
            units: params.sdus_per_flow,
            unit_size: params.sdu_size,
            receive: params.client_sends,
            send: params.server_sends,
        }
    }
}

#[derive(Debug)]
pub struct FlowRun {
    pub plan: UnitPlan,
    pub sink: CompletionSink,
}

/// Controller-side half of an allocated TCP flow.
#[derive(Debug)]
pub struct TcpFlow {
    pub(crate) start: oneshot::Sender<FlowRun>,
}

/// Connection-side half of an allocated TCP flow.
#[derive(Debug)]
pub struct FlowGrant {
    pub flow_id: FlowId,
    pub start: oneshot::Receiver<FlowRun>,
    pub shutdown: watch::Receiver<bool>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpWorkerFactory;

impl WorkerFactory<TcpFlow> for TcpWorkerFactory {
    type Worker = TcpFlowWorker;

    fn build(
        &self,
        params: &TestParameters,
        flow: AllocatedFlow<TcpFlow>,
        sink: CompletionSink,
    ) -> TcpFlowWorker {
        TcpFlowWorker {
            flow_id: flow.id,
            start: Some(flow.flow.start),
            run: Some(FlowRun {
                plan: UnitPlan::from_parameters(params),
                sink,
            }),
        }
    }
}

#[derive(Debug)]
pub struct TcpFlowWorker {
    flow_id: FlowId,
    start: Option<oneshot::Sender<FlowRun>>,
    run: Option<FlowRun>,
}

impl FlowWorker for TcpFlowWorker {
    fn execute(&mut self) {
        let (Some(start), Some(run)) = (self.start.take(), self.run.take()) else {
            debug!("Flow {} already started", self.flow_id);
            return;
        };
        if start.send(run).is_err() {
            debug!("Flow {} closed before the test started", self.flow_id);
        }
    }
}
