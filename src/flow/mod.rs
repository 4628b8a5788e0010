//! TCP data-flow workers: the run plan handed over on START and the task
//! that moves data units over an accepted data connection.
mod exchange;
mod worker;


pub use exchange::run_granted_flow;
pub use worker::{FlowGrant, FlowRun, TcpFlow, TcpFlowWorker, TcpWorkerFactory, UnitPlan};
