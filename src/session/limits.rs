use crate::control::TestParameters;

pub const DEFAULT_MAX_FLOWS: u32 = 10;
pub const DEFAULT_MAX_SDUS_PER_FLOW: u32 = 1_000_000;
pub const DEFAULT_MAX_SDU_SIZE: u32 = 10_000;

/// Upper bounds applied to every negotiated test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_flows: u32,
    pub max_sdus_per_flow: u32,
    pub max_sdu_size: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_flows: DEFAULT_MAX_FLOWS,
            max_sdus_per_flow: DEFAULT_MAX_SDUS_PER_FLOW,
            max_sdu_size: DEFAULT_MAX_SDU_SIZE,
        }
    }
}

impl SessionLimits {
    /// Lowers every numeric field of `params` that exceeds its limit.
    #[must_use]
    pub fn clamp(&self, mut params: TestParameters) -> TestParameters {
        params.flow_count = params.flow_count.min(self.max_flows);
        params.sdus_per_flow = params.sdus_per_flow.min(self.max_sdus_per_flow);
        params.sdu_size = params.sdu_size.min(self.max_sdu_size);
        params
    }
}
