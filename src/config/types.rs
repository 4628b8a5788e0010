use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub control_listen: Option<String>,
    pub data_listen: Option<String>,
    pub verbose: Option<bool>,
    pub limits: Option<LimitsConfig>,
}

/// Upper bounds for negotiated tests. Requests above them are lowered.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    pub max_flows: Option<u32>,
    #[serde(alias = "max_sdus")]
    pub max_sdus_per_flow: Option<u32>,
    pub max_sdu_size: Option<u32>,
}
