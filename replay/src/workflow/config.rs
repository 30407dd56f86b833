use crate::generator::profile::MissionConfig;
use anyhow::Context;
use dvlcore::NavConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub navigation: NavConfig,
    pub mission: MissionConfig,
    /// Bounded channel depth between the reader task and the session.
    pub channel_capacity: Option<usize>,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(velocity_bin: usize, ensembles: usize, seed: u64) -> Self {
        Self {
            navigation: NavConfig {
                velocity_bin,
                expected_ensembles: Some(ensembles),
                ..NavConfig::default()
            },
            mission: MissionConfig {
                ensembles,
                seed,
                ..MissionConfig::default()
            },
            channel_capacity: None,
        }
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(32).max(1)
    }
}
