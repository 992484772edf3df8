//! Render configuration, persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::kernel::IntegratorParams;
use crate::util::{Error, Result};

/// What the coordinator does when a queue reports a failed launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the failing queue; other queues keep claiming and rendering tiles.
    #[default]
    Continue,
    /// Stop the scheduler so no queue claims another tile.
    FailFast,
}

/// What happens to the in-flight batch when a render is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Drop the batch; nothing of the tile reaches the buffer.
    #[default]
    DiscardBatch,
    /// Write the radiance gathered so far for every path of the batch.
    WritePartial,
}

/// Settings for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    // Image
    pub width: u32,
    pub height: u32,
    pub samples: u32,

    // Integrator
    pub seed: u32,
    /// Scatter events per path. A light sample only counts if the path
    /// scatters again afterwards, so 0 renders no light-sampled illumination
    /// and 1 adds it at the camera hit.
    pub max_bounce: u32,
    pub min_bounce: u32,
    pub filter_width: f32,

    // Device
    /// Execution queues; 0 uses one per available hardware thread.
    pub num_queues: usize,
    pub path_states_per_queue: usize,
    pub record_path_history: bool,

    // Policies
    pub failure_policy: FailurePolicy,
    pub cancel_policy: CancelPolicy,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            samples: 16,
            seed: 0,
            max_bounce: 8,
            min_bounce: 3,
            filter_width: 1.0,
            num_queues: 0,
            path_states_per_queue: 1 << 14,
            record_path_history: false,
            failure_policy: FailurePolicy::default(),
            cancel_policy: CancelPolicy::default(),
        }
    }
}

impl RenderConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(format!("resolution {}x{} is empty", self.width, self.height)));
        }
        if self.samples == 0 {
            return Err(Error::invalid("samples must be > 0"));
        }
        if self.path_states_per_queue == 0 {
            return Err(Error::invalid("path_states_per_queue must be > 0"));
        }
        if !self.filter_width.is_finite() || self.filter_width < 0.0 {
            return Err(Error::invalid(format!("filter_width {} must be >= 0", self.filter_width)));
        }
        Ok(())
    }

    /// Queue count with 0 resolved against the host.
    pub fn resolved_num_queues(&self) -> usize {
        match self.num_queues {
            0 => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n => n,
        }
    }

    pub fn integrator_params(&self) -> IntegratorParams {
        IntegratorParams {
            max_bounce: self.max_bounce,
            min_bounce: self.min_bounce,
            seed: self.seed,
            filter_width: self.filter_width,
        }
    }
}
