//! Container configuration

use crate::error::ContainerError;
use serde::{Deserialize, Serialize};

/// Container configuration
///
/// Can be built in code or loaded from TOML:
///
/// ```toml
/// name = "orders"
/// warm_up = true
/// trace_activations = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Name used in log records
    pub name: String,
    /// Compile every planned pipeline when the container is built
    pub warm_up: bool,
    /// Emit a trace record for every activation
    pub trace_activations: bool,
}

impl ContainerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With container name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// With warm-up on build
    #[inline]
    #[must_use]
    pub fn with_warm_up(mut self, warm_up: bool) -> Self {
        self.warm_up = warm_up;
        self
    }

    /// With per-activation tracing
    #[inline]
    #[must_use]
    pub fn with_trace_activations(mut self, trace: bool) -> Self {
        self.trace_activations = trace;
        self
    }

    /// Parse configuration from TOML
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    /// Returns [`ContainerError::InvalidConfig`] if the text is not valid TOML
    /// for this structure.
    pub fn from_toml_str(text: &str) -> Result<Self, ContainerError> {
        toml::from_str(text).map_err(|e| ContainerError::InvalidConfig(e.to_string()))
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            warm_up: false,
            trace_activations: false,
        }
    }
}
