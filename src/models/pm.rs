use serde::{Deserialize, Serialize};

fn default_active() -> bool {
    true
}

/// One row of the static PM topology: where a PM rolls up and whether it is
/// expected to report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmConfigEntry {
    pub pm: String,

    /// First roll-up key. Defaults to the PM's own code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm_group: Option<String>,

    pub group: String,
    pub fund: String,

    /// Inactive PMs are tracked but never receive fallback balances.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl PmConfigEntry {
    pub fn new(
        pm: impl Into<String>,
        group: impl Into<String>,
        fund: impl Into<String>,
    ) -> Self {
        Self {
            pm: pm.into(),
            pm_group: None,
            group: group.into(),
            fund: fund.into(),
            active: true,
        }
    }

    pub fn with_pm_group(mut self, pm_group: impl Into<String>) -> Self {
        self.pm_group = Some(pm_group.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn pm_group(&self) -> &str {
        self.pm_group.as_deref().unwrap_or(&self.pm)
    }
}
