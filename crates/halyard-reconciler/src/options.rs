use halyard_core::Resource;
use serde::{Deserialize, Serialize};

/// Guards on what an apply may do to remote state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Lifecycle {
    /// Fail instead of creating a missing resource.
    pub block_creation: bool,
    /// Fail instead of taking over a resource that already exists.
    pub block_acquire: bool,
    /// Fail if the existing resource differs from desired.
    pub block_modification: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub lifecycle: Lifecycle,
    /// Previously observed state. When set, its identity is used for the
    /// initial fetch instead of the desired state's.
    pub state_hint: Option<Resource>,
}

impl ApplyOptions {
    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_state_hint(mut self, hint: Resource) -> Self {
        self.state_hint = Some(hint);
        self
    }
}
