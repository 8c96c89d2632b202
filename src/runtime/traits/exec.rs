// ABOUTME: Exec instance management trait.
// ABOUTME: Creates exec instances and inspects them; output is streamed through StreamOps.

use super::options::{ExecConfig, ExecInfo};
use super::sealed::Sealed;
use crate::runtime::error::EngineError;
use crate::types::{ContainerId, ExecId};
use async_trait::async_trait;

/// Exec operations: prepare commands to run in containers.
#[async_trait]
pub trait ExecOps: Sealed + Send + Sync {
    /// Create an exec instance without starting it.
    async fn exec_create(
        &self,
        container: &ContainerId,
        config: &ExecConfig,
    ) -> Result<ExecId, EngineError>;

    /// Current state of an exec instance.
    async fn exec_inspect(&self, exec: &ExecId) -> Result<ExecInfo, EngineError>;
}
