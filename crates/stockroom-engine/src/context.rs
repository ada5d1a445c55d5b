//! Per-operation context: who is calling, what they typed, and the
//! inventory policy in force for this call.

use stockroom_core::Actor;

use crate::config::InventorySettings;

/// Passed explicitly into every engine operation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Caller, already authorized upstream.
    pub actor: Actor,
    /// Command text as received, kept for the audit log.
    pub raw_command: String,
    pub settings: InventorySettings,
}

impl OperationContext {
    pub fn new(actor: Actor, settings: InventorySettings) -> Self {
        Self {
            actor,
            raw_command: String::new(),
            settings,
        }
    }

    pub fn with_raw_command(mut self, raw_command: impl Into<String>) -> Self {
        self.raw_command = raw_command.into();
        self
    }
}
