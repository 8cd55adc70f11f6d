//! Construction defaults for records.

use serde::{Deserialize, Serialize};

use crate::event::EventBuilder;
use crate::receipt::ReceiptBuilder;

/// The schema version stamped on events that do not name one.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// The decision recorded on receipts that do not name one.
pub const DEFAULT_DECISION: &str = "pending";

/// Defaults applied to fields a caller leaves unset.
///
/// Deserializable so a host can load it from its own configuration; missing
/// keys fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Schema version for new events.
    pub schema_version: String,
    /// Decision for new receipts.
    pub decision: String,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            decision: DEFAULT_DECISION.to_string(),
        }
    }
}

impl RecordConfig {
    /// Start an event with this config's defaults.
    pub fn event_builder(&self) -> EventBuilder {
        EventBuilder::new().schema_version(self.schema_version.clone())
    }

    /// Start a receipt for `event_id` with this config's defaults.
    pub fn receipt_builder(&self, event_id: impl Into<String>) -> ReceiptBuilder {
        ReceiptBuilder::new(event_id).decision(self.decision.clone())
    }
}
