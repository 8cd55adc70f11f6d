//! # ACOA Core
//!
//! Immutable, content-hashed records for audit trails: [`Event`]s record
//! facts, [`Receipt`]s record decisions about events.
//!
//! This crate contains no I/O, no storage, no networking. Records are plain
//! values, safe to share across threads.
//!
//! ## Key Types
//!
//! - [`Event`] / [`EventBuilder`] - A canonical fact with a context hash
//! - [`Receipt`] / [`ReceiptBuilder`] - A decision referencing an event by id
//! - [`Clock`] / [`IdGenerator`] - Injected sources of "now" and fresh ids
//! - [`RecordConfig`] - Defaults for schema version and decision
//!
//! ## Hashing
//!
//! Context hashes are SHA-256 over canonical JSON of a fixed subset of each
//! record's fields. See the [`canonical`] module.
//!
//! ```rust
//! use acoa_core::{Event, Receipt};
//! use serde_json::json;
//!
//! let event = Event::builder()
//!     .payload(json!({"action": "deploy"}))
//!     .build()
//!     .unwrap();
//! assert!(event.validate());
//!
//! let receipt = Receipt::for_event(&event)
//!     .decision("approved")
//!     .omega_score(0.9)
//!     .build()
//!     .unwrap();
//! assert_eq!(receipt.event_id(), event.id());
//!
//! let restored = Event::from_dict(event.to_dict()).unwrap();
//! assert_eq!(restored.context_hash(), event.context_hash());
//! ```

pub mod canonical;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
mod fields;
pub mod ids;
pub mod receipt;

pub use canonical::{content_hash, to_canonical_json};
pub use clock::{format_timestamp, parse_timestamp, Clock, FixedClock, SystemClock};
pub use config::{RecordConfig, DEFAULT_DECISION, DEFAULT_SCHEMA_VERSION};
pub use error::{CoreError, IntegrityError, Result};
pub use event::{Event, EventBuilder};
pub use ids::{is_well_formed_id, IdGenerator, RandomIds, SeededIds, ID_LEN};
pub use receipt::{Receipt, ReceiptBuilder};
