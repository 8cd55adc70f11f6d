//! # ACOA Testkit
//!
//! Testing utilities for ACOA records.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed inputs with the hashes every implementation must produce
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic clocks, ids, and record chains
//!
//! ## Golden Vectors
//!
//! ```rust
//! use acoa_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, hash) in verify_all_vectors() {
//!     assert!(matches, "{}: {}", name, hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use acoa_testkit::generators::{event_from_params, EventParams};
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_fixed_at_construction(params: EventParams) {
//!         let event = event_from_params(&params);
//!         prop_assert_eq!(event.context_hash(), event.calculate_hash());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use acoa_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let chain = fixture.event_chain(3);
//! assert_eq!(chain[2].previous_event_id(), Some(chain[1].id()));
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{epoch, TestFixture, TickingClock};
pub use generators::{event_from_params, receipt_from_params, EventParams, ReceiptParams};
pub use vectors::{
    build_event, build_receipt, event_vectors, receipt_vectors, verify_all_vectors, EventVector,
    ReceiptVector,
};
