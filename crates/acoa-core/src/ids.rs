//! Record identifiers.
//!
//! Ids are 128-bit random values in the canonical 36-character hyphenated
//! UUID form. They are stored as text: an id read back from the wire is kept
//! verbatim and judged only by [`is_well_formed_id`].

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::{Builder, Uuid};

/// Length of an id in canonical text form.
pub const ID_LEN: usize = 36;

/// Source of fresh ids for records built without an explicit id.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs from the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic v4-layout UUIDs from a seeded RNG.
///
/// Two generators with the same seed yield the same sequence.
#[derive(Debug)]
pub struct SeededIds {
    rng: Mutex<StdRng>,
}

impl SeededIds {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl IdGenerator for SeededIds {
    fn next_id(&self) -> String {
        let bytes: [u8; 16] = match self.rng.lock() {
            Ok(mut rng) => rng.gen(),
            Err(poisoned) => poisoned.into_inner().gen(),
        };
        Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}

/// The structural id check applied by record validation: non-empty and
/// exactly 36 characters.
pub fn is_well_formed_id(id: &str) -> bool {
    id.chars().count() == ID_LEN
}
