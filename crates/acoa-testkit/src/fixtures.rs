//! Test fixtures and helpers.
//!
//! Deterministic clocks and ids, and shortcuts for building chains of
//! events and receipts.

use std::sync::atomic::{AtomicI64, Ordering};

use acoa_core::{Clock, Event, Receipt, SeededIds};
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use serde_json::Value;

/// 2024-01-15T10:30:00Z, the instant fixtures start from.
pub fn epoch() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0)
        .single()
        .expect("valid fixture epoch")
        .fixed_offset()
}

/// A clock that advances by a fixed step every time it is read.
#[derive(Debug)]
pub struct TickingClock {
    start: DateTime<FixedOffset>,
    step_millis: i64,
    ticks: AtomicI64,
}

impl TickingClock {
    pub fn new(start: DateTime<FixedOffset>, step: Duration) -> Self {
        Self {
            start,
            step_millis: step.num_milliseconds(),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for TickingClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::milliseconds(tick * self.step_millis)
    }
}

/// Deterministic record factory: a ticking clock plus seeded ids.
pub struct TestFixture {
    pub clock: TickingClock,
    pub ids: SeededIds,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Fixtures with the same seed produce identical records.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            clock: TickingClock::new(epoch(), Duration::seconds(1)),
            ids: SeededIds::new(seed),
        }
    }

    pub fn make_event(&self, payload: Value) -> Event {
        Event::builder()
            .payload(payload)
            .build_with(&self.clock, &self.ids)
            .expect("fixture payload must be an object")
    }

    pub fn make_event_after(&self, previous: &Event, payload: Value) -> Event {
        Event::builder()
            .payload(payload)
            .follows(previous)
            .build_with(&self.clock, &self.ids)
            .expect("fixture payload must be an object")
    }

    /// `len` events, each linked to the one before it.
    pub fn event_chain(&self, len: usize) -> Vec<Event> {
        let mut chain: Vec<Event> = Vec::with_capacity(len);
        for seq in 0..len {
            let payload = serde_json::json!({ "seq": seq });
            let event = match chain.last() {
                Some(prev) => self.make_event_after(prev, payload),
                None => self.make_event(payload),
            };
            chain.push(event);
        }
        chain
    }

    pub fn make_receipt(&self, event: &Event, decision: &str) -> Receipt {
        Receipt::for_event(event)
            .decision(decision)
            .build_with(&self.clock, &self.ids)
            .expect("fixture event id is non-empty")
    }

    pub fn make_receipt_after(&self, event: &Event, previous: &Receipt, decision: &str) -> Receipt {
        Receipt::for_event(event)
            .decision(decision)
            .follows(previous)
            .build_with(&self.clock, &self.ids)
            .expect("fixture event id is non-empty")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticking_clock_advances() {
        let clock = TickingClock::new(epoch(), Duration::milliseconds(250));
        assert_eq!(clock.now(), epoch());
        assert_eq!(clock.now(), epoch() + Duration::milliseconds(250));
        assert_eq!(clock.now(), epoch() + Duration::milliseconds(500));
    }

    #[test]
    fn test_fixture_chain() {
        let fixture = TestFixture::new();
        let chain = fixture.event_chain(3);

        assert_eq!(chain[0].previous_event_id(), None);
        assert_eq!(chain[1].previous_event_id(), Some(chain[0].id()));
        assert_eq!(chain[2].previous_event_id(), Some(chain[1].id()));
        assert!(chain.iter().all(Event::validate));
        assert!(chain[0].timestamp() < chain[1].timestamp());
    }

    #[test]
    fn test_fixture_is_deterministic() {
        let a = TestFixture::with_seed(5);
        let b = TestFixture::with_seed(5);

        let ea = a.make_event(json!({"k": 1}));
        let eb = b.make_event(json!({"k": 1}));
        assert_eq!(ea, eb);

        let ra = a.make_receipt(&ea, "approved");
        let rb = b.make_receipt(&eb, "approved");
        assert_eq!(ra, rb);
    }

    #[test]
    fn test_receipt_chain() {
        let fixture = TestFixture::new();
        let event = fixture.make_event(json!({"action": "deploy"}));
        let first = fixture.make_receipt(&event, "pending");
        let second = fixture.make_receipt_after(&event, &first, "approved");

        assert_eq!(second.previous_receipt_id(), Some(first.id()));
        assert_eq!(second.event_id(), event.id());
        assert!(first.validate() && second.validate());
    }
}
