//! Receipt: an immutable decision about an event.
//!
//! A receipt names its event by id only; nothing here resolves or checks
//! that the event exists. Like events, receipts fix their context hash at
//! construction and can link to a preceding receipt.

use chrono::{DateTime, FixedOffset};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::canonical::content_hash;
use crate::clock::{format_timestamp, truncate_to_micros, Clock, SystemClock};
use crate::config::DEFAULT_DECISION;
use crate::error::{json_kind, CoreError, IntegrityError, Result};
use crate::event::Event;
use crate::fields::Fields;
use crate::ids::{is_well_formed_id, IdGenerator, RandomIds};

/// An immutable decision record.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    id: String,
    event_id: String,
    timestamp: DateTime<FixedOffset>,
    decision: String,
    metrics: Map<String, Value>,
    omega_score: Option<f64>,
    signer: Option<String>,
    context_hash: String,
    previous_receipt_id: Option<String>,
    signature: Option<String>,
}

impl Receipt {
    /// Start building a receipt about the event with id `event_id`.
    pub fn builder(event_id: impl Into<String>) -> ReceiptBuilder {
        ReceiptBuilder::new(event_id)
    }

    /// Start building a receipt about `event`.
    pub fn for_event(event: &Event) -> ReceiptBuilder {
        ReceiptBuilder::new(event.id())
    }

    /// Unique identifier, a UUID by default.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Id of the event this receipt decides on.
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// When the decision was recorded, at microsecond precision.
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Decision label, `"pending"` by default.
    pub fn decision(&self) -> &str {
        &self.decision
    }

    /// Measurements backing the decision.
    pub fn metrics(&self) -> &Map<String, Value> {
        &self.metrics
    }

    /// Optional quality score; always finite.
    pub fn omega_score(&self) -> Option<f64> {
        self.omega_score
    }

    /// Who issued the receipt. Not hashed.
    pub fn signer(&self) -> Option<&str> {
        self.signer.as_deref()
    }

    /// The hash fixed at construction; see [`Receipt::validate`].
    pub fn context_hash(&self) -> &str {
        &self.context_hash
    }

    /// Id of the preceding receipt in a chain.
    pub fn previous_receipt_id(&self) -> Option<&str> {
        self.previous_receipt_id.as_deref()
    }

    /// Opaque signature over the record. Not hashed or verified.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Recompute the content hash.
    ///
    /// Covers `id`, `event_id`, `timestamp`, `decision`, `metrics`,
    /// `omega_score` and `previous_receipt_id`; `signer` and `signature` are
    /// outside it.
    pub fn calculate_hash(&self) -> String {
        content_hash(&self.hashed_content())
    }

    fn hashed_content(&self) -> Value {
        json!({
            "id": self.id,
            "event_id": self.event_id,
            "timestamp": format_timestamp(&self.timestamp),
            "decision": self.decision,
            "metrics": self.metrics,
            "omega_score": self.omega_score,
            "previous_receipt_id": self.previous_receipt_id,
        })
    }

    /// Check integrity: hash, then id shape, then the event reference.
    pub fn check(&self) -> std::result::Result<(), IntegrityError> {
        let computed = self.calculate_hash();
        if computed != self.context_hash {
            return Err(IntegrityError::HashMismatch {
                stored: self.context_hash.clone(),
                computed,
            });
        }
        if !is_well_formed_id(&self.id) {
            return Err(IntegrityError::MalformedId(self.id.clone()));
        }
        if self.event_id.is_empty() {
            return Err(IntegrityError::MissingEventId);
        }
        Ok(())
    }

    /// `true` if [`Receipt::check`] passes.
    pub fn validate(&self) -> bool {
        match self.check() {
            Ok(()) => true,
            Err(e) => {
                debug!(id = %self.id, error = %e, "receipt failed integrity check");
                false
            }
        }
    }

    /// The wire form: all ten fields in declaration order, absent optionals
    /// as null.
    pub fn to_dict(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), Value::from(self.id.clone()));
        map.insert("event_id".into(), Value::from(self.event_id.clone()));
        map.insert("timestamp".into(), Value::from(format_timestamp(&self.timestamp)));
        map.insert("decision".into(), Value::from(self.decision.clone()));
        map.insert("metrics".into(), Value::Object(self.metrics.clone()));
        map.insert("omega_score".into(), Value::from(self.omega_score));
        map.insert("signer".into(), Value::from(self.signer.clone()));
        map.insert("context_hash".into(), Value::from(self.context_hash.clone()));
        map.insert(
            "previous_receipt_id".into(),
            Value::from(self.previous_receipt_id.clone()),
        );
        map.insert("signature".into(), Value::from(self.signature.clone()));
        map
    }

    /// Rebuild a receipt from its wire form. A missing or null `event_id`
    /// fails with [`CoreError::MissingEventId`].
    pub fn from_dict(data: Map<String, Value>) -> Result<Self> {
        Self::from_dict_with(data, &SystemClock, &RandomIds)
    }

    /// [`Receipt::from_dict`] with injected defaults for a missing id or timestamp.
    pub fn from_dict_with(
        data: Map<String, Value>,
        clock: &dyn Clock,
        ids: &dyn IdGenerator,
    ) -> Result<Self> {
        let mut fields = Fields::new(data);
        let builder = ReceiptBuilder {
            id: fields.string("id")?,
            event_id: fields.optional_string("event_id")?.unwrap_or_default(),
            timestamp: fields.timestamp("timestamp")?,
            decision: fields.string("decision")?,
            metrics: fields.value("metrics"),
            omega_score: fields.optional_f64("omega_score")?,
            signer: fields.optional_string("signer")?,
            context_hash: fields.optional_string("context_hash")?,
            previous_receipt_id: fields.optional_string("previous_receipt_id")?,
            signature: fields.optional_string("signature")?,
        };
        fields.finish()?;
        builder.build_with(clock, ids)
    }

    /// [`Receipt::to_dict`] as compact JSON text.
    pub fn to_json(&self) -> String {
        Value::Object(self.to_dict()).to_string()
    }

    /// Parse JSON text and rebuild with [`Receipt::from_dict`].
    pub fn from_json(text: &str) -> Result<Self> {
        let data: Map<String, Value> = serde_json::from_str(text)?;
        Self::from_dict(data)
    }
}

impl Serialize for Receipt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_dict().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Receipt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let data = Map::<String, Value>::deserialize(deserializer)?;
        Receipt::from_dict(data).map_err(de::Error::custom)
    }
}

/// Builder for receipts.
#[derive(Debug, Clone)]
pub struct ReceiptBuilder {
    id: Option<String>,
    event_id: String,
    timestamp: Option<DateTime<FixedOffset>>,
    decision: Option<String>,
    metrics: Option<Value>,
    omega_score: Option<f64>,
    signer: Option<String>,
    context_hash: Option<String>,
    previous_receipt_id: Option<String>,
    signature: Option<String>,
}

impl ReceiptBuilder {
    /// A builder for a receipt about the event with id `event_id`.
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            id: None,
            event_id: event_id.into(),
            timestamp: None,
            decision: None,
            metrics: None,
            omega_score: None,
            signer: None,
            context_hash: None,
            previous_receipt_id: None,
            signature: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn timestamp(mut self, ts: impl Into<DateTime<FixedOffset>>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    /// Set the decision label.
    pub fn decision(mut self, decision: impl Into<String>) -> Self {
        self.decision = Some(decision.into());
        self
    }

    /// Set the metrics. Anything but a JSON object fails at build time.
    pub fn metrics(mut self, metrics: impl Into<Value>) -> Self {
        self.metrics = Some(metrics.into());
        self
    }

    /// Set the score. A non-finite score fails at build time.
    pub fn omega_score(mut self, score: f64) -> Self {
        self.omega_score = Some(score);
        self
    }

    pub fn signer(mut self, signer: impl Into<String>) -> Self {
        self.signer = Some(signer.into());
        self
    }

    /// Supply the context hash instead of computing it. Kept verbatim.
    pub fn context_hash(mut self, hash: impl Into<String>) -> Self {
        self.context_hash = Some(hash.into());
        self
    }

    pub fn previous_receipt_id(mut self, id: impl Into<String>) -> Self {
        self.previous_receipt_id = Some(id.into());
        self
    }

    /// Link to `previous` as the preceding receipt.
    pub fn follows(self, previous: &Receipt) -> Self {
        self.previous_receipt_id(previous.id.clone())
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Build with the system clock and random ids.
    pub fn build(self) -> Result<Receipt> {
        self.build_with(&SystemClock, &RandomIds)
    }

    /// Build, drawing a missing timestamp from `clock` and a missing id from `ids`.
    ///
    /// Fails on an empty event id, then non-object metrics, then a
    /// non-finite score.
    pub fn build_with(self, clock: &dyn Clock, ids: &dyn IdGenerator) -> Result<Receipt> {
        if self.event_id.is_empty() {
            return Err(CoreError::MissingEventId);
        }
        let metrics = match self.metrics {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => return Err(CoreError::InvalidMetrics(json_kind(&other))),
        };
        if let Some(score) = self.omega_score {
            if !score.is_finite() {
                return Err(CoreError::NonFiniteScore(score));
            }
        }

        let mut receipt = Receipt {
            id: self.id.unwrap_or_else(|| ids.next_id()),
            event_id: self.event_id,
            timestamp: truncate_to_micros(self.timestamp.unwrap_or_else(|| clock.now())),
            decision: self.decision.unwrap_or_else(|| DEFAULT_DECISION.to_string()),
            metrics,
            omega_score: self.omega_score,
            signer: self.signer,
            context_hash: String::new(),
            previous_receipt_id: self.previous_receipt_id,
            signature: self.signature,
        };

        let computed = receipt.calculate_hash();
        receipt.context_hash = match self.context_hash {
            Some(supplied) => {
                if supplied != computed {
                    warn!(id = %receipt.id, %supplied, %computed, "receipt built with mismatched context hash");
                }
                supplied
            }
            None => computed,
        };

        debug!(id = %receipt.id, event_id = %receipt.event_id, hash = %receipt.context_hash, "receipt built");
        Ok(receipt)
    }
}
