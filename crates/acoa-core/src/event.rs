//! Event: an immutable canonical fact.
//!
//! An event is built once, with its context hash fixed at construction, and
//! never changes afterwards. Events can name a preceding event to form a
//! chain; the link is carried, not checked.

use chrono::{DateTime, FixedOffset};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::canonical::content_hash;
use crate::clock::{format_timestamp, truncate_to_micros, Clock, SystemClock};
use crate::config::DEFAULT_SCHEMA_VERSION;
use crate::error::{json_kind, CoreError, IntegrityError, Result};
use crate::fields::Fields;
use crate::ids::{is_well_formed_id, IdGenerator, RandomIds};

/// An immutable fact record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    id: String,
    timestamp: DateTime<FixedOffset>,
    payload: Map<String, Value>,
    schema_version: String,
    author: Option<String>,
    context_hash: String,
    previous_event_id: Option<String>,
    signature: Option<String>,
}

impl Event {
    /// Start building an event.
    pub fn builder() -> EventBuilder {
        EventBuilder::new()
    }

    /// Unique identifier, a UUID by default.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the event happened, at microsecond precision.
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// The event's content, in the key order it was given.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Who recorded the event. Not hashed.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// The hash fixed at construction. Not necessarily the hash of the
    /// current content if the caller supplied one; see [`Event::validate`].
    pub fn context_hash(&self) -> &str {
        &self.context_hash
    }

    /// Id of the preceding event in a chain.
    pub fn previous_event_id(&self) -> Option<&str> {
        self.previous_event_id.as_deref()
    }

    /// Opaque signature over the record. Not hashed or verified.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Recompute the content hash.
    ///
    /// Covers `id`, `timestamp`, `payload`, `schema_version` and
    /// `previous_event_id`. `author`, `signature` and the stored hash are
    /// outside it, so a signature can be made over the hash.
    pub fn calculate_hash(&self) -> String {
        content_hash(&self.hashed_content())
    }

    fn hashed_content(&self) -> Value {
        json!({
            "id": self.id,
            "timestamp": format_timestamp(&self.timestamp),
            "payload": self.payload,
            "schema_version": self.schema_version,
            "previous_event_id": self.previous_event_id,
        })
    }

    /// Check integrity, reporting the first failure.
    ///
    /// Order: stored hash against recomputed hash, then id shape.
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
        Ok(())
    }

    /// `true` if the stored hash matches the content and the id is well formed.
    pub fn validate(&self) -> bool {
        match self.check() {
            Ok(()) => true,
            Err(e) => {
                debug!(id = %self.id, error = %e, "event failed integrity check");
                false
            }
        }
    }

    /// The wire form: every field in declaration order, timestamp as ISO
    /// text, absent optionals as null.
    pub fn to_dict(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), Value::from(self.id.clone()));
        map.insert("timestamp".into(), Value::from(format_timestamp(&self.timestamp)));
        map.insert("payload".into(), Value::Object(self.payload.clone()));
        map.insert("schema_version".into(), Value::from(self.schema_version.clone()));
        map.insert("author".into(), Value::from(self.author.clone()));
        map.insert("context_hash".into(), Value::from(self.context_hash.clone()));
        map.insert("previous_event_id".into(), Value::from(self.previous_event_id.clone()));
        map.insert("signature".into(), Value::from(self.signature.clone()));
        map
    }

    /// Rebuild an event from its wire form.
    ///
    /// Missing fields take their construction defaults; a missing
    /// `context_hash` is recomputed, a present one is kept as given.
    pub fn from_dict(data: Map<String, Value>) -> Result<Self> {
        Self::from_dict_with(data, &SystemClock, &RandomIds)
    }

    /// [`Event::from_dict`] with injected defaults for a missing id or timestamp.
    pub fn from_dict_with(
        data: Map<String, Value>,
        clock: &dyn Clock,
        ids: &dyn IdGenerator,
    ) -> Result<Self> {
        let mut fields = Fields::new(data);
        let builder = EventBuilder {
            id: fields.string("id")?,
            timestamp: fields.timestamp("timestamp")?,
            payload: fields.value("payload"),
            schema_version: fields.string("schema_version")?,
            author: fields.optional_string("author")?,
            context_hash: fields.optional_string("context_hash")?,
            previous_event_id: fields.optional_string("previous_event_id")?,
            signature: fields.optional_string("signature")?,
        };
        fields.finish()?;
        builder.build_with(clock, ids)
    }

    /// [`Event::to_dict`] as compact JSON text.
    pub fn to_json(&self) -> String {
        Value::Object(self.to_dict()).to_string()
    }

    /// Parse JSON text and rebuild with [`Event::from_dict`]. Integers keep
    /// every digit, so a record's hash survives the trip.
    pub fn from_json(text: &str) -> Result<Self> {
        let data: Map<String, Value> = serde_json::from_str(text)?;
        Self::from_dict(data)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_dict().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let data = Map::<String, Value>::deserialize(deserializer)?;
        Event::from_dict(data).map_err(de::Error::custom)
    }
}

/// Builder for events. Unset fields take their defaults at build time.
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    id: Option<String>,
    timestamp: Option<DateTime<FixedOffset>>,
    payload: Option<Value>,
    schema_version: Option<String>,
    author: Option<String>,
    context_hash: Option<String>,
    previous_event_id: Option<String>,
    signature: Option<String>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id instead of generating one.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the timestamp instead of reading the clock.
    pub fn timestamp(mut self, ts: impl Into<DateTime<FixedOffset>>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    /// Set the payload. Anything but a JSON object fails at build time.
    pub fn payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = Some(version.into());
        self
    }

    /// Set the author.
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Supply the context hash instead of computing it. Kept verbatim.
    pub fn context_hash(mut self, hash: impl Into<String>) -> Self {
        self.context_hash = Some(hash.into());
        self
    }

    pub fn previous_event_id(mut self, id: impl Into<String>) -> Self {
        self.previous_event_id = Some(id.into());
        self
    }

    /// Link to `previous` as the preceding event.
    pub fn follows(self, previous: &Event) -> Self {
        self.previous_event_id(previous.id.clone())
    }

    /// Attach a signature. It is carried, not checked.
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Build with the system clock and random ids.
    pub fn build(self) -> Result<Event> {
        self.build_with(&SystemClock, &RandomIds)
    }

    /// Build, drawing a missing timestamp from `clock` and a missing id from `ids`.
    pub fn build_with(self, clock: &dyn Clock, ids: &dyn IdGenerator) -> Result<Event> {
        let payload = match self.payload {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => return Err(CoreError::InvalidPayload(json_kind(&other))),
        };

        let mut event = Event {
            id: self.id.unwrap_or_else(|| ids.next_id()),
            timestamp: truncate_to_micros(self.timestamp.unwrap_or_else(|| clock.now())),
            payload,
            schema_version: self
                .schema_version
                .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string()),
            author: self.author,
            context_hash: String::new(),
            previous_event_id: self.previous_event_id,
            signature: self.signature,
        };

        let computed = event.calculate_hash();
        event.context_hash = match self.context_hash {
            Some(supplied) => {
                if supplied != computed {
                    warn!(id = %event.id, %supplied, %computed, "event built with mismatched context hash");
                }
                supplied
            }
            None => computed,
        };

        debug!(id = %event.id, hash = %event.context_hash, "event built");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ids::SeededIds;
    use chrono::{TimeZone, Utc};

    const ID: &str = "3f1c2a9e-8b7d-4c6e-9a5f-0d1e2b3c4d5e";

    fn ts() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap().fixed_offset()
    }

    fn deploy_event() -> Event {
        Event::builder()
            .id(ID)
            .timestamp(ts())
            .payload(json!({"action": "deploy"}))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let clock = FixedClock(ts());
        let event = Event::builder().build_with(&clock, &SeededIds::new(1)).unwrap();

        assert_eq!(event.id().len(), 36);
        assert_eq!(event.timestamp(), ts());
        assert!(event.payload().is_empty());
        assert_eq!(event.schema_version(), "1.0.0");
        assert_eq!(event.author(), None);
        assert_eq!(event.previous_event_id(), None);
        assert_eq!(event.signature(), None);
        assert!(event.validate());
    }

    #[test]
    fn test_default_timestamp_is_utc_now() {
        let before = Utc::now();
        let event = Event::builder().build().unwrap();
        assert_eq!(event.timestamp().offset().local_minus_utc(), 0);
        assert!(event.timestamp() >= truncate_to_micros(before.fixed_offset()));
    }

    #[test]
    fn test_hash_fixed_at_construction() {
        let event = deploy_event();
        assert_eq!(event.context_hash(), event.calculate_hash());
        assert_eq!(event.calculate_hash(), event.calculate_hash());
    }

    #[test]
    fn test_reference_hash() {
        assert_eq!(
            deploy_event().context_hash(),
            "dbf441f53259cbf8ff304864d7eb12198226b65b383d55cf6485a0782571e675"
        );
    }

    #[test]
    fn test_payload_change_changes_hash() {
        let rollback = Event::builder()
            .id(ID)
            .timestamp(ts())
            .payload(json!({"action": "rollback"}))
            .build()
            .unwrap();
        assert_eq!(
            rollback.context_hash(),
            "71638a87da3ea1f150cad7fe6da4575845c3ee85221b38d93ba167d277544f2c"
        );
        assert_ne!(rollback.context_hash(), deploy_event().context_hash());
    }

    #[test]
    fn test_unhashed_fields_do_not_affect_hash() {
        let signed = Event::builder()
            .id(ID)
            .timestamp(ts())
            .payload(json!({"action": "deploy"}))
            .author("ops-bot")
            .signature("sig-bytes")
            .build()
            .unwrap();
        assert_eq!(signed.context_hash(), deploy_event().context_hash());
    }

    #[test]
    fn test_chain_link_is_hashed() {
        let first = deploy_event();
        let linked = Event::builder()
            .id(ID)
            .timestamp(ts())
            .payload(json!({"action": "deploy"}))
            .follows(&first)
            .build()
            .unwrap();
        assert_eq!(linked.previous_event_id(), Some(ID));
        assert_ne!(linked.context_hash(), first.context_hash());
    }

    #[test]
    fn test_rejects_non_object_payload() {
        let err = Event::builder().payload(json!([1, 2, 3])).build().unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload("an array")));

        let err = Event::builder().payload(Value::Null).build().unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload("null")));
    }

    #[test]
    fn test_supplied_hash_is_kept_and_detected() {
        let event = Event::builder()
            .id(ID)
            .timestamp(ts())
            .payload(json!({"action": "deploy"}))
            .context_hash("0".repeat(64))
            .build()
            .unwrap();
        assert_eq!(event.context_hash(), "0".repeat(64));
        assert!(!event.validate());
        assert!(matches!(event.check(), Err(IntegrityError::HashMismatch { .. })));
    }

    #[test]
    fn test_malformed_id_fails_validation() {
        let short = Event::builder().id("evt-1").timestamp(ts()).build().unwrap();
        assert_eq!(short.check(), Err(IntegrityError::MalformedId("evt-1".into())));
        assert!(!short.validate());

        let empty = Event::builder().id("").timestamp(ts()).build().unwrap();
        assert!(!empty.validate());
    }

    #[test]
    fn test_to_dict_exposes_every_field() {
        let dict = deploy_event().to_dict();
        assert_eq!(dict.len(), 8);
        assert_eq!(dict["id"], json!(ID));
        assert_eq!(dict["timestamp"], json!("2024-01-15T10:30:00+00:00"));
        assert_eq!(dict["payload"], json!({"action": "deploy"}));
        assert_eq!(dict["schema_version"], json!("1.0.0"));
        assert_eq!(dict["author"], Value::Null);
        assert_eq!(dict["previous_event_id"], Value::Null);
        assert_eq!(dict["signature"], Value::Null);
        assert_eq!(dict["context_hash"], json!(deploy_event().context_hash()));
    }

    #[test]
    fn test_dict_roundtrip() {
        let event = Event::builder()
            .payload(json!({"n": 1.5, "tags": ["a", "b"]}))
            .author("ops-bot")
            .previous_event_id(ID)
            .signature("sig")
            .build()
            .unwrap();

        let restored = Event::from_dict(event.to_dict()).unwrap();
        assert_eq!(restored, event);
        assert!(restored.validate());
    }

    #[test]
    fn test_to_dict_keeps_field_order() {
        let keys: Vec<String> = deploy_event().to_dict().keys().cloned().collect();
        assert_eq!(
            keys,
            [
                "id",
                "timestamp",
                "payload",
                "schema_version",
                "author",
                "context_hash",
                "previous_event_id",
                "signature",
            ]
        );
    }

    #[test]
    fn test_payload_key_order_survives_text() {
        let text = format!(
            r#"{{"id":"{}","timestamp":"2024-01-15T10:30:00+00:00","payload":{{"zeta":1,"alpha":2}}}}"#,
            ID
        );
        let event = Event::from_json(&text).unwrap();
        assert!(event.to_json().contains(r#""payload":{"zeta":1,"alpha":2}"#));
    }

    #[test]
    fn test_large_integers_survive_text() {
        let event = Event::builder()
            .id(ID)
            .timestamp(ts())
            .payload(serde_json::from_str::<Value>(r#"{"n":12345678901234567890123}"#).unwrap())
            .build()
            .unwrap();

        let back = Event::from_json(&event.to_json()).unwrap();
        assert_eq!(back.payload()["n"].to_string(), "12345678901234567890123");
        assert_eq!(back, event);
        assert!(back.validate());
    }

    #[test]
    fn test_from_dict_rejects_unknown_field() {
        let mut dict = deploy_event().to_dict();
        dict.insert("colour".into(), json!("blue"));
        assert!(matches!(
            Event::from_dict(dict),
            Err(CoreError::UnknownField(ref key)) if key == "colour"
        ));
    }

    #[test]
    fn test_from_dict_checks_payload() {
        let mut dict = deploy_event().to_dict();
        dict.insert("payload".into(), json!([1, 2, 3]));
        assert!(matches!(Event::from_dict(dict), Err(CoreError::InvalidPayload(_))));
    }

    #[test]
    fn test_from_dict_fills_defaults() {
        let dict = json!({"payload": {"k": "v"}});
        let Value::Object(map) = dict else { unreachable!() };

        let clock = FixedClock(ts());
        let event = Event::from_dict_with(map, &clock, &SeededIds::new(3)).unwrap();
        assert_eq!(event.timestamp(), ts());
        assert_eq!(event.schema_version(), "1.0.0");
        assert_eq!(event.id(), SeededIds::new(3).next_id());
        assert!(event.validate());
    }

    #[test]
    fn test_tampered_dict_detected() {
        let mut dict = deploy_event().to_dict();
        dict.insert("payload".into(), json!({"action": "rollback"}));
        let tampered = Event::from_dict(dict).unwrap();
        assert!(!tampered.validate());
    }

    #[test]
    fn test_serde_uses_dict_form() {
        let event = deploy_event();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, Value::Object(event.to_dict()));

        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);

        let bad: std::result::Result<Event, _> = serde_json::from_value(json!({"payload": 3}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_json_text_roundtrip() {
        let event = deploy_event();
        let back = Event::from_json(&event.to_json()).unwrap();
        assert_eq!(back.context_hash(), event.context_hash());
        assert_eq!(back, event);
    }
}
