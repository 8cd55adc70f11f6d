//! Proptest generators for property-based testing.

use acoa_core::{Event, IdGenerator, Receipt, SeededIds};
use chrono::{DateTime, FixedOffset};
use proptest::prelude::*;
use serde_json::{Map, Number, Value};

/// A canonical record id.
pub fn record_id() -> impl Strategy<Value = String> {
    any::<u64>().prop_map(|seed| SeededIds::new(seed).next_id())
}

/// A timestamp between 1970 and 2100 at microsecond precision, with an
/// offset between -12:00 and +14:00.
pub fn timestamp() -> impl Strategy<Value = DateTime<FixedOffset>> {
    (0i64..4_102_444_800, 0u32..1_000_000, -720i32..=840).prop_filter_map(
        "representable timestamp",
        |(secs, micros, offset_minutes)| {
            let offset = FixedOffset::east_opt(offset_minutes * 60)?;
            let utc = DateTime::from_timestamp(secs, micros * 1_000)?;
            Some(utc.with_timezone(&offset))
        },
    )
}

/// A finite float.
pub fn finite_f64() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1e12f64..1e12f64,
        -1e-3f64..1e-3f64,
        Just(0.0),
        Just(1e16),
        Just(1e-5),
    ]
}

/// A JSON scalar.
pub fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        finite_f64().prop_filter_map("finite", |f| Number::from_f64(f).map(Value::Number)),
        "\\PC{0,16}".prop_map(Value::String),
    ]
}

/// An arbitrary JSON value, nested up to three levels.
pub fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// A JSON object, as used for payloads and metrics.
pub fn json_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("\\PC{1,12}", json_value(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

/// A JSON value that is not an object.
pub fn non_object() -> impl Strategy<Value = Value> {
    prop_oneof![
        json_leaf(),
        prop::collection::vec(json_leaf(), 0..4).prop_map(Value::Array),
    ]
}

fn short_text() -> impl Strategy<Value = String> {
    "[a-z0-9.-]{1,16}".prop_map(String::from)
}

/// Parameters for generating an event.
#[derive(Debug, Clone)]
pub struct EventParams {
    pub id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub payload: Map<String, Value>,
    pub schema_version: String,
    pub author: Option<String>,
    pub previous_event_id: Option<String>,
    pub signature: Option<String>,
}

impl Arbitrary for EventParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            record_id(),
            timestamp(),
            json_object(),
            short_text(),
            proptest::option::of(short_text()),
            proptest::option::of(record_id()),
            proptest::option::of("[A-Za-z0-9+/]{8,32}"),
        )
            .prop_map(
                |(id, timestamp, payload, schema_version, author, previous_event_id, signature)| {
                    EventParams {
                        id,
                        timestamp,
                        payload,
                        schema_version,
                        author,
                        previous_event_id,
                        signature,
                    }
                },
            )
            .boxed()
    }
}

/// Build an event from parameters.
pub fn event_from_params(params: &EventParams) -> Event {
    let mut builder = Event::builder()
        .id(params.id.clone())
        .timestamp(params.timestamp)
        .payload(params.payload.clone())
        .schema_version(params.schema_version.clone());
    if let Some(author) = &params.author {
        builder = builder.author(author.clone());
    }
    if let Some(prev) = &params.previous_event_id {
        builder = builder.previous_event_id(prev.clone());
    }
    if let Some(signature) = &params.signature {
        builder = builder.signature(signature.clone());
    }
    builder.build().expect("object payload always builds")
}

/// Parameters for generating a receipt.
#[derive(Debug, Clone)]
pub struct ReceiptParams {
    pub id: String,
    pub event_id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub decision: String,
    pub metrics: Map<String, Value>,
    pub omega_score: Option<f64>,
    pub signer: Option<String>,
    pub previous_receipt_id: Option<String>,
    pub signature: Option<String>,
}

impl Arbitrary for ReceiptParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            record_id(),
            record_id(),
            timestamp(),
            prop_oneof![Just("pending"), Just("approved"), Just("rejected")],
            json_object(),
            proptest::option::of(finite_f64()),
            proptest::option::of(short_text()),
            proptest::option::of(record_id()),
            proptest::option::of("[A-Za-z0-9+/]{8,32}"),
        )
            .prop_map(
                |(
                    id,
                    event_id,
                    timestamp,
                    decision,
                    metrics,
                    omega_score,
                    signer,
                    previous_receipt_id,
                    signature,
                )| ReceiptParams {
                    id,
                    event_id,
                    timestamp,
                    decision: decision.to_string(),
                    metrics,
                    omega_score,
                    signer,
                    previous_receipt_id,
                    signature,
                },
            )
            .boxed()
    }
}

/// Build a receipt from parameters.
pub fn receipt_from_params(params: &ReceiptParams) -> Receipt {
    let mut builder = Receipt::builder(params.event_id.clone())
        .id(params.id.clone())
        .timestamp(params.timestamp)
        .decision(params.decision.clone())
        .metrics(params.metrics.clone());
    if let Some(score) = params.omega_score {
        builder = builder.omega_score(score);
    }
    if let Some(signer) = &params.signer {
        builder = builder.signer(signer.clone());
    }
    if let Some(prev) = &params.previous_receipt_id {
        builder = builder.previous_receipt_id(prev.clone());
    }
    if let Some(signature) = &params.signature {
        builder = builder.signature(signature.clone());
    }
    builder.build().expect("generated receipt always builds")
}

#[cfg(test)]
mod tests {
    use super::*;
    use acoa_core::CoreError;

    proptest! {
        #[test]
        fn test_event_hash_fixed_at_construction(params: EventParams) {
            let event = event_from_params(&params);
            prop_assert_eq!(event.context_hash(), event.calculate_hash());
            prop_assert!(event.validate());
        }

        #[test]
        fn test_receipt_hash_fixed_at_construction(params: ReceiptParams) {
            let receipt = receipt_from_params(&params);
            prop_assert_eq!(receipt.context_hash(), receipt.calculate_hash());
            prop_assert!(receipt.validate());
        }

        #[test]
        fn test_event_hash_deterministic(params: EventParams) {
            let e1 = event_from_params(&params);
            let e2 = event_from_params(&params);
            prop_assert_eq!(e1.calculate_hash(), e1.calculate_hash());
            prop_assert_eq!(e1.context_hash(), e2.context_hash());
        }

        #[test]
        fn test_event_dict_roundtrip(params: EventParams) {
            let event = event_from_params(&params);
            let restored = Event::from_dict(event.to_dict()).unwrap();
            prop_assert!(restored.validate());
            prop_assert_eq!(restored, event);
        }

        #[test]
        fn test_receipt_dict_roundtrip(params: ReceiptParams) {
            let receipt = receipt_from_params(&params);
            let restored = Receipt::from_dict(receipt.to_dict()).unwrap();
            prop_assert!(restored.validate());
            prop_assert_eq!(restored, receipt);
        }

        #[test]
        fn test_event_text_roundtrip(params: EventParams) {
            let event = event_from_params(&params);
            let restored = Event::from_json(&event.to_json()).unwrap();
            prop_assert_eq!(restored.calculate_hash(), event.context_hash());
            prop_assert_eq!(restored, event);
        }

        #[test]
        fn test_receipt_text_roundtrip(params: ReceiptParams) {
            let receipt = receipt_from_params(&params);
            let restored = Receipt::from_json(&receipt.to_json()).unwrap();
            prop_assert_eq!(restored.calculate_hash(), receipt.context_hash());
            prop_assert_eq!(restored, receipt);
        }

        #[test]
        fn test_event_tamper_detected(params: EventParams, forged in "[0-9a-f]{64}") {
            let event = event_from_params(&params);
            prop_assume!(forged != event.context_hash());

            let mut dict = event.to_dict();
            dict.insert("context_hash".into(), Value::String(forged));
            prop_assert!(!Event::from_dict(dict).unwrap().validate());
        }

        #[test]
        fn test_receipt_tamper_detected(params: ReceiptParams, forged in "[0-9a-f]{64}") {
            let receipt = receipt_from_params(&params);
            prop_assume!(forged != receipt.context_hash());

            let mut dict = receipt.to_dict();
            dict.insert("context_hash".into(), Value::String(forged));
            prop_assert!(!Receipt::from_dict(dict).unwrap().validate());
        }

        #[test]
        fn test_payload_change_changes_hash(params: EventParams, key in "[a-z]{1,8}", value in json_leaf()) {
            let event = event_from_params(&params);
            prop_assume!(params.payload.get(&key) != Some(&value));

            let mut changed = params.clone();
            changed.payload.insert(key, value);
            let rebuilt = event_from_params(&changed);
            prop_assert_ne!(rebuilt.context_hash(), event.context_hash());
        }

        #[test]
        fn test_non_object_payload_rejected(payload in non_object()) {
            let result = Event::builder().payload(payload).build();
            prop_assert!(matches!(result, Err(CoreError::InvalidPayload(_))));
        }

        #[test]
        fn test_non_object_metrics_rejected(metrics in non_object()) {
            let result = Receipt::builder("evt").metrics(metrics).build();
            prop_assert!(matches!(result, Err(CoreError::InvalidMetrics(_))));
        }
    }
}
