//! Golden test vectors for cross-implementation verification.
//!
//! Each vector fixes every hashed input of a record together with the hash
//! any conforming producer must reproduce exactly.

use acoa_core::{parse_timestamp, Event, Receipt};
use serde_json::{Map, Value};

/// A golden event.
#[derive(Debug, Clone)]
pub struct EventVector {
    pub name: &'static str,
    pub id: &'static str,
    pub timestamp: &'static str,
    /// Payload as JSON text.
    pub payload: &'static str,
    pub schema_version: &'static str,
    pub author: Option<&'static str>,
    pub previous_event_id: Option<&'static str>,
    pub expected_hash: &'static str,
}

/// A golden receipt.
#[derive(Debug, Clone)]
pub struct ReceiptVector {
    pub name: &'static str,
    pub id: &'static str,
    pub event_id: &'static str,
    pub timestamp: &'static str,
    pub decision: &'static str,
    /// Metrics as JSON text.
    pub metrics: &'static str,
    pub omega_score: Option<f64>,
    pub signer: Option<&'static str>,
    pub previous_receipt_id: Option<&'static str>,
    pub expected_hash: &'static str,
}

pub fn event_vectors() -> Vec<EventVector> {
    vec![
        EventVector {
            name: "deploy event",
            id: "3f1c2a9e-8b7d-4c6e-9a5f-0d1e2b3c4d5e",
            timestamp: "2024-01-15T10:30:00+00:00",
            payload: r#"{"action":"deploy"}"#,
            schema_version: "1.0.0",
            author: None,
            previous_event_id: None,
            expected_hash: "dbf441f53259cbf8ff304864d7eb12198226b65b383d55cf6485a0782571e675",
        },
        EventVector {
            name: "deploy event with one payload value changed",
            id: "3f1c2a9e-8b7d-4c6e-9a5f-0d1e2b3c4d5e",
            timestamp: "2024-01-15T10:30:00+00:00",
            payload: r#"{"action":"rollback"}"#,
            schema_version: "1.0.0",
            author: None,
            previous_event_id: None,
            expected_hash: "71638a87da3ea1f150cad7fe6da4575845c3ee85221b38d93ba167d277544f2c",
        },
        EventVector {
            name: "nested payload, offset timestamp, chain link",
            id: "a0b1c2d3-e4f5-4a6b-8c7d-9e0f1a2b3c4d",
            timestamp: "2024-06-01T08:15:30.123456+05:30",
            payload: r#"{"zeta":[1,2.5,null,true],"alpha":{"nested":"café 🚀","n":-7},"big":1e16,"small":0.00001,"quote":"a\"b\\c\n"}"#,
            schema_version: "2.1.0",
            author: Some("ops-bot"),
            previous_event_id: Some("3f1c2a9e-8b7d-4c6e-9a5f-0d1e2b3c4d5e"),
            expected_hash: "1345fa13eda6372f012b2285ccfe1c054fbc0d0a589fef6ce19c8010aaadcf47",
        },
    ]
}

pub fn receipt_vectors() -> Vec<ReceiptVector> {
    vec![
        ReceiptVector {
            name: "approved receipt with metrics and score",
            id: "5d6e7f80-9a1b-4c2d-8e3f-4a5b6c7d8e9f",
            event_id: "3f1c2a9e-8b7d-4c6e-9a5f-0d1e2b3c4d5e",
            timestamp: "2024-01-15T10:31:00+00:00",
            decision: "approved",
            metrics: r#"{"latency_ms":42,"precision":0.97}"#,
            omega_score: Some(0.875),
            signer: Some("reviewer-1"),
            previous_receipt_id: None,
            expected_hash: "932fb9a84b3b1b87394aef67c8b23d524f571612e88f5bc625aff20b95f41a3b",
        },
        ReceiptVector {
            name: "pending receipt chained to a previous receipt",
            id: "6e7f8091-ab2c-4d3e-9f40-5b6c7d8e9fa0",
            event_id: "a0b1c2d3-e4f5-4a6b-8c7d-9e0f1a2b3c4d",
            timestamp: "2024-06-01T08:16:00+05:30",
            decision: "pending",
            metrics: "{}",
            omega_score: None,
            signer: None,
            previous_receipt_id: Some("5d6e7f80-9a1b-4c2d-8e3f-4a5b6c7d8e9f"),
            expected_hash: "d11d13e1432b79166329252e254cd8227dbc9769af81dc34b3efa9cfe15cb492",
        },
        ReceiptVector {
            name: "integral score keeps its fractional digit",
            id: "6e7f8091-ab2c-4d3e-9f40-5b6c7d8e9fa0",
            event_id: "a0b1c2d3-e4f5-4a6b-8c7d-9e0f1a2b3c4d",
            timestamp: "2024-06-01T08:16:00+05:30",
            decision: "pending",
            metrics: "{}",
            omega_score: Some(1.0),
            signer: None,
            previous_receipt_id: None,
            expected_hash: "e8924c24ee56c01f85712115dbf08d93cb399e1a968d434fa3cdf97e44f45f9c",
        },
    ]
}

fn object(text: &str) -> Map<String, Value> {
    serde_json::from_str(text).expect("vector JSON is a valid object")
}

/// Build the event described by a vector. The hash is computed, not supplied.
pub fn build_event(vector: &EventVector) -> Event {
    let mut builder = Event::builder()
        .id(vector.id)
        .timestamp(parse_timestamp(vector.timestamp).expect("vector timestamp parses"))
        .payload(object(vector.payload))
        .schema_version(vector.schema_version);
    if let Some(author) = vector.author {
        builder = builder.author(author);
    }
    if let Some(prev) = vector.previous_event_id {
        builder = builder.previous_event_id(prev);
    }
    builder.build().expect("vector event builds")
}

/// Build the receipt described by a vector.
pub fn build_receipt(vector: &ReceiptVector) -> Receipt {
    let mut builder = Receipt::builder(vector.event_id)
        .id(vector.id)
        .timestamp(parse_timestamp(vector.timestamp).expect("vector timestamp parses"))
        .decision(vector.decision)
        .metrics(object(vector.metrics));
    if let Some(score) = vector.omega_score {
        builder = builder.omega_score(score);
    }
    if let Some(signer) = vector.signer {
        builder = builder.signer(signer);
    }
    if let Some(prev) = vector.previous_receipt_id {
        builder = builder.previous_receipt_id(prev);
    }
    builder.build().expect("vector receipt builds")
}

/// Check every vector: `(name, matches, computed_hash)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let events = event_vectors().into_iter().map(|v| {
        let hash = build_event(&v).context_hash().to_string();
        (v.name.to_string(), hash == v.expected_hash, hash)
    });
    let receipts = receipt_vectors().into_iter().map(|v| {
        let hash = build_receipt(&v).context_hash().to_string();
        (v.name.to_string(), hash == v.expected_hash, hash)
    });
    events.chain(receipts).collect()
}
