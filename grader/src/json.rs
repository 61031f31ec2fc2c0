//! Fault-tolerant JSON bridge.
//!
//! Student services answer with arbitrary bodies; decoding one must never
//! abort a grading check. [`decode_lenient`] therefore returns the fault as
//! a value in place of the decoded payload, so the caller inspects at most
//! one fault per logical check: the fault is scoped to the call site
//! instead of a shared log. Encoding failures are programmer errors and
//! propagate normally.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A captured decode failure, keeping the raw body for diagnostics.
#[derive(Debug)]
pub struct DecodeFault {
    pub raw_body: String,
    pub error: serde_json::Error,
}

/// Outcome of a lenient decode: the value, or the fault that prevented it.
#[derive(Debug)]
pub enum Decoded<T> {
    Value(T),
    Fault(DecodeFault),
}

impl<T> Decoded<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Decoded::Value(v) => Some(v),
            Decoded::Fault(_) => None,
        }
    }

    pub fn fault(&self) -> Option<&DecodeFault> {
        match self {
            Decoded::Value(_) => None,
            Decoded::Fault(f) => Some(f),
        }
    }
}

pub fn decode_lenient<T: DeserializeOwned>(raw_body: &str) -> Decoded<T> {
    match serde_json::from_str(raw_body) {
        Ok(value) => Decoded::Value(value),
        Err(error) => Decoded::Fault(DecodeFault {
            raw_body: raw_body.to_string(),
            error,
        }),
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode request body: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

pub fn encode<T: Serialize>(value: &T) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(value)?)
}
