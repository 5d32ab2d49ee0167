// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Chrome Trace Format
//!
//! Rust types for the subset of the Chrome Trace Event Format produced by
//! CatTrace-instrumented applications: duration events (B/E), complete events
//! (X), instant events (i), metadata events (M) and clock sync events (c).
//!
//! ## Format Overview
//!
//! Traces can be provided in two formats:
//! - **JSON Array Format**: A simple array of trace events
//! - **JSON Object Format**: An object whose `traceEvents` field holds the array
//!
//! Both are accepted by [`ChromeTrace::parse_lenient`], which keeps every record
//! that deserializes and reports the ones that don't instead of failing the
//! whole document.
//!
//! ## Timestamps
//!
//! Timestamps and durations are integers in the producer's trace clock
//! (microseconds for CatTrace). They are kept signed so that callers can
//! rebase them without overflow checks on every subtraction.

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// The top-level Chrome trace document in JSON Object Format.
///
/// This is the shape written back out by the ingestion front end, one document
/// per session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChromeTrace {
    /// The array of trace events, in the order they were recorded.
    #[serde(rename = "traceEvents")]
    pub trace_events: Vec<TraceEvent>,
}

/// Event phase, the single-character tag that decides how an event is read.
///
/// Phases outside the supported set are preserved verbatim in
/// [`Phase::Other`] so callers can report what they dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    /// Begin phase of a duration event (`B`).
    Begin,
    /// End phase of a duration event (`E`).
    End,
    /// Complete event combining begin and a duration (`X`).
    Complete,
    /// Instant event with no duration (`i`).
    Instant,
    /// Metadata event naming a process or thread (`M`).
    Metadata,
    /// Clock synchronization marker (`c`).
    ClockSync,
    /// Any phase this crate does not model.
    Other(String),
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Begin => "B",
            Phase::End => "E",
            Phase::Complete => "X",
            Phase::Instant => "i",
            Phase::Metadata => "M",
            Phase::ClockSync => "c",
            Phase::Other(other) => other,
        }
    }
}

impl From<String> for Phase {
    fn from(value: String) -> Self {
        match value.as_str() {
            "B" => Phase::Begin,
            "E" => Phase::End,
            "X" => Phase::Complete,
            "i" => Phase::Instant,
            "M" => Phase::Metadata,
            "c" => Phase::ClockSync,
            _ => Phase::Other(value),
        }
    }
}

impl From<&str> for Phase {
    fn from(value: &str) -> Self {
        Phase::from(value.to_string())
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope of an instant event, determining its visual height in the trace viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstantScope {
    /// Global scope - event spans the entire timeline height.
    #[serde(rename = "g")]
    Global,
    /// Process scope - event spans all threads in a process.
    #[serde(rename = "p")]
    Process,
    /// Thread scope - event is confined to a single thread (default).
    #[serde(rename = "t")]
    Thread,
}

impl InstantScope {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "g" => Some(InstantScope::Global),
            "p" => Some(InstantScope::Process),
            "t" => Some(InstantScope::Thread),
            _ => None,
        }
    }
}

/// Metadata event name that renames a process track.
pub const PROCESS_NAME: &str = "process_name";
/// Metadata event name that renames a thread track.
pub const THREAD_NAME: &str = "thread_name";
/// Name carried by clock sync events.
pub const CLOCK_SYNC: &str = "clock_sync";

/// A single trace event.
///
/// Only `ph` and `pid` are required for a record to deserialize. Which of the
/// remaining fields must be present depends on the phase and is checked by the
/// consumer, so one event with a missing field never rejects a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct TraceEvent {
    /// Event phase.
    pub ph: Phase,
    /// Process ID.
    ///
    /// Producers sometimes use wall-clock values here, so the full 64-bit range
    /// is accepted and folding into the wire's 32-bit field is left to the
    /// consumer.
    pub pid: i64,
    /// Thread ID. Required for every phase except process metadata and clock
    /// sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<i64>,
    /// Timestamp in trace clock units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
    /// Display name of the event, or the metadata kind for `M` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub name: Option<String>,
    /// Duration in trace clock units, only meaningful for complete events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dur: Option<i64>,
    /// Flow identifiers linking this event to events on other tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_ids: Option<Vec<u64>>,
    /// Custom arguments. Metadata events carry the new track name in `name`;
    /// the session start marker also carries `type: "START"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,
    /// Instant event scope.
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<InstantScope>,
}

impl TraceEvent {
    /// Returns a string argument, or `None` when absent or not a string.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.as_ref()?.get(key)?.as_str()
    }

    pub fn is_metadata(&self, metadata_name: &str) -> bool {
        self.ph == Phase::Metadata && self.name.as_deref() == Some(metadata_name)
    }
}

/// Error for documents that cannot be read at all.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("invalid trace document: {0}")]
    Json(#[from] serde_json::Error),
}

/// A record that was present in the document but did not deserialize.
#[derive(Debug)]
pub struct RejectedEvent {
    /// Position of the record in the document's event array.
    pub index: usize,
    pub error: serde_json::Error,
}

/// Outcome of lenient parsing: the usable events plus everything that was
/// skipped.
#[derive(Debug, Default)]
pub struct ParsedTrace {
    pub events: Vec<TraceEvent>,
    pub rejected: Vec<RejectedEvent>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Object {
        #[serde(rename = "traceEvents")]
        trace_events: Vec<Value>,
    },
    Array(Vec<Value>),
}

impl ChromeTrace {
    pub fn new(trace_events: Vec<TraceEvent>) -> Self {
        Self { trace_events }
    }

    /// Parses a document in either JSON Object or JSON Array format.
    ///
    /// Fails only when the document itself is not a trace; individual records
    /// that don't match [`TraceEvent`] end up in [`ParsedTrace::rejected`].
    pub fn parse_lenient(bytes: &[u8]) -> Result<ParsedTrace, DocumentError> {
        let raw = match serde_json::from_slice(bytes)? {
            RawDocument::Object { trace_events } => trace_events,
            RawDocument::Array(trace_events) => trace_events,
        };

        let mut parsed = ParsedTrace::default();
        for (index, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<TraceEvent>(value) {
                Ok(event) => parsed.events.push(event),
                Err(error) => parsed.rejected.push(RejectedEvent { index, error }),
            }
        }
        Ok(parsed)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }
}
