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

//! Front end for raw producer logs.
//!
//! Instrumented applications print one tagged record per line, either a JSON
//! trace event or a compact pipe-delimited form:
//!
//! ```text
//! CatTrace|B|<pid>|<tid>|<thread name>|<ts>|<name>
//! CatTrace|E|<pid>|<tid>|<thread name>|<ts>|<name>
//! CatTrace|X|<pid>|<tid>|<thread name>|<ts>|<dur>|<name>
//! CatTrace|i|<pid>|<tid>|<thread name>|<scope>|<ts>|<name>
//! CatTrace|M|<pid>|<tid>|<process_name or thread_name>|<value>
//! CatTrace|clock_sync|<pid>|<ts>
//! ```
//!
//! Records are grouped into sessions, each written out as its own JSON trace.

use crate::config::IngestConfig;
use chrome_trace_format::{
    ChromeTrace, InstantScope, Phase, TraceEvent, CLOCK_SYNC, PROCESS_NAME,
};
use eyre::{Context, Result};
use serde_json::{Map, Value};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// `args.type` value on a `process_name` event that opens a new session.
pub const SESSION_START: &str = "START";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line does not contain tag `{0}`")]
    MissingTag(String),

    #[error("empty record")]
    Empty,

    #[error("invalid json record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{kind}` record needs {expected} fields, found {found}")]
    FieldCount {
        kind: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid integer `{value}` for {field}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("unknown record kind `{0}`")]
    UnknownKind(String),
}

pub struct LineParser {
    tag: String,
}

impl LineParser {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// Extracts the record following the tag and its one-character
    /// separator, then parses it as JSON or as a pipe-delimited record.
    pub fn parse_line(&self, line: &str) -> Result<TraceEvent, ParseError> {
        let start = line
            .find(&self.tag)
            .ok_or_else(|| ParseError::MissingTag(self.tag.clone()))?;
        let mut rest = line[start + self.tag.len()..].chars();
        rest.next();
        let record = rest.as_str().trim();

        if record.is_empty() {
            Err(ParseError::Empty)
        } else if record.starts_with('{') {
            Ok(serde_json::from_str(record)?)
        } else {
            parse_pipe_record(record)
        }
    }
}

fn split_fields<'a>(record: &'a str, kind: &str, expected: usize) -> Result<Vec<&'a str>, ParseError> {
    // The trailing field is the event name and may itself contain '|'.
    let fields: Vec<&str> = record.splitn(expected, '|').collect();
    if fields.len() != expected {
        return Err(ParseError::FieldCount {
            kind: kind.to_string(),
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn integer(field: &'static str, value: &str) -> Result<i64, ParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidInteger {
            field,
            value: value.to_string(),
        })
}

fn parse_pipe_record(record: &str) -> Result<TraceEvent, ParseError> {
    let kind = record.split('|').next().unwrap_or_default();

    let event = match kind {
        CLOCK_SYNC => {
            let fields = split_fields(record, kind, 3)?;
            TraceEvent::builder()
                .ph(Phase::ClockSync)
                .pid(integer("pid", fields[1])?)
                .ts(integer("ts", fields[2])?)
                .name(CLOCK_SYNC)
                .build()
        }
        "B" | "E" => {
            let fields = split_fields(record, kind, 6)?;
            TraceEvent::builder()
                .ph(Phase::from(kind))
                .pid(integer("pid", fields[1])?)
                .tid(integer("tid", fields[2])?)
                .ts(integer("ts", fields[4])?)
                .name(fields[5])
                .build()
        }
        "X" => {
            let fields = split_fields(record, kind, 7)?;
            TraceEvent::builder()
                .ph(Phase::Complete)
                .pid(integer("pid", fields[1])?)
                .tid(integer("tid", fields[2])?)
                .ts(integer("ts", fields[4])?)
                .dur(integer("dur", fields[5])?)
                .name(fields[6])
                .build()
        }
        "i" => {
            let fields = split_fields(record, kind, 7)?;
            TraceEvent::builder()
                .ph(Phase::Instant)
                .pid(integer("pid", fields[1])?)
                .tid(integer("tid", fields[2])?)
                .maybe_scope(InstantScope::from_tag(fields[4]))
                .ts(integer("ts", fields[5])?)
                .name(fields[6])
                .build()
        }
        "M" => {
            let fields = split_fields(record, kind, 5)?;
            let mut args = Map::new();
            args.insert("name".to_string(), Value::String(fields[4].to_string()));
            TraceEvent::builder()
                .ph(Phase::Metadata)
                .pid(integer("pid", fields[1])?)
                .tid(integer("tid", fields[2])?)
                .name(fields[3])
                .args(args)
                .build()
        }
        other => return Err(ParseError::UnknownKind(other.to_string())),
    };
    Ok(event)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub name: String,
    pub events: Vec<TraceEvent>,
}

/// Routes events into per-session event lists.
///
/// Events go to the current session and, unless the current session is the
/// global one, to the global session as well. A `process_name` metadata event
/// with `args.type == "START"` opens the session `<name>-<pid>` and is its
/// first event.
pub struct Sessions {
    current: String,
    global: String,
    sessions: Vec<Session>,
}

impl Sessions {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            current: config.default_session.clone(),
            global: config.global_session.clone(),
            sessions: Vec::new(),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    fn events_mut(&mut self, name: &str) -> &mut Vec<TraceEvent> {
        let slot = match self.sessions.iter().position(|s| s.name == name) {
            Some(slot) => slot,
            None => {
                tracing::info!(session = name, "new session");
                self.sessions.push(Session {
                    name: name.to_string(),
                    events: Vec::new(),
                });
                self.sessions.len() - 1
            }
        };
        &mut self.sessions[slot].events
    }

    pub fn record(&mut self, event: TraceEvent) {
        if event.is_metadata(PROCESS_NAME) && event.arg_str("type") == Some(SESSION_START) {
            let process_name = event.arg_str("name").unwrap_or_default();
            self.current = format!("{}-{}", process_name, event.pid);
        }

        let current = self.current.clone();
        let global = self.global.clone();
        if current != global {
            self.events_mut(&current).push(event.clone());
        }
        self.events_mut(&global).push(event);
    }

    /// Writes every session to `<dir>/<session>.json` and returns the paths in
    /// session order.
    pub fn write_json(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output dir={}", dir.display()))?;

        let mut paths = Vec::with_capacity(self.sessions.len());
        for session in &self.sessions {
            let file_name = session.name.replace(['/', '\\'], "_");
            let path = dir.join(format!("{file_name}.json"));
            let json = ChromeTrace::new(session.events.clone()).to_json()?;
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write session path={}", path.display()))?;
            paths.push(path);
        }
        Ok(paths)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub lines: usize,
    pub events: usize,
    pub skipped: usize,
}

/// Reads tagged lines until the first blank line or end of input.
pub fn read_events<R: BufRead>(
    reader: R,
    parser: &LineParser,
    sessions: &mut Sessions,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    for line in reader.lines() {
        let line = line.wrap_err("failed to read input line")?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        summary.lines += 1;

        match parser.parse_line(line) {
            Ok(event) => {
                sessions.record(event);
                summary.events += 1;
            }
            Err(e) => {
                summary.skipped += 1;
                tracing::warn!(error = %e, line, "skipped line");
            }
        }
    }
    Ok(summary)
}
