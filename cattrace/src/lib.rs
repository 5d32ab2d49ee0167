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

//! Converts Chrome-style JSON trace event logs into Perfetto track event
//! traces.
//!
//! A run reads one event collection, discovers process and thread tracks as
//! events reference them, rebases timestamps to the first event, and writes
//! track descriptors followed by track events. See [`engine::convert_trace`].

pub mod assembler;
pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod registry;
pub mod timestamp;

pub use engine::{convert_trace, ConversionReport, ConversionSummary, TraceBuilder};
pub use error::{ConvertError, InvariantViolation};
