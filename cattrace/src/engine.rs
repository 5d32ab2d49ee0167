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

use crate::assembler::assemble;
use crate::config::Config;
use crate::converter::{earliest_timestamp, EventConverter};
use crate::error::InvariantViolation;
use crate::registry::TrackRegistry;
use crate::timestamp::TimestampNormalizer;
use chrome_trace_format::{ChromeTrace, TraceEvent};
use eyre::{Context, Result};
use perfetto_format::{TraceWriter, WirePacket};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const OUTPUT_EXTENSION: &str = "perfetto_trace";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Events handed to the converter.
    pub events: usize,
    /// Records that did not deserialize as events.
    pub rejected: usize,
    /// Events dropped as malformed.
    pub skipped: usize,
    /// Events with an unsupported phase or metadata kind.
    pub ignored: usize,
    pub descriptors: usize,
    pub track_events: usize,
}

/// State of one conversion run. Each run needs its own builder so that track
/// uuids and names never leak between output files.
pub struct TraceBuilder {
    converter: EventConverter,
    registry: TrackRegistry,
    normalizer: TimestampNormalizer,
    events: Vec<WirePacket>,
    summary: ConversionSummary,
}

impl TraceBuilder {
    /// Builder whose origin is latched from the first normalized timestamp,
    /// for callers that cannot scan their events ahead of time.
    pub fn new(sequence_id: u32) -> Self {
        Self::with_normalizer(sequence_id, TimestampNormalizer::new())
    }

    /// Builder that rebases onto `origin`, usually [`earliest_timestamp`] of
    /// the events about to be pushed.
    pub fn with_origin(sequence_id: u32, origin: i64) -> Self {
        Self::with_normalizer(sequence_id, TimestampNormalizer::with_origin(origin))
    }

    fn with_normalizer(sequence_id: u32, normalizer: TimestampNormalizer) -> Self {
        Self {
            converter: EventConverter::new(sequence_id),
            registry: TrackRegistry::new(),
            normalizer,
            events: Vec::new(),
            summary: ConversionSummary::default(),
        }
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn push(&mut self, event: &TraceEvent) {
        self.summary.events += 1;
        match self
            .converter
            .convert(event, &mut self.registry, &mut self.normalizer)
        {
            Ok(packets) => {
                self.summary.track_events += packets.len();
                self.events.extend(packets);
            }
            Err(e) if e.is_ignored() => {
                self.summary.ignored += 1;
                tracing::debug!(error = %e, pid = event.pid, ph = %event.ph, "ignored event");
            }
            Err(e) => {
                self.summary.skipped += 1;
                tracing::warn!(error = %e, pid = event.pid, ph = %event.ph, "skipped malformed event");
            }
        }
    }

    /// Emits descriptors from the registry's final state followed by the
    /// converted events.
    pub fn finish(self) -> (Vec<WirePacket>, ConversionSummary) {
        let mut summary = self.summary;
        let packets = assemble(self.events, &self.registry);
        summary.descriptors = packets.len() - summary.track_events;
        (packets, summary)
    }
}

/// Converts a whole event collection. Timestamps are rebased onto the
/// earliest one, so events may arrive in any order.
pub fn convert_events(
    events: &[TraceEvent],
    sequence_id: u32,
) -> (Vec<WirePacket>, ConversionSummary) {
    let mut builder = match earliest_timestamp(events) {
        Some(origin) => TraceBuilder::with_origin(sequence_id, origin),
        None => TraceBuilder::new(sequence_id),
    };
    for event in events {
        builder.push(event);
    }
    builder.finish()
}

/// `trace.json` becomes `trace.perfetto_trace` in the same directory.
pub fn output_path_for(input: &Path) -> PathBuf {
    input.with_extension(OUTPUT_EXTENSION)
}

pub fn write_trace(path: &Path, packets: &[WirePacket]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output path={}", path.display()))?;
    let mut writer = TraceWriter::new(BufWriter::new(file));
    writer.write_packets(packets.iter().cloned())?;
    writer.flush()?;
    Ok(())
}

/// Reads a freshly written trace back and checks that it holds exactly
/// `expected`. Any difference is an [`InvariantViolation`].
pub fn verify_trace(path: &Path, expected: &[WirePacket]) -> Result<()> {
    let violation = |reason: String| InvariantViolation {
        path: path.display().to_string(),
        reason,
    };

    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read back path={}", path.display()))?;
    let encoded = perfetto_format::encode(expected).map_err(|e| violation(e.to_string()))?;
    if bytes[..] != encoded[..] {
        return Err(violation(format!(
            "file holds {} bytes, encoder produced {}",
            bytes.len(),
            encoded.len()
        ))
        .into());
    }

    let decoded = perfetto_format::decode(&bytes).map_err(|e| violation(e.to_string()))?;
    if decoded.len() != expected.len() {
        return Err(violation(format!(
            "decoded {} packets, expected {}",
            decoded.len(),
            expected.len()
        ))
        .into());
    }
    if let Some(index) = decoded.iter().zip(expected).position(|(a, b)| a != b) {
        return Err(violation(format!("packet {index} differs after decoding")).into());
    }
    Ok(())
}

#[derive(Debug)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub summary: ConversionSummary,
}

/// Converts one JSON trace file into a Perfetto trace and self-checks the
/// result. `output` defaults to [`output_path_for`] the input.
pub fn convert_trace(input: &Path, output: Option<&Path>, config: &Config) -> Result<ConversionReport> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("failed to read trace path={}", input.display()))?;
    let parsed = ChromeTrace::parse_lenient(&bytes)
        .with_context(|| format!("failed to parse trace path={}", input.display()))?;

    for rejected in &parsed.rejected {
        tracing::warn!(index = rejected.index, error = %rejected.error, "skipped malformed record");
    }

    let (packets, mut summary) = convert_events(&parsed.events, config.sequence_id);
    summary.rejected = parsed.rejected.len();

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_path_for(input));
    write_trace(&output, &packets)?;
    verify_trace(&output, &packets)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        events = summary.events,
        packets = packets.len(),
        skipped = summary.skipped + summary.rejected,
        ignored = summary.ignored,
        "converted trace"
    );
    Ok(ConversionReport { output, summary })
}
