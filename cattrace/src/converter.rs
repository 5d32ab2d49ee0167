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

use crate::error::ConvertError;
use crate::registry::{fold_id, TrackRegistry};
use crate::timestamp::TimestampNormalizer;
use chrome_trace_format::{Phase, TraceEvent, PROCESS_NAME, THREAD_NAME};
use perfetto_format::{EventKind, TrackEventPacket, WirePacket};

/// Maps source events onto track event packets.
///
/// Slice and instant events land on their thread's track, which is created
/// on demand. Metadata events only rename tracks in the registry; the renamed
/// descriptors are emitted later from the registry's final state.
#[derive(Debug, Clone, Copy)]
pub struct EventConverter {
    sequence_id: u32,
}

fn required<T: Copy>(
    event: &TraceEvent,
    value: Option<T>,
    field: &'static str,
) -> Result<T, ConvertError> {
    value.ok_or_else(|| ConvertError::MissingField {
        phase: event.ph.clone(),
        field,
    })
}

/// Earliest raw timestamp the event would be normalized at, or `None` when
/// the event normalizes nothing or would be rejected.
fn start_timestamp(event: &TraceEvent) -> Option<i64> {
    match event.ph {
        Phase::Begin | Phase::End | Phase::Instant => event.tid.and(event.ts),
        Phase::Complete => {
            event.tid?;
            let start = event.ts?;
            let duration = event.dur.filter(|&d| d >= 0)?;
            start.checked_add(duration).map(|_| start)
        }
        _ => None,
    }
}

/// Origin for a run: the minimum over every timestamp that conversion will
/// normalize. Slices that are logged when they finish (nested complete
/// events arrive inner first) still land at or after 0.
pub fn earliest_timestamp<'a>(events: impl IntoIterator<Item = &'a TraceEvent>) -> Option<i64> {
    events.into_iter().filter_map(start_timestamp).min()
}

impl EventConverter {
    pub fn new(sequence_id: u32) -> Self {
        Self { sequence_id }
    }

    /// Converts one event into zero, one or two packets.
    ///
    /// On error the registry and normalizer are left untouched.
    pub fn convert(
        &self,
        event: &TraceEvent,
        registry: &mut TrackRegistry,
        normalizer: &mut TimestampNormalizer,
    ) -> Result<Vec<WirePacket>, ConvertError> {
        match &event.ph {
            Phase::Begin => self.convert_single(event, EventKind::SliceBegin, registry, normalizer),
            Phase::End => self.convert_single(event, EventKind::SliceEnd, registry, normalizer),
            Phase::Instant => self.convert_single(event, EventKind::Instant, registry, normalizer),
            Phase::Complete => self.convert_complete(event, registry, normalizer),
            Phase::Metadata => {
                Self::convert_metadata(event, registry)?;
                Ok(Vec::new())
            }
            Phase::ClockSync => Ok(Vec::new()),
            Phase::Other(phase) => Err(ConvertError::UnknownPhase(phase.clone())),
        }
    }

    fn convert_single(
        &self,
        event: &TraceEvent,
        kind: EventKind,
        registry: &mut TrackRegistry,
        normalizer: &mut TimestampNormalizer,
    ) -> Result<Vec<WirePacket>, ConvertError> {
        let tid = required(event, event.tid, "tid")?;
        let ts = required(event, event.ts, "ts")?;

        let timestamp = normalizer.normalize(ts)?;
        let track_uuid = registry.ensure_thread(fold_id(event.pid), fold_id(tid));
        Ok(vec![self.track_event(event, track_uuid, kind, timestamp)])
    }

    /// Legacy complete events become a begin/end pair carrying the same name
    /// and flows, so viewers rebuild a single slice.
    fn convert_complete(
        &self,
        event: &TraceEvent,
        registry: &mut TrackRegistry,
        normalizer: &mut TimestampNormalizer,
    ) -> Result<Vec<WirePacket>, ConvertError> {
        let tid = required(event, event.tid, "tid")?;
        let start = required(event, event.ts, "ts")?;
        let duration = required(event, event.dur, "dur")?;
        if duration < 0 {
            return Err(ConvertError::NegativeDuration(duration));
        }
        let end = start
            .checked_add(duration)
            .ok_or(ConvertError::EndOverflow { start, duration })?;

        let start_timestamp = normalizer.normalize(start)?;
        let end_timestamp = normalizer.normalize(end)?;
        let track_uuid = registry.ensure_thread(fold_id(event.pid), fold_id(tid));

        Ok(vec![
            self.track_event(event, track_uuid, EventKind::SliceBegin, start_timestamp),
            self.track_event(event, track_uuid, EventKind::SliceEnd, end_timestamp),
        ])
    }

    fn convert_metadata(event: &TraceEvent, registry: &mut TrackRegistry) -> Result<(), ConvertError> {
        let pid = fold_id(event.pid);
        let value = event.arg_str("name").unwrap_or_default();

        match event.name.as_deref() {
            Some(PROCESS_NAME) => registry.rename_process(pid, value),
            Some(THREAD_NAME) => {
                let tid = required(event, event.tid, "tid")?;
                registry.rename_thread(pid, fold_id(tid), value);
            }
            other => {
                return Err(ConvertError::UnknownMetadata(
                    other.unwrap_or_default().to_string(),
                ))
            }
        }
        Ok(())
    }

    fn track_event(
        &self,
        event: &TraceEvent,
        track_uuid: u64,
        kind: EventKind,
        timestamp: u64,
    ) -> WirePacket {
        WirePacket::TrackEvent(TrackEventPacket {
            timestamp,
            sequence_id: self.sequence_id,
            track_uuid,
            kind,
            name: event.name.clone().filter(|name| !name.is_empty()),
            flow_ids: event.flow_ids.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    const SEQUENCE_ID: u32 = 3903809;

    struct Harness {
        converter: EventConverter,
        registry: TrackRegistry,
        normalizer: TimestampNormalizer,
    }

    impl Harness {
        fn convert(&mut self, event: &TraceEvent) -> Result<Vec<WirePacket>, ConvertError> {
            self.converter
                .convert(event, &mut self.registry, &mut self.normalizer)
        }
    }

    #[fixture]
    fn harness() -> Harness {
        Harness {
            converter: EventConverter::new(SEQUENCE_ID),
            registry: TrackRegistry::new(),
            normalizer: TimestampNormalizer::new(),
        }
    }

    fn metadata(pid: i64, tid: Option<i64>, kind: &str, value: Option<&str>) -> TraceEvent {
        let args = value.map(|value| {
            json!({ "name": value })
                .as_object()
                .cloned()
                .unwrap_or_default()
        });
        TraceEvent::builder()
            .ph(Phase::Metadata)
            .pid(pid)
            .maybe_tid(tid)
            .name(kind)
            .maybe_args(args)
            .build()
    }

    fn events(packets: &[WirePacket]) -> Vec<&TrackEventPacket> {
        packets.iter().filter_map(WirePacket::as_track_event).collect()
    }

    #[rstest]
    #[case(Phase::Begin, EventKind::SliceBegin)]
    #[case(Phase::End, EventKind::SliceEnd)]
    #[case(Phase::Instant, EventKind::Instant)]
    fn test_single_packet_phases(
        mut harness: Harness,
        #[case] phase: Phase,
        #[case] kind: EventKind,
    ) {
        let event = TraceEvent::builder()
            .ph(phase)
            .pid(1)
            .tid(2)
            .ts(500)
            .name("work")
            .flow_ids(vec![9, 10])
            .build();

        let packets = harness.convert(&event).unwrap();
        assert_eq!(
            packets,
            vec![WirePacket::TrackEvent(TrackEventPacket {
                timestamp: 0,
                sequence_id: SEQUENCE_ID,
                track_uuid: 2,
                kind,
                name: Some("work".to_string()),
                flow_ids: vec![9, 10],
            })]
        );
        assert_eq!(harness.registry.thread(1, 2).unwrap().uuid, 2);
    }

    #[rstest]
    fn test_complete_expands_to_slice_pair(mut harness: Harness) {
        let first = TraceEvent::builder()
            .ph(Phase::Instant)
            .pid(1)
            .tid(1)
            .ts(200)
            .build();
        harness.convert(&first).unwrap();

        let complete = TraceEvent::builder()
            .ph(Phase::Complete)
            .pid(1)
            .tid(1)
            .ts(250)
            .dur(50)
            .name("X")
            .build();
        let packets = harness.convert(&complete).unwrap();
        let packets = events(&packets);

        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].kind, EventKind::SliceBegin);
        assert_eq!(packets[0].timestamp, 50);
        assert_eq!(packets[1].kind, EventKind::SliceEnd);
        assert_eq!(packets[1].timestamp, 100);
        assert_eq!(packets[0].name.as_deref(), Some("X"));
        assert_eq!(packets[1].name.as_deref(), Some("X"));
        assert_eq!(packets[0].track_uuid, packets[1].track_uuid);
    }

    #[rstest]
    fn test_complete_requires_duration(mut harness: Harness) {
        let event = TraceEvent::builder()
            .ph(Phase::Complete)
            .pid(1)
            .tid(1)
            .ts(250)
            .build();
        assert_eq!(
            harness.convert(&event),
            Err(ConvertError::MissingField {
                phase: Phase::Complete,
                field: "dur"
            })
        );
        assert!(harness.registry.is_empty());
        assert_eq!(harness.normalizer.origin(), None);
    }

    #[rstest]
    fn test_negative_duration(mut harness: Harness) {
        let event = TraceEvent::builder()
            .ph(Phase::Complete)
            .pid(1)
            .tid(1)
            .ts(250)
            .dur(-1)
            .build();
        assert_eq!(
            harness.convert(&event),
            Err(ConvertError::NegativeDuration(-1))
        );
    }

    #[rstest]
    #[case(None, Some(10), "tid")]
    #[case(Some(3), None, "ts")]
    fn test_missing_fields(
        mut harness: Harness,
        #[case] tid: Option<i64>,
        #[case] ts: Option<i64>,
        #[case] field: &'static str,
    ) {
        let event = TraceEvent::builder()
            .ph(Phase::Begin)
            .pid(1)
            .maybe_tid(tid)
            .maybe_ts(ts)
            .build();
        assert_eq!(
            harness.convert(&event),
            Err(ConvertError::MissingField {
                phase: Phase::Begin,
                field
            })
        );
        assert!(harness.registry.is_empty());
    }

    #[rstest]
    fn test_unknown_phase_leaves_registry_untouched(mut harness: Harness) {
        let event = TraceEvent::builder()
            .ph(Phase::from("Z"))
            .pid(1)
            .tid(1)
            .ts(10)
            .name("mystery")
            .build();
        assert_eq!(
            harness.convert(&event),
            Err(ConvertError::UnknownPhase("Z".to_string()))
        );
        assert!(harness.registry.is_empty());
        assert_eq!(harness.normalizer.origin(), None);
    }

    #[rstest]
    fn test_clock_sync_is_a_no_op(mut harness: Harness) {
        let event = TraceEvent::builder()
            .ph(Phase::ClockSync)
            .pid(1)
            .ts(10)
            .name("clock_sync")
            .build();
        assert_eq!(harness.convert(&event), Ok(Vec::new()));
        assert!(harness.registry.is_empty());
        assert_eq!(harness.normalizer.origin(), None);
    }

    #[rstest]
    fn test_metadata_renames(mut harness: Harness) {
        assert_eq!(
            harness.convert(&metadata(1, None, PROCESS_NAME, Some("A"))),
            Ok(Vec::new())
        );
        harness
            .convert(&metadata(1, None, PROCESS_NAME, Some("B")))
            .unwrap();
        harness
            .convert(&metadata(1, Some(4), THREAD_NAME, Some("render")))
            .unwrap();

        assert_eq!(harness.registry.processes().len(), 1);
        assert_eq!(harness.registry.process(1).unwrap().name, "B");
        assert_eq!(harness.registry.thread(1, 4).unwrap().name, "render");
    }

    #[rstest]
    fn test_metadata_without_name_arg(mut harness: Harness) {
        harness.registry.rename_process(1, "old");
        harness
            .convert(&metadata(1, None, PROCESS_NAME, None))
            .unwrap();
        assert_eq!(harness.registry.process(1).unwrap().name, "");
    }

    #[rstest]
    fn test_thread_name_requires_tid(mut harness: Harness) {
        assert_eq!(
            harness.convert(&metadata(1, None, THREAD_NAME, Some("main"))),
            Err(ConvertError::MissingField {
                phase: Phase::Metadata,
                field: "tid"
            })
        );
        assert!(harness.registry.is_empty());
    }

    #[rstest]
    fn test_unknown_metadata(mut harness: Harness) {
        assert_eq!(
            harness.convert(&metadata(1, Some(1), "thread_sort_index", Some("3"))),
            Err(ConvertError::UnknownMetadata("thread_sort_index".to_string()))
        );
        assert!(harness.registry.is_empty());
    }

    #[rstest]
    fn test_rename_after_use_applies_to_same_track(mut harness: Harness) {
        let begin = TraceEvent::builder()
            .ph(Phase::Begin)
            .pid(7)
            .tid(8)
            .ts(1)
            .name("f")
            .build();
        let packets = harness.convert(&begin).unwrap();
        harness
            .convert(&metadata(7, Some(8), THREAD_NAME, Some("late")))
            .unwrap();

        let thread = harness.registry.thread(7, 8).unwrap();
        assert_eq!(thread.name, "late");
        assert_eq!(events(&packets)[0].track_uuid, thread.uuid);
    }

    #[rstest]
    fn test_wide_pid_is_folded(mut harness: Harness) {
        let event = TraceEvent::builder()
            .ph(Phase::Instant)
            .pid(2147483648)
            .tid(1)
            .ts(0)
            .build();
        harness.convert(&event).unwrap();
        assert!(harness.registry.process(1).is_some());
    }

    #[rstest]
    fn test_empty_name_is_dropped(mut harness: Harness) {
        let event = TraceEvent::builder()
            .ph(Phase::End)
            .pid(1)
            .tid(1)
            .ts(0)
            .name("")
            .build();
        let packets = harness.convert(&event).unwrap();
        assert_eq!(events(&packets)[0].name, None);
    }

    fn complete(ts: i64, dur: Option<i64>, tid: Option<i64>) -> TraceEvent {
        TraceEvent::builder()
            .ph(Phase::Complete)
            .pid(1)
            .maybe_tid(tid)
            .ts(ts)
            .maybe_dur(dur)
            .build()
    }

    #[test]
    fn test_earliest_timestamp_skips_unconverted_events() {
        let events = vec![
            complete(200, Some(10), Some(1)),
            complete(100, Some(200), Some(1)),
            complete(50, Some(-1), Some(1)),
            complete(40, None, Some(1)),
            complete(30, Some(5), None),
            metadata(1, Some(1), THREAD_NAME, Some("main")),
            TraceEvent::builder().ph(Phase::ClockSync).pid(1).ts(10).build(),
            TraceEvent::builder().ph(Phase::from("Z")).pid(1).tid(1).ts(5).build(),
        ];
        assert_eq!(earliest_timestamp(&events), Some(100));
        assert_eq!(earliest_timestamp(&events[2..]), None);
    }

    #[test]
    fn test_nested_complete_events_keep_outer_slice() {
        let trace = vec![
            complete(200, Some(10), Some(1)),
            complete(100, Some(200), Some(1)),
        ];
        let origin = earliest_timestamp(&trace).unwrap();
        let mut registry = TrackRegistry::new();
        let mut normalizer = TimestampNormalizer::with_origin(origin);
        let converter = EventConverter::new(SEQUENCE_ID);

        let mut packets = Vec::new();
        for event in &trace {
            packets.extend(
                converter
                    .convert(event, &mut registry, &mut normalizer)
                    .unwrap(),
            );
        }
        let timestamps: Vec<_> = events(&packets)
            .iter()
            .map(|p| (p.kind, p.timestamp))
            .collect();
        assert_eq!(
            timestamps,
            vec![
                (EventKind::SliceBegin, 100),
                (EventKind::SliceEnd, 110),
                (EventKind::SliceBegin, 0),
                (EventKind::SliceEnd, 200),
            ]
        );
    }
}
