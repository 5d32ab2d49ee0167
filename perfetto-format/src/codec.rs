use crate::perfetto::{Trace, TracePacket};
use crate::WirePacket;
use bytes::{Bytes, BytesMut};
use prost::Message;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to encode trace: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("failed to decode trace: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("packet {index} carries neither a track descriptor nor a track event")]
    EmptyPacket { index: usize },

    #[error("packet {index} is missing required field {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("packet {index} describes neither a process nor a thread track")]
    UnknownTrack { index: usize },

    #[error("packet {index} has unsupported track event type {value}")]
    UnsupportedEventType { index: usize, value: i32 },
}

/// Serializes packets as a single `Trace` message.
pub fn encode(packets: &[WirePacket]) -> Result<Bytes, CodecError> {
    let trace = Trace {
        packet: packets.iter().cloned().map(TracePacket::from).collect(),
    };
    let mut buf = BytesMut::with_capacity(trace.encoded_len());
    trace.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Parses a `Trace` message. Concatenated single-packet frames, as written by
/// [`crate::TraceWriter`], decode to the same packet sequence.
pub fn decode(bytes: &[u8]) -> Result<Vec<WirePacket>, CodecError> {
    let trace = Trace::decode(bytes)?;
    trace
        .packet
        .into_iter()
        .enumerate()
        .map(|(index, packet)| WirePacket::from_proto(index, packet))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perfetto::{trace_packet, track_event, TrackEvent};
    use crate::{EventKind, TrackEventPacket};
    use rstest::{fixture, rstest};

    #[fixture]
    fn packets() -> Vec<WirePacket> {
        vec![
            WirePacket::process(1, 1, "renderer"),
            WirePacket::thread(2, 1, 1, 7, ""),
            WirePacket::TrackEvent(TrackEventPacket {
                timestamp: 0,
                sequence_id: 3903809,
                track_uuid: 2,
                kind: EventKind::SliceBegin,
                name: Some("frame".to_string()),
                flow_ids: vec![u64::MAX, 3],
            }),
            WirePacket::TrackEvent(TrackEventPacket {
                timestamp: u64::from(u32::MAX) + 5,
                sequence_id: 3903809,
                track_uuid: 2,
                kind: EventKind::SliceEnd,
                name: Some("frame".to_string()),
                flow_ids: vec![u64::MAX, 3],
            }),
            WirePacket::TrackEvent(TrackEventPacket {
                timestamp: 42,
                sequence_id: 3903809,
                track_uuid: 2,
                kind: EventKind::Instant,
                name: None,
                flow_ids: vec![],
            }),
        ]
    }

    #[rstest]
    fn test_round_trip(packets: Vec<WirePacket>) {
        let bytes = encode(&packets).unwrap();
        assert_eq!(decode(&bytes).unwrap(), packets);
    }

    #[test]
    fn test_empty_trace() {
        let bytes = encode(&[]).unwrap();
        assert!(bytes.is_empty());
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_extreme_pids() {
        let packets = vec![
            WirePacket::process(u64::MAX, i32::MAX, "max"),
            WirePacket::thread(u64::MAX - 1, u64::MAX, i32::MAX, i32::MIN, "min"),
        ];
        let bytes = encode(&packets).unwrap();
        assert_eq!(decode(&bytes).unwrap(), packets);
    }

    #[test]
    fn test_garbage_fails() {
        assert!(matches!(
            decode(&[0xff, 0xff, 0xff]),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_packet_without_data() {
        let trace = Trace {
            packet: vec![TracePacket::default()],
        };
        let err = decode(&trace.encode_to_vec()).unwrap_err();
        assert!(matches!(err, CodecError::EmptyPacket { index: 0 }));
    }

    #[test]
    fn test_counter_events_are_rejected() {
        let trace = Trace {
            packet: vec![TracePacket {
                timestamp: Some(1),
                data: Some(trace_packet::Data::TrackEvent(TrackEvent {
                    r#type: Some(track_event::Type::Counter as i32),
                    track_uuid: Some(1),
                    ..Default::default()
                })),
                optional_trusted_packet_sequence_id: Some(
                    trace_packet::OptionalTrustedPacketSequenceId::TrustedPacketSequenceId(1),
                ),
            }],
        };
        let err = decode(&trace.encode_to_vec()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnsupportedEventType { index: 0, value: 4 }
        ));
    }
}
