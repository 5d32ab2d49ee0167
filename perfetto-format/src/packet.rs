use crate::perfetto::{
    trace_packet, track_event, ProcessDescriptor, ThreadDescriptor, TrackDescriptor, TrackEvent,
    TracePacket,
};
use crate::CodecError;

/// One packet of the output trace, before it is lowered to protobuf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WirePacket {
    TrackDescriptor(TrackDescriptorPacket),
    TrackEvent(TrackEventPacket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptorPacket {
    pub uuid: u64,
    pub parent_uuid: Option<u64>,
    pub track: TrackKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackKind {
    Process { pid: i32, name: String },
    Thread { pid: i32, tid: i32, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEventPacket {
    pub timestamp: u64,
    /// Trusted packet sequence id shared by every event of one writer.
    pub sequence_id: u32,
    pub track_uuid: u64,
    pub kind: EventKind,
    pub name: Option<String>,
    pub flow_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SliceBegin,
    SliceEnd,
    Instant,
}

impl EventKind {
    pub fn to_proto(self) -> track_event::Type {
        match self {
            EventKind::SliceBegin => track_event::Type::SliceBegin,
            EventKind::SliceEnd => track_event::Type::SliceEnd,
            EventKind::Instant => track_event::Type::Instant,
        }
    }

    pub fn from_proto(value: track_event::Type) -> Option<Self> {
        match value {
            track_event::Type::SliceBegin => Some(EventKind::SliceBegin),
            track_event::Type::SliceEnd => Some(EventKind::SliceEnd),
            track_event::Type::Instant => Some(EventKind::Instant),
            track_event::Type::Unspecified | track_event::Type::Counter => None,
        }
    }
}

impl WirePacket {
    pub fn process(uuid: u64, pid: i32, name: impl Into<String>) -> Self {
        WirePacket::TrackDescriptor(TrackDescriptorPacket {
            uuid,
            parent_uuid: None,
            track: TrackKind::Process {
                pid,
                name: name.into(),
            },
        })
    }

    pub fn thread(uuid: u64, parent_uuid: u64, pid: i32, tid: i32, name: impl Into<String>) -> Self {
        WirePacket::TrackDescriptor(TrackDescriptorPacket {
            uuid,
            parent_uuid: Some(parent_uuid),
            track: TrackKind::Thread {
                pid,
                tid,
                name: name.into(),
            },
        })
    }

    pub fn is_descriptor(&self) -> bool {
        matches!(self, WirePacket::TrackDescriptor(_))
    }

    pub fn as_track_event(&self) -> Option<&TrackEventPacket> {
        match self {
            WirePacket::TrackEvent(event) => Some(event),
            WirePacket::TrackDescriptor(_) => None,
        }
    }

    pub fn as_descriptor(&self) -> Option<&TrackDescriptorPacket> {
        match self {
            WirePacket::TrackDescriptor(descriptor) => Some(descriptor),
            WirePacket::TrackEvent(_) => None,
        }
    }
}

impl From<WirePacket> for TracePacket {
    fn from(packet: WirePacket) -> Self {
        match packet {
            WirePacket::TrackDescriptor(descriptor) => {
                let (process, thread) = match descriptor.track {
                    TrackKind::Process { pid, name } => (
                        Some(ProcessDescriptor {
                            pid: Some(pid),
                            process_name: Some(name),
                        }),
                        None,
                    ),
                    TrackKind::Thread { pid, tid, name } => (
                        None,
                        Some(ThreadDescriptor {
                            pid: Some(pid),
                            tid: Some(tid),
                            thread_name: Some(name),
                        }),
                    ),
                };

                let track_desc = TrackDescriptor {
                    uuid: Some(descriptor.uuid),
                    parent_uuid: descriptor.parent_uuid,
                    process,
                    thread,
                };

                TracePacket {
                    data: Some(trace_packet::Data::TrackDescriptor(track_desc)),
                    ..Default::default()
                }
            }
            WirePacket::TrackEvent(event) => {
                let track_event = TrackEvent {
                    r#type: Some(event.kind.to_proto() as i32),
                    track_uuid: Some(event.track_uuid),
                    flow_ids: event.flow_ids,
                    name_field: event.name.map(track_event::NameField::Name),
                };

                TracePacket {
                    timestamp: Some(event.timestamp),
                    data: Some(trace_packet::Data::TrackEvent(track_event)),
                    optional_trusted_packet_sequence_id: Some(
                        trace_packet::OptionalTrustedPacketSequenceId::TrustedPacketSequenceId(
                            event.sequence_id,
                        ),
                    ),
                }
            }
        }
    }
}

impl WirePacket {
    /// Lifts a decoded protobuf packet back into the wire model. `index` is
    /// the packet's position in the trace and only feeds error messages.
    pub fn from_proto(index: usize, packet: TracePacket) -> Result<Self, CodecError> {
        let missing = |field: &'static str| CodecError::MissingField { index, field };

        match packet.data {
            Some(trace_packet::Data::TrackDescriptor(desc)) => {
                let uuid = desc.uuid.ok_or_else(|| missing("track_descriptor.uuid"))?;
                let track = match (desc.process, desc.thread) {
                    (_, Some(thread)) => TrackKind::Thread {
                        pid: thread.pid.ok_or_else(|| missing("thread.pid"))?,
                        tid: thread.tid.ok_or_else(|| missing("thread.tid"))?,
                        name: thread.thread_name.unwrap_or_default(),
                    },
                    (Some(process), None) => TrackKind::Process {
                        pid: process.pid.ok_or_else(|| missing("process.pid"))?,
                        name: process.process_name.unwrap_or_default(),
                    },
                    (None, None) => return Err(CodecError::UnknownTrack { index }),
                };
                Ok(WirePacket::TrackDescriptor(TrackDescriptorPacket {
                    uuid,
                    parent_uuid: desc.parent_uuid,
                    track,
                }))
            }
            Some(trace_packet::Data::TrackEvent(event)) => {
                let raw_type = event.r#type.ok_or_else(|| missing("track_event.type"))?;
                let kind = track_event::Type::try_from(raw_type)
                    .ok()
                    .and_then(EventKind::from_proto)
                    .ok_or(CodecError::UnsupportedEventType {
                        index,
                        value: raw_type,
                    })?;
                let sequence_id = match packet.optional_trusted_packet_sequence_id {
                    Some(
                        trace_packet::OptionalTrustedPacketSequenceId::TrustedPacketSequenceId(id),
                    ) => id,
                    None => return Err(missing("trusted_packet_sequence_id")),
                };
                Ok(WirePacket::TrackEvent(TrackEventPacket {
                    timestamp: packet.timestamp.ok_or_else(|| missing("timestamp"))?,
                    sequence_id,
                    track_uuid: event
                        .track_uuid
                        .ok_or_else(|| missing("track_event.track_uuid"))?,
                    kind,
                    name: event.name_field.map(|track_event::NameField::Name(name)| name),
                    flow_ids: event.flow_ids,
                }))
            }
            None => Err(CodecError::EmptyPacket { index }),
        }
    }
}
