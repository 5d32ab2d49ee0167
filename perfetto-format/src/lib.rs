//! Perfetto trace packet protocol: the wire model written by `cattrace`, its
//! protobuf bindings and the codec between the two.

use bytes::BytesMut;
use prost::Message;
use std::io::Write;

mod codec;
mod packet;

#[allow(clippy::all)]
#[rustfmt::skip]
pub mod perfetto;

pub use codec::{decode, encode, CodecError};
pub use packet::{EventKind, TrackDescriptorPacket, TrackEventPacket, TrackKind, WirePacket};

/// Writes packets to `writer` one `Trace` frame at a time.
///
/// Protobuf concatenates repeated fields across frames, so the stream decodes
/// as a single trace identical to [`encode`] of the same packets.
pub struct TraceWriter<W: Write> {
    writer: W,
    packets_written: usize,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            packets_written: 0,
        }
    }

    pub fn write_packet(&mut self, packet: WirePacket) -> Result<(), std::io::Error> {
        let trace = perfetto::Trace {
            packet: vec![packet.into()],
        };
        let mut buf = BytesMut::with_capacity(trace.encoded_len());
        trace.encode(&mut buf).map_err(std::io::Error::other)?;
        self.writer.write_all(&buf)?;
        self.packets_written += 1;
        Ok(())
    }

    pub fn write_packets(
        &mut self,
        packets: impl IntoIterator<Item = WirePacket>,
    ) -> Result<(), std::io::Error> {
        for packet in packets {
            self.write_packet(packet)?;
        }
        Ok(())
    }

    pub fn packets_written(&self) -> usize {
        self.packets_written
    }

    pub fn flush(&mut self) -> Result<(), std::io::Error> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
