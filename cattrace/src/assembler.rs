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

use crate::registry::TrackRegistry;
use perfetto_format::WirePacket;

/// Orders the final trace: every track descriptor from the registry, then the
/// converted events in stream order.
///
/// Descriptors go first so a reader knows every track before any event refers
/// to it, which also means they carry each track's final name only.
pub fn assemble(events: Vec<WirePacket>, registry: &TrackRegistry) -> Vec<WirePacket> {
    debug_assert!(events.iter().all(|packet| !packet.is_descriptor()));

    let mut packets = registry.descriptors();
    packets.reserve(events.len());
    packets.extend(events);
    packets
}
