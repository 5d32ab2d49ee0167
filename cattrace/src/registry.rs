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

use perfetto_format::WirePacket;
use std::collections::HashMap;

/// Wire pid/tid fields are signed 32-bit; ids are folded with
/// `id mod (2^31 - 1)` so that a wall-clock value used as a pid still fits.
const WIRE_ID_MODULUS: i64 = i32::MAX as i64;

pub fn fold_id(id: i64) -> i32 {
    id.rem_euclid(WIRE_ID_MODULUS) as i32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTrack {
    pub uuid: u64,
    pub pid: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadTrack {
    pub uuid: u64,
    pub parent_uuid: u64,
    pub pid: i32,
    pub tid: i32,
    pub name: String,
}

/// Process and thread tracks discovered during one conversion run.
///
/// Tracks are created on first reference and never removed. A single counter
/// starting at 1 hands out uuids to both kinds, so every uuid in a run is
/// distinct. Names start empty and are overwritten in place by the rename
/// methods; descriptors are built from whatever name a track holds when
/// [`TrackRegistry::descriptors`] is called.
#[derive(Debug)]
pub struct TrackRegistry {
    next_uuid: u64,
    processes: Vec<ProcessTrack>,
    threads: Vec<ThreadTrack>,
    process_index: HashMap<i32, usize>,
    thread_index: HashMap<(i32, i32), usize>,
}

impl Default for TrackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self {
            next_uuid: 1,
            processes: Vec::new(),
            threads: Vec::new(),
            process_index: HashMap::new(),
            thread_index: HashMap::new(),
        }
    }

    fn next_uuid(&mut self) -> u64 {
        let uuid = self.next_uuid;
        self.next_uuid += 1;
        uuid
    }

    fn process_slot(&mut self, pid: i32) -> usize {
        if let Some(&slot) = self.process_index.get(&pid) {
            return slot;
        }

        let uuid = self.next_uuid();
        self.processes.push(ProcessTrack {
            uuid,
            pid,
            name: String::new(),
        });
        let slot = self.processes.len() - 1;
        self.process_index.insert(pid, slot);
        slot
    }

    fn thread_slot(&mut self, pid: i32, tid: i32) -> usize {
        if let Some(&slot) = self.thread_index.get(&(pid, tid)) {
            return slot;
        }

        let process_slot = self.process_slot(pid);
        let parent_uuid = self.processes[process_slot].uuid;
        let uuid = self.next_uuid();
        self.threads.push(ThreadTrack {
            uuid,
            parent_uuid,
            pid,
            tid,
            name: String::new(),
        });
        let slot = self.threads.len() - 1;
        self.thread_index.insert((pid, tid), slot);
        slot
    }

    pub fn ensure_process(&mut self, pid: i32) -> u64 {
        let slot = self.process_slot(pid);
        self.processes[slot].uuid
    }

    /// Returns the thread track's uuid, creating the owning process track
    /// first when it has not been seen yet.
    pub fn ensure_thread(&mut self, pid: i32, tid: i32) -> u64 {
        let slot = self.thread_slot(pid, tid);
        self.threads[slot].uuid
    }

    pub fn rename_process(&mut self, pid: i32, name: impl Into<String>) {
        let slot = self.process_slot(pid);
        self.processes[slot].name = name.into();
    }

    pub fn rename_thread(&mut self, pid: i32, tid: i32, name: impl Into<String>) {
        let slot = self.thread_slot(pid, tid);
        self.threads[slot].name = name.into();
    }

    pub fn process(&self, pid: i32) -> Option<&ProcessTrack> {
        self.process_index.get(&pid).map(|&slot| &self.processes[slot])
    }

    pub fn thread(&self, pid: i32, tid: i32) -> Option<&ThreadTrack> {
        self.thread_index
            .get(&(pid, tid))
            .map(|&slot| &self.threads[slot])
    }

    /// Process tracks in first-seen order.
    pub fn processes(&self) -> &[ProcessTrack] {
        &self.processes
    }

    /// Thread tracks in first-seen order.
    pub fn threads(&self) -> &[ThreadTrack] {
        &self.threads
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty() && self.threads.is_empty()
    }

    /// Track descriptor packets for every track: processes first, then
    /// threads, each in first-seen order.
    pub fn descriptors(&self) -> Vec<WirePacket> {
        let processes = self
            .processes
            .iter()
            .map(|p| WirePacket::process(p.uuid, p.pid, p.name.clone()));
        let threads = self
            .threads
            .iter()
            .map(|t| WirePacket::thread(t.uuid, t.parent_uuid, t.pid, t.tid, t.name.clone()));
        processes.chain(threads).collect()
    }
}
