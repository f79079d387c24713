use parking_lot::Mutex;
use std::path::Path;

use crate::error::MmapBufError;
use crate::memory::Memory;

/// Fixed-size array of metric slots shared with the agent through a
/// memory-mapped file.
///
/// Every access runs under one lock, so read-modify-write updates from
/// different threads never interleave and [`MetricsBuffer::close`] can
/// unmap the file while other threads still hold a reference to the
/// buffer. Indices outside `0..len()` and any access after close are
/// no-ops returning `0.0`.
pub struct MetricsBuffer {
    slot_count: usize,
    memory: Mutex<Option<Memory>>,
}

impl MetricsBuffer {
    /// Map `slot_count` slots of the existing file at `path`.
    pub fn open(path: impl AsRef<Path>, slot_count: usize) -> Result<Self, MmapBufError> {
        let memory = Memory::open(path.as_ref(), slot_count)?;
        Ok(MetricsBuffer {
            slot_count,
            memory: Mutex::new(Some(memory)),
        })
    }

    pub fn len(&self) -> usize {
        self.slot_count
    }

    pub fn is_empty(&self) -> bool {
        self.slot_count == 0
    }

    pub fn is_open(&self) -> bool {
        self.memory.lock().is_some()
    }

    pub fn get(&self, index: usize) -> f32 {
        if index >= self.slot_count {
            return 0.0;
        }
        match self.memory.lock().as_ref() {
            Some(memory) => memory.read(index),
            None => 0.0,
        }
    }

    /// Returns the stored value.
    pub fn set(&self, index: usize, value: f32) -> f32 {
        if index >= self.slot_count {
            return 0.0;
        }
        match self.memory.lock().as_ref() {
            Some(memory) => {
                memory.write(index, value);
                value
            }
            None => 0.0,
        }
    }

    /// Returns the new value.
    pub fn add(&self, index: usize, value: f32) -> f32 {
        if index >= self.slot_count {
            return 0.0;
        }
        match self.memory.lock().as_ref() {
            Some(memory) => {
                let updated = memory.read(index) + value;
                memory.write(index, updated);
                updated
            }
            None => 0.0,
        }
    }

    pub fn sub(&self, index: usize, value: f32) -> f32 {
        self.add(index, -value)
    }

    pub fn inc(&self, index: usize) -> f32 {
        self.add(index, 1.0)
    }

    pub fn dec(&self, index: usize) -> f32 {
        self.add(index, -1.0)
    }

    /// Write dirty pages back to the file. Not needed for the agent to see
    /// updates, which share the same pages.
    pub fn flush(&self) -> Result<(), MmapBufError> {
        match self.memory.lock().as_ref() {
            Some(memory) => memory.flush(),
            None => Ok(()),
        }
    }

    /// Unmap the file. The mapping is released while the lock is held.
    pub fn close(&self) {
        let mut memory = self.memory.lock();
        *memory = None;
    }
}
