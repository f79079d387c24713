use crate::error::MmapBufError;
use core::ptr::NonNull;
use nix::sys::mman::{mmap, msync, munmap, MapFlags, MsFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::num::NonZero;
use std::path::Path;

/// Width of one slot in the buffer file.
pub const SLOT_SIZE: usize = std::mem::size_of::<f32>();

/// Shared read/write mapping of the first `slots * SLOT_SIZE` bytes of a file.
///
/// A mapping of zero slots owns no memory. Values are stored little-endian
/// regardless of the host byte order.
pub struct Memory {
    ptr: NonNull<u32>,
    slots: usize,
    _file: File,
}

impl Memory {
    pub fn open(path: &Path, slots: usize) -> Result<Self, MmapBufError> {
        let size = slots
            .checked_mul(SLOT_SIZE)
            .ok_or(MmapBufError::TooLarge(slots))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| MmapBufError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let actual = file
            .metadata()
            .map_err(|source| MmapBufError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if actual < size as u64 {
            return Err(MmapBufError::TooSmall {
                path: path.to_path_buf(),
                expected: size,
                actual,
            });
        }

        let Some(length) = NonZero::new(size) else {
            return Ok(Memory {
                ptr: NonNull::dangling(),
                slots: 0,
                _file: file,
            });
        };

        let ptr = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &file,
                0,
            )?
        };

        Ok(Memory {
            ptr: ptr.cast(),
            slots,
            _file: file,
        })
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn size(&self) -> usize {
        self.slots * SLOT_SIZE
    }

    pub fn read(&self, index: usize) -> f32 {
        debug_assert!(index < self.slots, "slot {} out of range", index);
        let bits = unsafe { self.ptr.as_ptr().add(index).read_volatile() };
        f32::from_bits(u32::from_le(bits))
    }

    pub fn write(&self, index: usize, value: f32) {
        debug_assert!(index < self.slots, "slot {} out of range", index);
        unsafe {
            self.ptr
                .as_ptr()
                .add(index)
                .write_volatile(value.to_bits().to_le());
        }
    }

    pub fn flush(&self) -> Result<(), MmapBufError> {
        if self.slots == 0 {
            return Ok(());
        }
        unsafe {
            msync(self.ptr.cast(), self.size(), MsFlags::MS_SYNC)
                .map_err(MmapBufError::FlushFailed)
        }
    }
}

impl Drop for Memory {
    fn drop(&mut self) {
        if self.slots == 0 {
            return;
        }
        unsafe {
            let _ = munmap(self.ptr.cast(), self.size());
        }
    }
}

unsafe impl Send for Memory {}
unsafe impl Sync for Memory {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn buffer_file(values: &[f32]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for value in values {
            file.write_all(&value.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_reads_little_endian_values() {
        let file = buffer_file(&[1.5, -2.0, 0.25]);
        let memory = Memory::open(file.path(), 3).unwrap();

        assert_eq!(memory.slots(), 3);
        assert_eq!(memory.size(), 12);
        assert_eq!(memory.read(0), 1.5);
        assert_eq!(memory.read(1), -2.0);
        assert_eq!(memory.read(2), 0.25);
    }

    #[test]
    fn test_writes_reach_the_file() {
        let file = buffer_file(&[0.0; 4]);
        let memory = Memory::open(file.path(), 4).unwrap();

        memory.write(2, 42.5);
        memory.flush().unwrap();

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(&bytes[8..12], &42.5f32.to_le_bytes());
        assert_eq!(&bytes[0..8], &[0u8; 8]);
    }

    #[test]
    fn test_maps_prefix_of_larger_file() {
        let file = buffer_file(&[1.0, 2.0, 3.0, 4.0]);
        let memory = Memory::open(file.path(), 2).unwrap();

        assert_eq!(memory.slots(), 2);
        assert_eq!(memory.read(1), 2.0);
    }

    #[test]
    fn test_rejects_short_file() {
        let file = buffer_file(&[1.0]);
        let result = Memory::open(file.path(), 2);

        assert!(matches!(
            result,
            Err(MmapBufError::TooSmall {
                expected: 8,
                actual: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Memory::open(&dir.path().join("missing.mmap"), 1);

        assert!(matches!(result, Err(MmapBufError::Open { .. })));
    }

    #[test]
    fn test_zero_slots() {
        let file = buffer_file(&[]);
        let memory = Memory::open(file.path(), 0).unwrap();

        assert_eq!(memory.slots(), 0);
        memory.flush().unwrap();
    }

    #[test]
    fn test_overflowing_slot_count() {
        let file = buffer_file(&[]);
        let result = Memory::open(file.path(), usize::MAX);

        assert!(matches!(result, Err(MmapBufError::TooLarge(_))));
    }
}
