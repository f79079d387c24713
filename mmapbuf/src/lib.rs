//! # mmapbuf - memory-mapped metric slots
//!
//! An array of `f32` slots living in a file that another process maps as
//! well. Updates are plain memory writes; no syscall is made per update.
//!
//! ```rust,no_run
//! use mmapbuf::MetricsBuffer;
//!
//! let buffer = MetricsBuffer::open("/tmp/tirion.mmap", 4)?;
//! buffer.inc(0);
//! buffer.add(2, 0.3);
//! assert_eq!(buffer.get(42), 0.0); // out of range
//! buffer.close();
//! assert_eq!(buffer.get(0), 0.0); // closed
//! # Ok::<(), mmapbuf::MmapBufError>(())
//! ```
//!
//! The file must exist and hold at least `slots * 4` bytes. Slot `i` lives
//! at byte offset `4 * i`, little-endian.

pub use buffer::MetricsBuffer;
pub use error::MmapBufError;
pub use memory::SLOT_SIZE;

pub mod buffer;
pub mod error;
pub(crate) mod memory;
