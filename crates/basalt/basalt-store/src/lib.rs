//! `basalt-store`: mutex-guarded line store over a record ring.
//!
//! [`LineStore`] frames an incoming byte stream into newline-terminated
//! records, commits each completed record to a [`RecordRing`], and serves
//! positioned reads against the concatenated offset space of the live
//! records. A partial line stays in an internal staging buffer across writes
//! until its newline arrives.
//!
//! One coarse mutex guards the ring and the staging buffer together; handles
//! ([`StoreHandle`]) carry only a read position and share the store. A read
//! never crosses a record boundary — callers iterate to drain successive
//! records, exactly like positioned reads against a character device.
//!
//! # Example
//!
//! ```
//! use basalt_store::LineStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(LineStore::<10>::new()?);
//! store.write(b"hello\n")?;
//!
//! let mut handle = store.open();
//! let mut buf = [0u8; 64];
//! let n = handle.read(&mut buf)?;
//! assert_eq!(&buf[..n], b"hello\n");
//! # Ok::<(), basalt_store::StoreError>(())
//! ```

use basalt_bytes::{AllocError, ByteVec};
use basalt_ring::{RING_SLOTS, Record, RecordRing};
use std::sync::{Arc, Mutex, MutexGuard};

/// Origin for [`StoreHandle::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute position from the start of the offset space.
    Set,
    /// Relative to the handle's current position.
    Cur,
    /// Relative to the current total byte length.
    End,
}

/// Errors surfaced by the line store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Out-of-range seek, unknown target record, or position overflow.
    #[error("invalid argument")]
    InvalidArgument,
    /// Allocation failed; nothing was committed.
    #[error("allocation failed")]
    ResourceExhausted,
    /// Lock acquisition was interrupted (a writer panicked mid-operation);
    /// the caller may retry.
    #[error("interrupted, retry")]
    Interrupted,
}

impl From<AllocError> for StoreError {
    fn from(_: AllocError) -> Self {
        StoreError::ResourceExhausted
    }
}

/// Ring plus staging buffer, guarded together by the store mutex.
struct StoreState<const N: usize> {
    ring: RecordRing<N>,
    staging: ByteVec,
}

/// Shared line store: a [`RecordRing`] fed by newline framing.
pub struct LineStore<const N: usize = RING_SLOTS> {
    state: Mutex<StoreState<N>>,
}

impl<const N: usize> LineStore<N> {
    /// Creates an empty store with an empty staging buffer.
    pub fn new() -> Result<Self, StoreError> {
        Ok(Self {
            state: Mutex::new(StoreState {
                ring: RecordRing::new(),
                staging: ByteVec::new()?,
            }),
        })
    }

    /// Opens a handle positioned at offset 0.
    pub fn open(self: &Arc<Self>) -> StoreHandle<N> {
        StoreHandle {
            store: Arc::clone(self),
            pos: 0,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState<N>>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Interrupted)
    }

    /// Accepts `bytes` into the staging buffer and commits every completed
    /// line to the ring.
    ///
    /// For each newline found, the staged prefix through that newline becomes
    /// one [`Record`]; a record evicted by the insert is dropped here, after
    /// the insert has taken effect. A trailing partial line stays staged for
    /// the next write. All input bytes are reported consumed.
    ///
    /// On allocation failure nothing is half-committed: staged bytes remain
    /// valid and the ring is unchanged, so a later write may still complete
    /// the line.
    pub fn write(&self, bytes: &[u8]) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        state.staging.append(bytes)?;

        while let Some(nl) = state.staging.find(0, b'\n') {
            let mut line = Vec::new();
            line.try_reserve_exact(nl + 1)
                .map_err(|_| StoreError::ResourceExhausted)?;
            line.extend_from_slice(&state.staging[..=nl]);

            let evicted = state.ring.push(Record::from(line));
            drop(evicted);

            state.staging.carryover(nl + 1);
        }

        Ok(bytes.len())
    }

    /// Reads from position `pos` into `buf`, never crossing a record
    /// boundary. Returns 0 at end of stream.
    pub fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize, StoreError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let state = self.lock()?;
        let pos = usize::try_from(pos).map_err(|_| StoreError::InvalidArgument)?;

        let Some((record, byte_in_record)) = state.ring.find_by_offset(pos) else {
            return Ok(0);
        };

        let n = buf.len().min(record.len() - byte_in_record);
        buf[..n].copy_from_slice(&record.as_bytes()[byte_in_record..byte_in_record + n]);
        Ok(n)
    }

    /// Current length of the concatenated offset space.
    pub fn total_bytes(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.ring.total_bytes() as u64)
    }

    /// Number of bytes currently staged waiting for a newline.
    pub fn staged_bytes(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.staging.len())
    }
}

/// A read cursor over a shared [`LineStore`].
pub struct StoreHandle<const N: usize = RING_SLOTS> {
    store: Arc<LineStore<N>>,
    pos: u64,
}

impl<const N: usize> StoreHandle<N> {
    /// Reads at the handle position and advances it by the bytes read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let n = self.store.read_at(self.pos, buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    /// Writes through to the shared store; the handle position is unaffected.
    pub fn write(&self, bytes: &[u8]) -> Result<usize, StoreError> {
        self.store.write(bytes)
    }

    /// Repositions the handle. The candidate position is rejected when it
    /// underflows or lands past the current total byte length.
    pub fn seek(&mut self, whence: Whence, offset: i64) -> Result<u64, StoreError> {
        let total = self.store.total_bytes()?;
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => self.pos,
            Whence::End => total,
        };

        let candidate = i64::try_from(base)
            .ok()
            .and_then(|base| base.checked_add(offset))
            .ok_or(StoreError::InvalidArgument)?;
        if candidate < 0 || candidate as u64 > total {
            return Err(StoreError::InvalidArgument);
        }

        self.pos = candidate as u64;
        Ok(self.pos)
    }

    /// Control seek: repositions to byte `byte_in_record` of the live record
    /// at `record_index` (0 = oldest live record).
    pub fn seek_to_record(
        &mut self,
        record_index: usize,
        byte_in_record: usize,
    ) -> Result<u64, StoreError> {
        let state = self.store.lock()?;
        let pos = state
            .ring
            .position_of(record_index, byte_in_record)
            .ok_or(StoreError::InvalidArgument)?;
        self.pos = pos as u64;
        Ok(self.pos)
    }

    /// Current handle position in the offset space.
    pub fn position(&self) -> u64 {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Arc<LineStore<10>> {
        Arc::new(LineStore::new().unwrap())
    }

    #[test]
    fn write_frames_lines_and_stages_the_remainder() {
        let store = store();

        store.write(b"hello\nwor").unwrap();
        assert_eq!(store.total_bytes().unwrap(), 6);
        assert_eq!(store.staged_bytes().unwrap(), 3);

        store.write(b"ld\n!").unwrap();
        assert_eq!(store.total_bytes().unwrap(), 12);
        assert_eq!(store.staged_bytes().unwrap(), 1);

        let mut buf = [0u8; 100];
        let n = store.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello\n");
        let n = store.read_at(6, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"world\n");
        assert_eq!(store.read_at(12, &mut buf).unwrap(), 0);
    }

    #[test]
    fn one_write_with_many_newlines_commits_each_line() {
        let store = store();
        store.write(b"a\nbb\nccc\ntail").unwrap();
        assert_eq!(store.total_bytes().unwrap(), 9);
        assert_eq!(store.staged_bytes().unwrap(), 4);

        let mut handle = store.open();
        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = handle.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"a\nbb\nccc\n");
    }

    #[test]
    fn reads_stop_at_record_boundaries() {
        let store = store();
        store.write(b"hello\nworld\n").unwrap();

        let mut buf = [0u8; 100];
        // A large read still stops at the end of the first record.
        assert_eq!(store.read_at(0, &mut buf).unwrap(), 6);
        // Mid-record reads serve the record tail only.
        let n = store.read_at(8, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"rld\n");
    }

    #[test]
    fn seek_accepts_end_and_rejects_past_end() {
        let store = store();
        store.write(b"hello\nworld\n").unwrap();
        let mut handle = store.open();

        assert_eq!(handle.seek(Whence::Set, 12).unwrap(), 12);
        assert!(matches!(
            handle.seek(Whence::Set, 13),
            Err(StoreError::InvalidArgument)
        ));
        assert_eq!(handle.seek(Whence::End, 0).unwrap(), 12);
        assert_eq!(handle.seek(Whence::End, -12).unwrap(), 0);
        assert_eq!(handle.seek(Whence::Cur, 5).unwrap(), 5);
        assert_eq!(handle.seek(Whence::Cur, -2).unwrap(), 3);
        assert!(matches!(
            handle.seek(Whence::Cur, -4),
            Err(StoreError::InvalidArgument)
        ));
        // Position is untouched by a rejected seek.
        assert_eq!(handle.position(), 3);
    }

    #[test]
    fn control_seek_targets_a_record_byte() {
        let store = store();
        store.write(b"aa\nbbb\ncccc\n").unwrap();
        let mut handle = store.open();

        assert_eq!(handle.seek_to_record(1, 0).unwrap(), 3);
        let mut buf = [0u8; 100];
        let n = handle.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"bbb\n");

        assert_eq!(handle.seek_to_record(2, 2).unwrap(), 9);
        let n = handle.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"cc\n");

        assert!(matches!(
            handle.seek_to_record(3, 0),
            Err(StoreError::InvalidArgument)
        ));
        assert!(matches!(
            handle.seek_to_record(1, 4),
            Err(StoreError::InvalidArgument)
        ));
    }

    #[test]
    fn overwrite_keeps_offsets_rooted_at_the_oldest_record() {
        let store: Arc<LineStore<3>> = Arc::new(LineStore::new().unwrap());
        for line in [&b"one\n"[..], b"two\n", b"three\n", b"four\n"] {
            store.write(line).unwrap();
        }
        // "one\n" was evicted; the stream now starts at "two\n".
        let mut handle = store.open();
        let mut out = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let n = handle.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"two\nthree\nfour\n");
    }
}
