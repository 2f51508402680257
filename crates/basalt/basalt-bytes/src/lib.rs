//! `basalt-bytes`: growable byte buffer for line assembly.
//!
//! [`ByteVec`] accumulates bytes arriving in arbitrary chunks (socket reads,
//! staged writes) until a delimiter shows up, then lets the caller consume the
//! prefix and carry the unconsumed tail over to the next round. Storage starts
//! at [`BASE_CAPACITY`] and grows by doubling; growth failures surface as
//! [`AllocError`] instead of aborting the process.

use std::collections::TryReserveError;
use std::ops::Deref;

/// Initial capacity of every [`ByteVec`], in bytes.
pub const BASE_CAPACITY: usize = 4096;

/// Allocation failure while growing a [`ByteVec`] (or copying out of one).
#[derive(Debug, thiserror::Error)]
#[error("allocation failed")]
pub struct AllocError(#[from] TryReserveError);

/// Growable contiguous byte storage with `append`, `find` and `carryover`.
///
/// Length never exceeds capacity; capacity doubles until the pending append
/// fits. `carryover(k)` discards the first `k` bytes and shifts the remainder
/// to the front, which is how a partial trailing line survives into the next
/// receive cycle.
pub struct ByteVec {
    buf: Vec<u8>,
}

impl ByteVec {
    /// Allocates an empty buffer with [`BASE_CAPACITY`] bytes reserved.
    pub fn new() -> Result<Self, AllocError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(BASE_CAPACITY)?;
        Ok(Self { buf })
    }

    /// Appends `data`, doubling capacity as many times as needed to fit.
    pub fn append(&mut self, data: &[u8]) -> Result<(), AllocError> {
        let needed = self.buf.len() + data.len();
        if needed > self.buf.capacity() {
            let mut cap = self.buf.capacity().max(BASE_CAPACITY);
            while cap < needed {
                cap *= 2;
            }
            self.buf.try_reserve_exact(cap - self.buf.len())?;
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Returns the index of the first `token` at or after `offset`.
    ///
    /// `offset` past the end is not an error; there is simply nothing there.
    pub fn find(&self, offset: usize, token: u8) -> Option<usize> {
        self.buf
            .get(offset..)?
            .iter()
            .position(|&b| b == token)
            .map(|i| offset + i)
    }

    /// Drops the first `used` bytes and shifts `[used, len)` down to the front.
    ///
    /// # Panics
    /// Panics if `used > len`.
    pub fn carryover(&mut self, used: usize) {
        assert!(used <= self.buf.len(), "carryover past end of buffer");
        self.buf.copy_within(used.., 0);
        let remaining = self.buf.len() - used;
        self.buf.truncate(remaining);
    }

    /// Empties the buffer, keeping its storage.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Number of bytes currently held.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current storage capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

impl Deref for ByteVec {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}
