//! Process-wide pool of scratch buffers used while rendering log lines.
//!
//! Every `handle` and `with_attrs` call rents one [`Buffer`], fills it and
//! drops it. Dropping the guard returns the backing storage to the pool, so
//! the steady state performs no heap allocation per record.
//!
//! Buffers whose capacity grew past [`MAX_BUFFER_SIZE`] are discarded on
//! release instead of pooled, so one oversized record cannot inflate the
//! memory retained by the pool.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Capacity of a freshly allocated buffer (1 KiB).
pub const INITIAL_BUFFER_SIZE: usize = 1 << 10;

/// Largest capacity a released buffer may have and still be pooled (16 KiB).
pub const MAX_BUFFER_SIZE: usize = 16 << 10;

/// Upper bound on idle buffers kept in the free list.
const MAX_POOLED_BUFFERS: usize = 256;

static POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

/// Takes an empty buffer from the pool, allocating one if none is idle.
#[must_use]
pub fn acquire() -> Buffer {
    let bytes = {
        let mut pool = POOL.lock().unwrap_or_else(|e| e.into_inner());
        pool.pop()
    };

    Buffer {
        bytes: bytes.unwrap_or_else(|| Vec::with_capacity(INITIAL_BUFFER_SIZE)),
    }
}

/// Returns the backing storage to the pool, dropping oversized buffers.
fn release(mut bytes: Vec<u8>) {
    if bytes.capacity() > MAX_BUFFER_SIZE {
        return;
    }
    bytes.clear();

    let mut pool = POOL.lock().unwrap_or_else(|e| e.into_inner());
    if pool.len() < MAX_POOLED_BUFFERS {
        pool.push(bytes);
    }
}

/// Number of idle buffers currently held by the pool.
#[cfg(test)]
fn idle() -> usize {
    POOL.lock().unwrap_or_else(|e| e.into_inner()).len()
}

/// Growable byte buffer rented from the pool.
///
/// The buffer is released when the guard goes out of scope, on every exit
/// path of the caller.
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    #[inline]
    pub fn write_bytes(&mut self, b: &[u8]) {
        self.bytes.extend_from_slice(b);
    }

    /// Appends `s` only when `cond` holds. Used for optional ANSI codes.
    #[inline]
    pub fn write_str_if(&mut self, cond: bool, s: &str) {
        if cond {
            self.write_str(s);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Replaces the last byte, if any. Used to turn the trailing separator
    /// into a line terminator.
    pub fn set_last(&mut self, b: u8) {
        if let Some(last) = self.bytes.last_mut() {
            *last = b;
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        release(std::mem::take(&mut self.bytes));
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Buffer::write_str(self, s);
        Ok(())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.bytes.len())
            .field("capacity", &self.bytes.capacity())
            .finish()
    }
}
