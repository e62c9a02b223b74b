//! Fixed-capacity sample history for the streaming filters.

use alloc::vec;
use alloc::vec::Vec;

use crate::CHANNEL_COUNT;

/// Rolling window of the most recent stereo frames.
///
/// Capacity is the smallest power of two covering the requested history, so
/// cursor wraparound is a single bitmask operation instead of a modulo. The
/// most recent frame is always at offset 0, older frames at increasing
/// offsets.
#[derive(Debug, Clone)]
pub struct RingDelayLine<T> {
    line: Vec<[T; CHANNEL_COUNT]>,
    mask: usize,
    position: usize,
}

impl<T: Copy + Default> RingDelayLine<T> {
    /// Creates a zeroed delay line retaining at least `min_frames` frames.
    ///
    /// The capacity is fixed for the lifetime of the delay line; it must
    /// cover every offset a filter will ever read.
    pub fn new(min_frames: usize) -> Self {
        let mut capacity = 2;
        while capacity < min_frames {
            capacity <<= 1;
        }

        Self {
            line: vec![[T::default(); CHANNEL_COUNT]; capacity],
            mask: capacity - 1,
            position: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.line.len()
    }

    /// Writes one frame, making it the new offset-0 frame.
    #[inline]
    pub fn push(&mut self, frame: [T; CHANNEL_COUNT]) {
        self.position = self.position.wrapping_sub(1) & self.mask;
        self.line[self.position] = frame;
    }

    /// Reads the frame `offset` steps older than the most recent one.
    #[inline]
    pub fn read(&self, offset: usize) -> [T; CHANNEL_COUNT] {
        self.line[(self.position + offset) & self.mask]
    }
}
