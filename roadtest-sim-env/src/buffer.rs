//! Single-slot buffer between a sensor callback and the control thread.
use crossbeam::atomic::AtomicCell;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Holds the most recent frame delivered by a sensor.
///
/// Writes replace the slot with an atomic swap, so a reader gets either the
/// previous frame or the new one and never a partially written frame. Frames
/// which are overwritten before being read are dropped and counted; the buffer
/// never queues. Reading takes the frame out of the slot, so a frame is
/// consumed at most once.
pub struct SensorFrameBuffer<F> {
    slot: AtomicCell<Option<Arc<F>>>,
    written: AtomicU64,
    dropped: AtomicU64,
}

impl<F> Default for SensorFrameBuffer<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> SensorFrameBuffer<F> {
    /// Constructs an empty buffer.
    pub fn new() -> Self {
        Self {
            slot: AtomicCell::new(None),
            written: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Returns `true` if the slot is swapped without a lock on this platform.
    pub fn is_lock_free() -> bool {
        AtomicCell::<Option<Arc<F>>>::is_lock_free()
    }

    /// Replaces the content of the slot with `frame`.
    pub fn write(&self, frame: F) {
        let prev = self.slot.swap(Some(Arc::new(frame)));
        self.written.fetch_add(1, Ordering::Relaxed);
        if prev.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Takes the unread frame, if any.
    pub fn try_read(&self) -> Option<Arc<F>> {
        self.slot.take()
    }

    /// Takes the next frame, waiting at most `timeout` for one to arrive.
    pub fn read(&self, timeout: Duration) -> Option<Arc<F>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.try_read() {
                return Some(frame);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Discards the unread frame, if any.
    pub fn clear(&self) {
        self.slot.take();
    }

    /// Number of frames overwritten before being read.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of frames written.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}
