use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rtrb::{Consumer, Producer, RingBuffer};

use crate::geometry::Vector2;

/// Renderer side of the analysis ring. Pushing never blocks; when the ring is
/// full the pair is dropped and the window in progress is marked as overrun.
pub struct AnalysisTap {
    tx: Producer<Vector2>,
    overrun: Arc<AtomicBool>,
}

/// Analyser side of the analysis ring.
pub struct AnalysisInput {
    rx: Consumer<Vector2>,
    overrun: Arc<AtomicBool>,
}

pub fn analysis_channel(capacity: usize) -> (AnalysisTap, AnalysisInput) {
    let (tx, rx) = RingBuffer::new(capacity.max(1));
    let overrun = Arc::new(AtomicBool::new(false));
    (
        AnalysisTap {
            tx,
            overrun: Arc::clone(&overrun),
        },
        AnalysisInput { rx, overrun },
    )
}

impl AnalysisTap {
    #[inline]
    pub fn push(&mut self, point: Vector2) {
        if self.tx.push(point).is_err() {
            self.overrun.store(true, Ordering::Relaxed);
        }
    }

    /// True once the analyser has gone away.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_abandoned()
    }
}

impl AnalysisInput {
    pub fn pop(&mut self) -> Option<Vector2> {
        self.rx.pop().ok()
    }

    /// Read and clear the overrun flag.
    pub fn take_overrun(&self) -> bool {
        self.overrun.swap(false, Ordering::Relaxed)
    }

    /// Throw away everything queued so a fresh window starts from live data.
    pub fn discard(&mut self) -> usize {
        let queued = self.rx.slots();
        if let Ok(chunk) = self.rx.read_chunk(queued) {
            chunk.commit_all();
        }
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_ring_flags_overrun() {
        let (mut tap, mut input) = analysis_channel(2);
        tap.push(Vector2::new(1.0, 0.0));
        tap.push(Vector2::new(2.0, 0.0));
        assert!(!input.take_overrun());

        tap.push(Vector2::new(3.0, 0.0));
        assert!(input.take_overrun());
        assert!(!input.take_overrun());

        assert_eq!(input.pop(), Some(Vector2::new(1.0, 0.0)));
        assert_eq!(input.discard(), 1);
        assert_eq!(input.pop(), None);
    }
}
