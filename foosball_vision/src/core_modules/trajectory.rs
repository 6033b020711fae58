// THEORY:
// The `trajectory` module is the only piece of the tracker with memory. It collects
// the accepted candidate positions of every frame, in the order the frames arrive,
// and hands them out once the loop is done.
//
// Key architectural principles:
// 1.  **Append Only**: Entries are pushed in frame order and never rewritten. There
//     is no deduplication, smoothing, or gap filling; a frame without candidates
//     contributes nothing and a frame with three contributes three.
// 2.  **Single Writer, Many Readers**: The loop owns the `Trajectory` and is the
//     only writer. Any number of `TrajectoryReader` handles may take snapshots or
//     poll for new entries while the loop keeps running.
// 3.  **Outlives the Source**: The trajectory belongs to the caller, not the loop,
//     so it is still there after the frame source has been released.

use crate::core_modules::candidate::{Candidate, Position};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One accepted detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Index of the frame the detection came from, counted from 0.
    pub frame_index: u64,
    pub position: Position,
    pub radius: f64,
}

type Entries = Arc<RwLock<Vec<TrajectoryPoint>>>;

// A panic in another holder cannot leave a half-pushed entry behind, so a poisoned
// lock still guards a consistent vector.
fn read(entries: &Entries) -> RwLockReadGuard<'_, Vec<TrajectoryPoint>> {
    entries.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(entries: &Entries) -> RwLockWriteGuard<'_, Vec<TrajectoryPoint>> {
    entries.write().unwrap_or_else(PoisonError::into_inner)
}

/// The growing, ordered record of ball positions.
#[derive(Debug, Default)]
pub struct Trajectory {
    entries: Entries,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every candidate of frame `frame_index`, in order.
    /// Returns the number of entries appended.
    pub fn record(&mut self, frame_index: u64, candidates: &[Candidate]) -> usize {
        if candidates.is_empty() {
            return 0;
        }
        let mut entries = write(&self.entries);
        debug_assert!(
            entries.last().is_none_or(|last| last.frame_index <= frame_index),
            "frames must be recorded in order"
        );
        entries.extend(candidates.iter().map(|candidate| TrajectoryPoint {
            frame_index,
            position: candidate.position,
            radius: candidate.radius,
        }));
        candidates.len()
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every entry recorded so far.
    pub fn snapshot(&self) -> Vec<TrajectoryPoint> {
        read(&self.entries).clone()
    }

    /// The recorded positions alone, as persisted to CSV.
    pub fn positions(&self) -> Vec<Position> {
        read(&self.entries).iter().map(|point| point.position).collect()
    }

    /// A read-only handle that observes this trajectory as it grows.
    pub fn reader(&self) -> TrajectoryReader {
        TrajectoryReader {
            entries: Arc::clone(&self.entries),
        }
    }
}

/// Read-only, cloneable view of a `Trajectory`.
#[derive(Debug, Clone)]
pub struct TrajectoryReader {
    entries: Entries,
}

impl TrajectoryReader {
    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<TrajectoryPoint> {
        read(&self.entries).clone()
    }

    /// Entries appended after the first `offset`. Empty if nothing new arrived.
    pub fn since(&self, offset: usize) -> Vec<TrajectoryPoint> {
        read(&self.entries)
            .get(offset..)
            .map(<[TrajectoryPoint]>::to_vec)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: i32, y: i32) -> Candidate {
        Candidate {
            position: Position::new(x, y),
            radius: 5.0,
            area: 40.0,
            blob_id: 0,
        }
    }

    #[test]
    fn empty_frames_contribute_nothing() {
        let mut trajectory = Trajectory::new();
        assert_eq!(trajectory.record(0, &[]), 0);
        assert!(trajectory.is_empty());
    }

    #[test]
    fn multiple_candidates_per_frame_are_kept_in_order() {
        let mut trajectory = Trajectory::new();
        trajectory.record(3, &[candidate(1, 1)]);
        assert_eq!(trajectory.record(4, &[candidate(2, 2), candidate(9, 9)]), 2);

        let snapshot = trajectory.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.iter().map(|p| p.frame_index).collect::<Vec<_>>(),
            vec![3, 4, 4]
        );
        assert_eq!(
            trajectory.positions(),
            vec![Position::new(1, 1), Position::new(2, 2), Position::new(9, 9)]
        );
    }

    #[test]
    fn reader_sees_entries_appended_after_it_was_created() {
        let mut trajectory = Trajectory::new();
        let reader = trajectory.reader();
        trajectory.record(0, &[candidate(1, 2)]);

        let seen = reader.len();
        trajectory.record(1, &[candidate(3, 4)]);

        assert_eq!(reader.len(), 2);
        let fresh = reader.since(seen);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].position, Position::new(3, 4));
        assert!(reader.since(10).is_empty());
    }

    #[test]
    fn reader_can_poll_from_another_thread() {
        let mut trajectory = Trajectory::new();
        let reader = trajectory.reader();
        let handle = std::thread::spawn(move || {
            let mut seen = 0;
            while seen < 50 {
                seen += reader.since(seen).len();
                std::thread::yield_now();
            }
            seen
        });
        for frame in 0..50 {
            trajectory.record(frame, &[candidate(frame as i32, 0)]);
        }
        assert_eq!(handle.join().unwrap(), 50);
    }
}
