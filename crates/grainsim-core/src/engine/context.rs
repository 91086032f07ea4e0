use super::progress::ProgressReporter;
use std::sync::{Arc, Barrier, Mutex};

/// Blocking collectives over the workers taking part in a simulation.
///
/// Every worker must call the same sequence of reductions; a call returns
/// only after all workers contributed.
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn all_reduce_max(&self, value: f64) -> f64;
    fn all_reduce_min(&self, value: f64) -> f64;

    /// The worker that emits diagnostics on behalf of the whole group.
    fn is_reporter(&self) -> bool {
        self.rank() == 0
    }
}

/// A group of one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_max(&self, value: f64) -> f64 {
        value
    }

    fn all_reduce_min(&self, value: f64) -> f64 {
        value
    }
}

#[derive(Debug)]
struct GroupShared {
    barrier: Barrier,
    slots: Mutex<Vec<f64>>,
}

/// `size` in-process workers (threads) reducing through a shared slot table.
#[derive(Debug, Clone)]
pub struct LocalGroup {
    size: usize,
    shared: Arc<GroupShared>,
}

impl LocalGroup {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            shared: Arc::new(GroupShared {
                barrier: Barrier::new(size),
                slots: Mutex::new(vec![0.0; size]),
            }),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the communicator handle for worker `rank`, or `None` if `rank >= size`.
    pub fn communicator(&self, rank: usize) -> Option<LocalCommunicator> {
        (rank < self.size).then(|| LocalCommunicator {
            rank,
            size: self.size,
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn communicators(&self) -> Vec<LocalCommunicator> {
        (0..self.size).filter_map(|rank| self.communicator(rank)).collect()
    }
}

#[derive(Debug)]
pub struct LocalCommunicator {
    rank: usize,
    size: usize,
    shared: Arc<GroupShared>,
}

impl LocalCommunicator {
    fn all_reduce(&self, value: f64, init: f64, op: fn(f64, f64) -> f64) -> f64 {
        {
            let mut slots = self.shared.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots[self.rank] = value;
        }
        self.shared.barrier.wait();

        let result = self
            .shared
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .fold(init, op);

        // Nobody may overwrite a slot until every worker has read this round.
        self.shared.barrier.wait();
        result
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_reduce_max(&self, value: f64) -> f64 {
        self.all_reduce(value, f64::NEG_INFINITY, f64::max)
    }

    fn all_reduce_min(&self, value: f64) -> f64 {
        self.all_reduce(value, f64::INFINITY, f64::min)
    }
}

/// Per-step facts handed explicitly to every pass instead of living in globals.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub step: u64,
    pub dt: f64,
    pub skin: f64,
    pub comm: &'a dyn Communicator,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        step: u64,
        dt: f64,
        skin: f64,
        comm: &'a dyn Communicator,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            step,
            dt,
            skin,
            comm,
            reporter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn single_process_reductions_are_identity() {
        let comm = SingleProcess;
        assert_eq!(comm.all_reduce_max(3.5), 3.5);
        assert_eq!(comm.all_reduce_min(-1.0), -1.0);
        assert!(comm.is_reporter());
        assert_eq!(comm.size(), 1);
    }

    #[test]
    fn local_group_reduces_across_threads() {
        let group = LocalGroup::new(4);
        let results: Vec<(f64, f64)> = thread::scope(|s| {
            let handles: Vec<_> = group
                .communicators()
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let value = comm.rank() as f64 + 1.0;
                        (comm.all_reduce_max(value), comm.all_reduce_min(value))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.len(), 4);
        for (max, min) in results {
            assert_eq!(max, 4.0);
            assert_eq!(min, 1.0);
        }
    }

    #[test]
    fn repeated_reductions_do_not_interfere() {
        let group = LocalGroup::new(3);
        let sums: Vec<f64> = thread::scope(|s| {
            let handles: Vec<_> = group
                .communicators()
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        (0..50)
                            .map(|round| comm.all_reduce_max((comm.rank() * 100 + round) as f64))
                            .sum()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        // Rank 2 always holds the maximum: 200 + round.
        let expected: f64 = (0..50).map(|round| (200 + round) as f64).sum();
        assert!(sums.iter().all(|&s| s == expected));
    }

    #[test]
    fn infinity_survives_min_reduction() {
        let group = LocalGroup::new(2);
        let mins: Vec<f64> = thread::scope(|s| {
            let handles: Vec<_> = group
                .communicators()
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let local = if comm.rank() == 0 { f64::INFINITY } else { 0.5 };
                        comm.all_reduce_min(local)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(mins, vec![0.5, 0.5]);
    }

    #[test]
    fn communicator_rank_out_of_range_is_none() {
        let group = LocalGroup::new(2);
        assert!(group.communicator(2).is_none());
        assert_eq!(group.communicator(1).map(|c| c.rank()), Some(1));
    }
}
