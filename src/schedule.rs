//! Epoch-tagged deferred retargets.
//!
//! Staggered scatter starts are modeled as scheduled actions on the
//! effect's own clock rather than host timers. Every action carries the
//! shard-generation epoch it was scheduled under; a re-partition or a
//! teardown bumps the epoch, which invalidates all stale entries without
//! walking or cancelling them individually.

/// One pending per-shard retarget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Deferred {
    /// Effect-clock time (seconds) at which the action fires.
    pub due: f64,
    /// Shard generation the action belongs to.
    pub epoch: u64,
    /// Index into the shard vec of that generation.
    pub shard: usize,
}

/// FIFO of pending retargets, drained by the per-frame tick.
#[derive(Debug, Default)]
pub(crate) struct RetargetQueue {
    pending: Vec<Deferred>,
}

impl RetargetQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule(&mut self, epoch: u64, due: f64, shard: usize) {
        self.pending.push(Deferred { due, epoch, shard });
    }

    /// Remove every entry that is due at `now`, invoking `fire` for those
    /// belonging to `epoch` and silently discarding stale-epoch entries.
    pub(crate) fn drain_due(&mut self, epoch: u64, now: f64, mut fire: impl FnMut(usize)) {
        let mut i = 0;
        while i < self.pending.len() {
            let entry = self.pending[i];
            if entry.epoch != epoch {
                self.pending.swap_remove(i);
                continue;
            }
            if entry.due <= now {
                self.pending.swap_remove(i);
                fire(entry.shard);
                continue;
            }
            i += 1;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_due_entries_and_keeps_future_ones() {
        let mut q = RetargetQueue::new();
        q.schedule(1, 0.1, 0);
        q.schedule(1, 0.5, 1);

        let mut fired = Vec::new();
        q.drain_due(1, 0.2, |s| fired.push(s));
        assert_eq!(fired, vec![0]);
        assert_eq!(q.len(), 1);

        q.drain_due(1, 1.0, |s| fired.push(s));
        assert_eq!(fired, vec![0, 1]);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn stale_epoch_entries_are_discarded_without_firing() {
        let mut q = RetargetQueue::new();
        q.schedule(1, 0.0, 0);
        q.schedule(2, 0.0, 1);

        let mut fired = Vec::new();
        q.drain_due(2, 10.0, |s| fired.push(s));
        assert_eq!(fired, vec![1]);
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn entries_exactly_at_now_fire() {
        let mut q = RetargetQueue::new();
        q.schedule(0, 1.0, 7);
        let mut fired = Vec::new();
        q.drain_due(0, 1.0, |s| fired.push(s));
        assert_eq!(fired, vec![7]);
    }
}
