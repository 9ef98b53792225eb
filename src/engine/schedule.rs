use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Deferred work, fired against wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Dwell time of the current ceremony stage elapsed.
    AdvanceStage,
    /// Post-finalization delay elapsed; commit the block.
    Commit,
    /// Restart mining. `replenish` adds a synthetic transaction first.
    StartMining { replenish: bool },
    /// A leaving node finished its exit animation.
    RemoveNode(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheduled {
    due_ms: i64,
    seq: u64,
    epoch: u64,
    event: Event,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_ms
            .cmp(&other.due_ms)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of deferred events keyed by due time, then insertion order.
///
/// Entries are stamped with the epoch they were scheduled in. A reset bumps
/// the simulation epoch instead of cancelling anything, and stale entries
/// are discarded when they come due.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now_ms: i64, delay_ms: i64, epoch: u64, event: Event) {
        let entry = Scheduled {
            due_ms: now_ms + delay_ms.max(0),
            seq: self.next_seq,
            epoch,
            event,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(entry));
    }

    /// Pop the next event due at `now_ms`, with the epoch it was stamped with.
    pub fn pop_due(&mut self, now_ms: i64) -> Option<(u64, Event)> {
        match self.queue.peek() {
            Some(Reverse(next)) if next.due_ms <= now_ms => {}
            _ => return None,
        }
        self.queue.pop().map(|Reverse(s)| (s.epoch, s.event))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, Scheduler};

    #[test]
    fn nothing_fires_early() {
        let mut s = Scheduler::new();
        s.schedule(1_000, 500, 0, Event::Commit);
        assert_eq!(s.pop_due(1_499), None);
        assert_eq!(s.pop_due(1_500), Some((0, Event::Commit)));
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn fires_in_due_order_then_fifo() {
        let mut s = Scheduler::new();
        s.schedule(0, 30, 0, Event::RemoveNode(3));
        s.schedule(0, 10, 0, Event::AdvanceStage);
        s.schedule(0, 10, 0, Event::Commit);
        assert_eq!(s.len(), 3);

        let fired: Vec<Event> = std::iter::from_fn(|| s.pop_due(100))
            .map(|(_, e)| e)
            .collect();
        assert_eq!(
            fired,
            vec![Event::AdvanceStage, Event::Commit, Event::RemoveNode(3)]
        );
    }

    #[test]
    fn keeps_epoch_stamp() {
        let mut s = Scheduler::new();
        s.schedule(0, 0, 4, Event::StartMining { replenish: true });
        assert_eq!(
            s.pop_due(0),
            Some((4, Event::StartMining { replenish: true }))
        );
    }

    #[test]
    fn negative_delay_is_immediate() {
        let mut s = Scheduler::new();
        s.schedule(50, -20, 0, Event::Commit);
        assert!(s.pop_due(50).is_some());
    }
}
