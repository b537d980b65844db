//! Deterministic timer queue driven by a virtual clock.
//!
//! The page loop owns one [`Scheduler`] and advances it explicitly; nothing
//! here reads the wall clock. Tasks due at the same instant fire in the
//! order they were scheduled.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use slab::Slab;

/// Handle to a scheduled task. Cancellation is generation-checked, so a
/// handle kept past its task firing (or past a cancel) is inert rather
/// than dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    slot: usize,
    generation: u64,
}

struct Task<T> {
    generation: u64,
    payload: T,
}

/// Min-heap of pending tasks keyed by deadline, then FIFO order.
pub struct Scheduler<T> {
    heap: BinaryHeap<Reverse<(Duration, u64, usize, u64)>>,
    tasks: Slab<Task<T>>,
    now: Duration,
    next_seq: u64,
    next_generation: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            tasks: Slab::new(),
            now: Duration::ZERO,
            next_seq: 0,
            next_generation: 0,
        }
    }

    /// Current virtual time, measured from scheduler creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of tasks that are scheduled and not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Schedules `payload` to fire once `after` has elapsed.
    pub fn schedule(&mut self, after: Duration, payload: T) -> TimerHandle {
        let generation = self.next_generation;
        self.next_generation += 1;
        let slot = self.tasks.insert(Task {
            generation,
            payload,
        });
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap
            .push(Reverse((self.now + after, seq, slot, generation)));
        TimerHandle { slot, generation }
    }

    /// Cancels the task behind `handle`. Returns false when the task already
    /// fired, was cancelled before, or the handle is stale.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.tasks.get(handle.slot) {
            Some(task) if task.generation == handle.generation => {
                self.tasks.remove(handle.slot);
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.tasks
            .get(handle.slot)
            .map_or(false, |task| task.generation == handle.generation)
    }

    /// Cancels every pending task whose payload satisfies `pred` and returns
    /// how many were dropped.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let doomed: Vec<usize> = self
            .tasks
            .iter()
            .filter(|(_, task)| pred(&task.payload))
            .map(|(slot, _)| slot)
            .collect();
        for slot in &doomed {
            self.tasks.remove(*slot);
        }
        doomed.len()
    }

    /// Moves the clock forward by `by` and returns the payloads of every task
    /// that came due, in deadline order with FIFO tie-break. Tasks scheduled
    /// while handling a fired payload wait for the next call.
    pub fn advance(&mut self, by: Duration) -> Vec<T> {
        self.now += by;
        let mut fired = Vec::new();
        while let Some(&Reverse((deadline, _, slot, generation))) = self.heap.peek() {
            if deadline > self.now {
                break;
            }
            self.heap.pop();
            // Heap entries outlive cancellation; the generation check drops
            // entries whose slot was cancelled or reused since.
            match self.tasks.get(slot) {
                Some(task) if task.generation == generation => {
                    fired.push(self.tasks.remove(slot).payload);
                }
                _ => {}
            }
        }
        fired
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_in_deadline_order() {
        let mut sched = Scheduler::new();
        sched.schedule(30 * MS, "late");
        sched.schedule(10 * MS, "early");
        sched.schedule(20 * MS, "middle");

        assert_eq!(sched.advance(15 * MS), vec!["early"]);
        assert_eq!(sched.now(), Duration::from_millis(15));
        assert_eq!(sched.advance(15 * MS), vec!["middle", "late"]);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn equal_deadlines_fire_fifo() {
        let mut sched = Scheduler::new();
        sched.schedule(5 * MS, 1);
        sched.schedule(5 * MS, 2);
        sched.schedule(5 * MS, 3);
        assert_eq!(sched.advance(5 * MS), vec![1, 2, 3]);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut sched = Scheduler::new();
        let keep = sched.schedule(10 * MS, "keep");
        let drop = sched.schedule(10 * MS, "drop");
        assert!(sched.cancel(drop));
        assert!(!sched.cancel(drop));
        assert!(sched.is_pending(keep));
        assert!(!sched.is_pending(drop));
        assert_eq!(sched.advance(10 * MS), vec!["keep"]);
    }

    #[test]
    fn stale_handles_do_not_touch_reused_slots() {
        let mut sched = Scheduler::new();
        let first = sched.schedule(5 * MS, "first");
        assert_eq!(sched.advance(5 * MS), vec!["first"]);
        // The slab slot is free again; the next task may land in it.
        let second = sched.schedule(5 * MS, "second");
        assert!(!sched.cancel(first));
        assert!(sched.is_pending(second));
        assert_eq!(sched.advance(5 * MS), vec!["second"]);
    }

    #[test]
    fn reschedule_after_cancel_moves_the_deadline() {
        let mut sched = Scheduler::new();
        let first = sched.schedule(500 * MS, "a");
        sched.advance(100 * MS);
        assert!(sched.cancel(first));
        sched.schedule(500 * MS, "b");
        assert_eq!(sched.advance(400 * MS), Vec::<&str>::new());
        assert_eq!(sched.advance(100 * MS), vec!["b"]);
    }

    #[test]
    fn cancel_where_filters_by_payload() {
        let mut sched = Scheduler::new();
        sched.schedule(5 * MS, (1, "x"));
        sched.schedule(5 * MS, (2, "y"));
        sched.schedule(5 * MS, (1, "z"));
        assert_eq!(sched.cancel_where(|(owner, _)| *owner == 1), 2);
        assert_eq!(sched.advance(5 * MS), vec![(2, "y")]);
    }

    #[test]
    fn tasks_scheduled_during_advance_wait_for_the_next_tick() {
        let mut sched = Scheduler::new();
        sched.schedule(5 * MS, "outer");
        let fired = sched.advance(5 * MS);
        assert_eq!(fired, vec!["outer"]);
        sched.schedule(Duration::ZERO, "inner");
        assert_eq!(sched.advance(Duration::ZERO), vec!["inner"]);
    }
}
