//! Scheduled follow-up work
//!
//! Respawns, delayed velocity fixes and the periodic watchdogs are queued here
//! as plain data against the simulation clock. Each entry remembers the match
//! epoch it was scheduled in so a stale entry can be recognised when it fires.

use glam::Vec2;
use slotmap::{SlotMap, new_key_type};

use crate::store::{ItemId, PlayerId};

new_key_type! {
    /// Handle to a scheduled entry, used for cancellation.
    pub struct TimerHandle;
}

/// Deferred work
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Task {
    /// Place a new gear with the spawn heuristic
    SpawnGear,
    /// Place a new heart at a uniform random spot
    SpawnHeart,
    /// Renormalize a player's speed and break up axis-aligned travel
    CorrectVelocity(PlayerId),
    /// Move a gear that nobody collected
    RelocateGear(ItemId),
    /// Recreate a gear close to a point
    RespawnGearNear(Vec2),
    /// Periodic: make sure some gear is in play
    GearWatchdog,
    /// Periodic: anti-stalemate check and straight-line correction
    StalemateCheck,
}

/// An entry whose deadline has passed
#[derive(Debug, Clone, Copy)]
pub struct FiredTask {
    pub handle: TimerHandle,
    pub task: Task,
    pub epoch: u64,
}

#[derive(Debug)]
struct Entry {
    due_ms: f64,
    period_ms: Option<f64>,
    task: Task,
    epoch: u64,
    /// Insertion order, breaks ties between equal deadlines
    seq: u64,
}

/// Timer queue driven by the simulation clock
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: SlotMap<TimerHandle, Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once, `delay_ms` after `now_ms`
    pub fn schedule_once(&mut self, now_ms: f64, delay_ms: f64, task: Task, epoch: u64) -> TimerHandle {
        self.insert(now_ms + delay_ms.max(0.0), None, task, epoch)
    }

    /// Run `task` every `period_ms`, first at `now_ms + period_ms`
    pub fn schedule_every(&mut self, now_ms: f64, period_ms: f64, task: Task, epoch: u64) -> TimerHandle {
        let period = period_ms.max(1.0);
        self.insert(now_ms + period, Some(period), task, epoch)
    }

    fn insert(&mut self, due_ms: f64, period_ms: Option<f64>, task: Task, epoch: u64) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(Entry {
            due_ms,
            period_ms,
            task,
            epoch,
            seq,
        })
    }

    /// Returns true if the entry was still pending
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.entries.remove(handle).is_some()
    }

    /// Pending tasks in firing order (for inspection)
    pub fn pending_tasks(&self) -> Vec<(f64, Task)> {
        let mut tasks: Vec<_> = self.entries.values().map(|e| (e.due_ms, e.seq, e.task)).collect();
        tasks.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        tasks.into_iter().map(|(due, _, task)| (due, task)).collect()
    }

    /// Take the earliest entry due at or before `now_ms`.
    ///
    /// One-shot entries are removed; periodic entries move their deadline
    /// forward by one period.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<FiredTask> {
        let handle = self
            .entries
            .iter()
            .filter(|(_, e)| e.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)))
            .map(|(handle, _)| handle)?;

        let entry = self.entries.get_mut(handle)?;
        let fired = FiredTask {
            handle,
            task: entry.task,
            epoch: entry.epoch,
        };
        match entry.period_ms {
            Some(period) => entry.due_ms += period,
            None => {
                self.entries.remove(handle);
            }
        }
        Some(fired)
    }
}
