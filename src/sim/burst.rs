//! Burst-clear sequencer
//!
//! The star effect: every entity on screen is consumed one at a time on a
//! fixed cadence, through the normal damage path so fragmentation still
//! happens - and the children it produces are folded into the queue so the
//! whole cascade is cleared, not just the entities that existed at
//! activation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::consts::BURST_INTERVAL_TICKS;

use super::entity::EntityId;
use super::state::Population;

/// Timed one-at-a-time destruction queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BurstClear {
    active: bool,
    pending: VecDeque<EntityId>,
    /// The entity being consumed this tick; its fragmentation children
    /// must still count as marked
    current: Option<EntityId>,
    next_pop_at: u64,
}

impl BurstClear {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Arm the sequencer with every active entity except the trigger.
    /// A second activation while one is running is a no-op - interleaving
    /// two sequences could destroy an entity twice.
    pub fn activate(&mut self, now: u64, trigger: EntityId, population: &Population) -> bool {
        if self.active {
            log::debug!("burst-clear already running, ignoring trigger {trigger}");
            return false;
        }
        self.pending = population
            .iter_all()
            .filter(|e| e.alive && e.id != trigger)
            .map(|e| e.id)
            .collect();
        self.active = true;
        self.current = None;
        self.next_pop_at = now + BURST_INTERVAL_TICKS;
        log::info!("burst-clear armed: {} entities queued", self.pending.len());
        true
    }

    /// Whether the next consumption is due
    pub fn due(&self, now: u64) -> bool {
        self.active && now >= self.next_pop_at
    }

    /// Pop the next queued entity and reset the cadence. The caller drives
    /// the actual destruction.
    pub fn take_next(&mut self, now: u64) -> Option<EntityId> {
        self.current = self.pending.pop_front();
        self.next_pop_at = now + BURST_INTERVAL_TICKS;
        self.current
    }

    /// Close out this tick's consumption; the sequence ends when the queue
    /// is empty.
    pub fn settle(&mut self) {
        self.current = None;
        if self.active && self.pending.is_empty() {
            self.active = false;
            log::info!("burst-clear complete");
        }
    }

    /// Whether an entity is slated for consumption (queued, or the one
    /// being consumed right now)
    pub fn is_marked(&self, id: EntityId) -> bool {
        self.current == Some(id) || self.pending.contains(&id)
    }

    /// Queue fragmentation children of a marked parent
    pub fn fold_children(&mut self, ids: &[EntityId]) {
        for &id in ids {
            self.pending.push_back(id);
        }
        log::debug!("burst-clear folded {} children", ids.len());
    }
}
