//! Ripple impacts shared by all layers of a stack
//!
//! Fixed ring of slots written round-robin. Ages grow without bound; the
//! renderer treats anything past its ripple duration as inactive.

use glam::Vec3;

use crate::consts::{RIPPLE_CAPACITY, RIPPLE_IDLE_AGE};

/// One impact: where it happened and how long ago (scaled by recover speed)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleEntry {
    pub position: Vec3,
    pub age: f32,
}

impl RippleEntry {
    /// Slot that never received an impact
    pub const IDLE: RippleEntry = RippleEntry {
        position: Vec3::ZERO,
        age: RIPPLE_IDLE_AGE,
    };

    /// Whether the ripple is still visible for the given duration
    pub fn is_active(&self, duration: f32) -> bool {
        self.age < duration
    }

    /// Packed (x, y, z, age) for shader upload
    pub fn to_array(&self) -> [f32; 4] {
        [self.position.x, self.position.y, self.position.z, self.age]
    }
}

impl Default for RippleEntry {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Round-robin ring buffer of decaying impacts
#[derive(Debug, Clone)]
pub struct RippleTracker {
    slots: [RippleEntry; RIPPLE_CAPACITY],
    /// Total impacts recorded; next slot is `inserted % RIPPLE_CAPACITY`
    inserted: u64,
    recover_speed: f32,
}

impl RippleTracker {
    pub fn new(recover_speed: f32) -> Self {
        Self {
            slots: [RippleEntry::IDLE; RIPPLE_CAPACITY],
            inserted: 0,
            recover_speed,
        }
    }

    pub fn recover_speed(&self) -> f32 {
        self.recover_speed
    }

    pub fn set_recover_speed(&mut self, recover_speed: f32) {
        self.recover_speed = recover_speed;
    }

    /// Number of impacts recorded since creation
    pub fn impacts_recorded(&self) -> u64 {
        self.inserted
    }

    /// Store an impact in the next slot, evicting the oldest insertion.
    ///
    /// Returns the slot index that was written.
    pub fn record_impact(&mut self, position: Vec3) -> usize {
        let slot = (self.inserted % RIPPLE_CAPACITY as u64) as usize;
        self.inserted += 1;
        self.slots[slot] = RippleEntry { position, age: 0.0 };
        slot
    }

    /// Advance every slot's age by dt * recover_speed
    pub fn decay(&mut self, dt: f32) {
        let step = dt * self.recover_speed;
        for slot in &mut self.slots {
            slot.age += step;
        }
    }

    /// Read-only view pushed into layer parameter blocks
    pub fn snapshot(&self) -> &[RippleEntry; RIPPLE_CAPACITY] {
        &self.slots
    }

    /// Forget every impact
    pub fn clear(&mut self) {
        self.slots = [RippleEntry::IDLE; RIPPLE_CAPACITY];
        self.inserted = 0;
    }
}
