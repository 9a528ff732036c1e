use crate::quantity::energy::KilowattHours;

/// Battery charge level within a single simulation run.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct Battery {
    pub level: KilowattHours,
    pub capacity: KilowattHours,
}

impl Battery {
    /// Every run starts with a fully charged battery.
    pub const fn full(capacity: KilowattHours) -> Self {
        Self { level: capacity, capacity }
    }

    /// Energy that still fits into the battery.
    pub fn headroom(&self) -> KilowattHours {
        self.capacity - self.level
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.level >= self.capacity
    }

    pub fn discharge(&mut self, energy: KilowattHours) {
        debug_assert!(energy >= KilowattHours::ZERO, "negative discharge: {energy}");
        debug_assert!(energy <= self.level, "discharging {energy} out of {}", self.level);
        self.level = (self.level - energy).max(KilowattHours::ZERO);
    }

    pub fn charge(&mut self, energy: KilowattHours) {
        debug_assert!(energy >= KilowattHours::ZERO, "negative charge: {energy}");
        // Rounding must not push the level over the capacity:
        self.level = (self.level + energy).min(self.capacity);
    }
}
