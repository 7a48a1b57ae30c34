use std::collections::HashSet;

use sprinkler_core::types::{PinId, ZoneId};

/// Reasons a configured pin list cannot become a [`ZoneMap`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ZoneMapError {
    #[error("no GPIO pins configured")]
    Empty,

    #[error("GPIO pin {0} is assigned to more than one zone")]
    DuplicatePin(PinId),

    #[error("GPIO pin {0} is on the deny list")]
    DeniedPin(PinId),

    #[error("at most {} zones are supported", ZoneId::MAX)]
    TooManyZones,
}

/// Static zone → pin mapping.
///
/// Zone `n` (1-based) drives `pins[n - 1]`. Fixed for the life of the
/// process and injective: no two zones share a pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneMap {
    pins: Vec<PinId>,
}

impl ZoneMap {
    /// Build a mapping from pins in zone order, rejecting any pin in `deny`.
    pub fn new(pins: Vec<PinId>, deny: &[PinId]) -> Result<Self, ZoneMapError> {
        if pins.is_empty() {
            return Err(ZoneMapError::Empty);
        }
        if pins.len() > usize::from(ZoneId::MAX) {
            return Err(ZoneMapError::TooManyZones);
        }

        let mut seen = HashSet::with_capacity(pins.len());
        for &pin in &pins {
            if deny.contains(&pin) {
                return Err(ZoneMapError::DeniedPin(pin));
            }
            if !seen.insert(pin) {
                return Err(ZoneMapError::DuplicatePin(pin));
            }
        }

        Ok(Self { pins })
    }

    pub fn pin_for(&self, zone: ZoneId) -> Option<PinId> {
        usize::from(zone)
            .checked_sub(1)
            .and_then(|idx| self.pins.get(idx))
            .copied()
    }

    pub fn zone_for(&self, pin: PinId) -> Option<ZoneId> {
        self.pins
            .iter()
            .position(|&p| p == pin)
            .and_then(|idx| ZoneId::try_from(idx + 1).ok())
    }

    /// Pins in zone order.
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }

    /// Pin of zone 1; the target of step-less schedules.
    pub fn first_pin(&self) -> Option<PinId> {
        self.pins.first().copied()
    }

    /// `(zone, pin)` pairs in zone order.
    pub fn iter(&self) -> impl Iterator<Item = (ZoneId, PinId)> + '_ {
        (1..=ZoneId::MAX).zip(self.pins.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
