//! In-process pin driver.
//!
//! Used when `SPRINKLER_GPIO_BACKEND=memory` (development machines without
//! GPIO) and by tests. Every write is appended to a log so tests can assert
//! that an operation touched no pins at all.

use std::collections::HashMap;
use std::sync::Mutex;

use sprinkler_core::types::PinId;

use crate::driver::{PinDriver, PinError};

#[derive(Debug, Default)]
struct MemoryState {
    outputs: HashMap<PinId, bool>,
    writes: Vec<(PinId, bool)>,
}

/// Pin driver backed by a map; all pins start de-energized.
#[derive(Debug, Default)]
pub struct MemoryPinDriver {
    state: Mutex<MemoryState>,
}

impl MemoryPinDriver {
    pub fn new(pins: &[PinId]) -> Self {
        let outputs = pins.iter().map(|&pin| (pin, false)).collect();
        Self {
            state: Mutex::new(MemoryState {
                outputs,
                writes: Vec::new(),
            }),
        }
    }

    /// Every `(pin, energized)` write in call order.
    pub fn writes(&self) -> Vec<(PinId, bool)> {
        self.lock().writes.clone()
    }

    /// Pins currently energized, ascending.
    pub fn energized_pins(&self) -> Vec<PinId> {
        let mut pins: Vec<PinId> = self
            .lock()
            .outputs
            .iter()
            .filter_map(|(&pin, &on)| on.then_some(pin))
            .collect();
        pins.sort_unstable();
        pins
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PinDriver for MemoryPinDriver {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn set_output(&self, pin: PinId, energized: bool) -> Result<(), PinError> {
        let mut state = self.lock();
        let slot = state
            .outputs
            .get_mut(&pin)
            .ok_or(PinError::UnknownPin(pin))?;
        *slot = energized;
        state.writes.push((pin, energized));
        Ok(())
    }

    fn read_output(&self, pin: PinId) -> Result<bool, PinError> {
        self.lock()
            .outputs
            .get(&pin)
            .copied()
            .ok_or(PinError::UnknownPin(pin))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn pins_start_de_energized() {
        let driver = MemoryPinDriver::new(&[12, 16]);
        assert!(!driver.read_output(12).unwrap());
        assert!(!driver.read_output(16).unwrap());
        assert!(driver.writes().is_empty());
    }

    #[test]
    fn set_output_is_recorded() {
        let driver = MemoryPinDriver::new(&[12, 16]);
        driver.set_output(16, true).unwrap();
        driver.set_output(16, false).unwrap();
        driver.set_output(12, true).unwrap();

        assert_eq!(driver.writes(), vec![(16, true), (16, false), (12, true)]);
        assert_eq!(driver.energized_pins(), vec![12]);
    }

    #[test]
    fn unknown_pin_is_rejected() {
        let driver = MemoryPinDriver::new(&[12]);
        assert_matches!(driver.set_output(3, true), Err(PinError::UnknownPin(3)));
        assert_matches!(driver.read_output(3), Err(PinError::UnknownPin(3)));
    }
}
