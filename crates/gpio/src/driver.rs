use sprinkler_core::types::PinId;

/// Errors raised by a [`PinDriver`].
#[derive(Debug, thiserror::Error)]
pub enum PinError {
    /// The pin was not claimed when the driver was opened.
    #[error("GPIO pin {0} is not managed by this driver")]
    UnknownPin(PinId),

    /// The underlying device could not be read or written.
    #[error("GPIO pin {pin}: {source}")]
    Io {
        pin: PinId,
        #[source]
        source: std::io::Error,
    },

    /// The device reported something other than `0` or `1`.
    #[error("GPIO pin {pin}: unexpected value '{value}'")]
    BadValue { pin: PinId, value: String },
}

/// Energize / de-energize capability over a fixed set of output pins.
///
/// Implementations translate "energized" into whatever electrical level the
/// relay board needs. Calls are short and non-blocking in practice, so the
/// trait is synchronous.
pub trait PinDriver: Send + Sync {
    /// Short backend name reported by the status endpoint.
    fn backend(&self) -> &'static str;

    fn set_output(&self, pin: PinId, energized: bool) -> Result<(), PinError>;

    /// Read back the current output state from the device.
    fn read_output(&self, pin: PinId) -> Result<bool, PinError>;
}
