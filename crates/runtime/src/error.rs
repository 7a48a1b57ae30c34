use sprinkler_core::error::CoreError;
use sprinkler_gpio::PinError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Pin driver failure: {0}")]
    Pin(#[from] PinError),
}
