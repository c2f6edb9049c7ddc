pub mod hal;
pub mod sim;
pub mod ssd1306;

use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum OledError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("the controller has not been initialized")]
    NotReady,
    #[error("bus transfer failed: {0}")]
    Bus(#[from] BusError),
    #[error("output line error: {0}")]
    Pin(String),
}

pub type OledResult<T> = Result<T, OledError>;

/// Errors reported by an [I2cBus] implementation.
///
/// The driver never retries; every one of these is surfaced to the caller as [OledError::Bus].
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum BusError {
    #[error("device did not acknowledge")]
    Nack,
    #[error("transfer timed out")]
    Timeout,
    #[error("bus arbitration lost")]
    ArbitrationLoss,
    #[error("error: {0}")]
    Other(String),
}

/// A two-wire bus able to write a byte sequence to a 7-bit device address.
///
/// A single call is a single transfer (start, address, payload, stop). The driver holds the bus
/// exclusively, so implementations don't have to care about interleaving.
pub trait I2cBus: Debug {
    /// Writes `bytes` to the device at `address` in one transfer.
    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError>;

    /// Gets the largest transfer, in bytes, the transport accepts, or `None` if there's no limit.
    ///
    /// Larger data writes get split by the driver.
    fn max_transfer_len(&self) -> Option<usize> {
        None
    }
}

pub trait GpioOutput: Debug {
    /// Writes the state of the output line.
    fn write(&self, value: bool) -> OledResult<()>;
}

/// Blocking delay service.
pub trait Delay: Debug {
    fn delay_us(&mut self, us: u32);
    fn delay_ms(&mut self, ms: u32);
}

/// [Delay] backed by [std::thread::sleep].
///
/// Sleeps at least as long as requested, usually a bit more, which is fine for every timing the
/// controller specifies (all of them are minimums).
#[derive(Copy, Clone, Debug, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms as u64));
    }
}
