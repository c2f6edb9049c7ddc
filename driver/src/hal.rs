//! Adapters from the `embedded-hal` 1.0 traits to this crate's collaborator traits.
//!
//! Any HAL that implements [embedded_hal::i2c::I2c], [embedded_hal::digital::OutputPin] and
//! [embedded_hal::delay::DelayNs] can drive the display through these wrappers.
use crate::{BusError, Delay, GpioOutput, I2cBus, OledError, OledResult};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, I2c};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};

impl From<ErrorKind> for BusError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => BusError::Nack,
            ErrorKind::ArbitrationLoss => BusError::ArbitrationLoss,
            other => BusError::Other(format!("{:?}", other)),
        }
    }
}

/// [I2cBus] over an `embedded-hal` I2C master.
pub struct HalI2c<T> {
    i2c: T,
    max_transfer_len: Option<usize>,
}

impl<T: I2c> HalI2c<T> {
    pub fn new(i2c: T) -> Self {
        HalI2c {
            i2c,
            max_transfer_len: None,
        }
    }

    /// Limits the size of a single transfer. Some peripherals (or their FIFOs) can't do 1 kB+
    /// writes.
    pub fn with_max_transfer_len(mut self, len: usize) -> Self {
        self.max_transfer_len = Some(len);
        self
    }

    pub fn release(self) -> T {
        self.i2c
    }
}

impl<T> Debug for HalI2c<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "HalI2c(max: {:?})", self.max_transfer_len)
    }
}

impl<T: I2c> I2cBus for HalI2c<T> {
    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.i2c
            .write(address, bytes)
            .map_err(|e| i2c::Error::kind(&e).into())
    }

    fn max_transfer_len(&self) -> Option<usize> {
        self.max_transfer_len
    }
}

/// [GpioOutput] over an `embedded-hal` output pin.
pub struct HalOutputPin<P> {
    pin: RefCell<P>,
}

impl<P: OutputPin> HalOutputPin<P> {
    pub fn new(pin: P) -> Self {
        HalOutputPin {
            pin: RefCell::new(pin),
        }
    }

    pub fn release(self) -> P {
        self.pin.into_inner()
    }
}

impl<P> Debug for HalOutputPin<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "HalOutputPin")
    }
}

impl<P: OutputPin> GpioOutput for HalOutputPin<P> {
    fn write(&self, value: bool) -> OledResult<()> {
        let mut pin = self.pin.borrow_mut();
        let result = if value { pin.set_high() } else { pin.set_low() };
        result.map_err(|e| OledError::Pin(format!("{:?}", digital::Error::kind(&e))))
    }
}

/// [Delay] over an `embedded-hal` delay provider.
pub struct HalDelay<D> {
    delay: D,
}

impl<D: DelayNs> HalDelay<D> {
    pub fn new(delay: D) -> Self {
        HalDelay { delay }
    }
}

impl<D> Debug for HalDelay<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "HalDelay")
    }
}

impl<D: DelayNs> Delay for HalDelay<D> {
    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Debug)]
    struct FakeI2c {
        written: Vec<(u8, Vec<u8>)>,
        fail_with: Option<ErrorKind>,
    }

    impl i2c::ErrorType for FakeI2c {
        type Error = ErrorKind;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [i2c::Operation<'_>],
        ) -> Result<(), Self::Error> {
            if let Some(kind) = self.fail_with {
                return Err(kind);
            }
            for op in operations {
                if let i2c::Operation::Write(bytes) = op {
                    self.written.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct FakePin {
        levels: Vec<bool>,
    }

    impl digital::ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.levels.push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.levels.push(true);
            Ok(())
        }
    }

    #[test]
    fn i2c_writes_pass_through() {
        let mut bus = HalI2c::new(FakeI2c { written: Vec::new(), fail_with: None });
        bus.send(0x3C, &[0x80, 0xAE]).unwrap();
        assert_eq!(bus.max_transfer_len(), None);
        assert_eq!(bus.release().written, vec![(0x3C, vec![0x80, 0xAE])]);
    }

    #[derive(Debug, Default)]
    struct FakeDelay {
        total_ns: u64,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    #[test]
    fn i2c_error_kinds_are_mapped() {
        let mut bus = HalI2c::new(FakeI2c {
            written: Vec::new(),
            fail_with: Some(ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)),
        });
        assert_eq!(bus.send(0x3C, &[0x80, 0xAE]), Err(BusError::Nack));

        let mut bus = HalI2c::new(FakeI2c {
            written: Vec::new(),
            fail_with: Some(ErrorKind::ArbitrationLoss),
        });
        assert_eq!(bus.send(0x3C, &[0x40]), Err(BusError::ArbitrationLoss));
    }

    #[test]
    fn transfer_cap_is_reported() {
        let bus = HalI2c::new(FakeI2c {
            written: Vec::new(),
            fail_with: None,
        })
        .with_max_transfer_len(32);
        assert_eq!(bus.max_transfer_len(), Some(32));
    }

    #[test]
    fn output_pin_follows_levels() {
        let pin = HalOutputPin::new(FakePin::default());
        pin.write(false).unwrap();
        pin.write(true).unwrap();
        assert_eq!(pin.release().levels, vec![false, true]);
    }

    #[test]
    fn delay_forwards_to_the_provider() {
        let mut delay = HalDelay::new(FakeDelay::default());
        delay.delay_us(100);
        delay.delay_ms(10);
        assert_eq!(delay.delay.total_ns, 100_000 + 10_000_000);
    }
}
