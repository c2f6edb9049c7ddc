//! Simulated collaborators that record what the driver does instead of touching hardware.
//!
//! All of them write into a shared [SimLog], so the relative order of bus transfers, line changes
//! and delays can be inspected afterwards. Bus failures are injected through the log as well,
//! since the driver holds the bus exclusively while it runs.
use crate::{BusError, Delay, GpioOutput, I2cBus, OledResult};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SimEvent {
    /// A completed bus transfer.
    Transfer { address: u8, bytes: Vec<u8> },
    /// An output line was driven to `level`.
    Line { name: &'static str, level: bool },
    /// The driver waited `us` microseconds.
    Delay { us: u64 },
}

#[derive(Default)]
struct SimState {
    events: Vec<SimEvent>,
    attempts: usize,
    failure: Option<(usize, BusError)>,
}

/// Shared, append-only event log.
#[derive(Clone, Default)]
pub struct SimLog(Rc<RefCell<SimState>>);

impl SimLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: SimEvent) {
        self.0.borrow_mut().events.push(event);
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.0.borrow().events.clone()
    }

    /// Gets the payloads of all completed transfers, control byte included.
    pub fn transfers(&self) -> Vec<Vec<u8>> {
        self.0
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                SimEvent::Transfer { bytes, .. } => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().events.is_empty()
    }

    /// Forgets recorded events. Attempt counting and pending failures are kept.
    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }

    /// Gets the number of transfers attempted so far, failed ones included.
    pub fn attempts(&self) -> usize {
        self.0.borrow().attempts
    }

    /// Makes the next transfer attempt fail with `error`. Nothing is recorded for it.
    pub fn fail_next_transfer(&self, error: BusError) {
        let mut state = self.0.borrow_mut();
        state.failure = Some((state.attempts, error));
    }

    /// Makes the transfer with the given zero-based attempt number fail with `error`.
    pub fn fail_transfer_at(&self, attempt: usize, error: BusError) {
        self.0.borrow_mut().failure = Some((attempt, error));
    }

    fn attempt_transfer(&self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        let mut state = self.0.borrow_mut();
        let attempt = state.attempts;
        state.attempts += 1;

        if state.failure.as_ref().is_some_and(|(at, _)| *at == attempt) {
            if let Some((_, error)) = state.failure.take() {
                return Err(error);
            }
        }

        state.events.push(SimEvent::Transfer {
            address,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

impl Debug for SimLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimLog({} events)", self.len())
    }
}

/// [I2cBus] that records transfers into a [SimLog], with an optional transfer cap.
#[derive(Debug)]
pub struct RecordingBus {
    log: SimLog,
    max_transfer_len: Option<usize>,
}

impl RecordingBus {
    pub fn new(log: SimLog) -> Self {
        RecordingBus {
            log,
            max_transfer_len: None,
        }
    }

    /// Rejects (with [BusError::Other]) any transfer longer than `len` bytes.
    pub fn with_max_transfer_len(mut self, len: usize) -> Self {
        self.max_transfer_len = Some(len);
        self
    }
}

impl I2cBus for RecordingBus {
    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        if let Some(limit) = self.max_transfer_len {
            if bytes.len() > limit {
                return Err(BusError::Other(format!(
                    "transfer of {} bytes exceeds limit of {}",
                    bytes.len(),
                    limit
                )));
            }
        }
        self.log.attempt_transfer(address, bytes)
    }

    fn max_transfer_len(&self) -> Option<usize> {
        self.max_transfer_len
    }
}

/// [GpioOutput] that records every level it is driven to.
#[derive(Debug)]
pub struct RecordingPin {
    name: &'static str,
    log: SimLog,
    level: RefCell<Option<bool>>,
}

impl RecordingPin {
    pub fn new(name: &'static str, log: SimLog) -> Self {
        RecordingPin {
            name,
            log,
            level: RefCell::new(None),
        }
    }

    /// Gets the last level written, or `None` if the line was never driven.
    pub fn level(&self) -> Option<bool> {
        *self.level.borrow()
    }
}

impl GpioOutput for RecordingPin {
    fn write(&self, value: bool) -> OledResult<()> {
        *self.level.borrow_mut() = Some(value);
        self.log.push(SimEvent::Line {
            name: self.name,
            level: value,
        });
        Ok(())
    }
}

/// [Delay] that records the requested time and returns immediately.
#[derive(Debug)]
pub struct RecordingDelay {
    log: SimLog,
}

impl RecordingDelay {
    pub fn new(log: SimLog) -> Self {
        RecordingDelay { log }
    }
}

impl Delay for RecordingDelay {
    fn delay_us(&mut self, us: u32) {
        self.log.push(SimEvent::Delay { us: us as u64 });
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.push(SimEvent::Delay {
            us: ms as u64 * 1000,
        });
    }
}
