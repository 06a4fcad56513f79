use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::accel::Accelerator;
use crate::emit::{self, OutputEvent};
use crate::report::{self, ReportLayout};

/// Largest report the driver will read in one go.
const MAX_REPORT_SIZE: usize = 64;

/// Source of raw HID reports.
pub trait ReportSource {
    /// Block until a report arrives or the source's timeout expires.
    /// Returns the report length, or 0 on timeout.
    fn read_report(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Consumer of one tick's worth of output events.
pub trait EventSink {
    fn emit(&mut self, events: &[OutputEvent]) -> io::Result<()>;
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Error reading mouse report: {0}")]
    Read(#[source] io::Error),
    #[error("Expected a {expected} byte report, got {actual}")]
    ReportLength { expected: usize, actual: usize },
    #[error("Error emitting events: {0}")]
    Emit(#[source] io::Error),
    #[error("Driver already stopped")]
    Stopped,
}

impl DriverError {
    pub fn exit_code(&self) -> i32 {
        match self {
            DriverError::Read(e) | DriverError::Emit(e) => e.raw_os_error().unwrap_or(1),
            _ => 1,
        }
    }
}

/// Cooperative cancellation flag shared between the driver and whoever stops it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Stopped,
}

/// Reads reports, accelerates them and forwards the events, one tick at a time.
pub struct Driver<S, K> {
    source: S,
    sink: K,
    accel: Accelerator,
    report_size: Option<usize>,
    state: DriverState,
}

impl<S: ReportSource, K: EventSink> Driver<S, K> {
    /// `report_size` fixes the expected report length; when `None` the first
    /// report read decides it.
    pub fn new(source: S, sink: K, accel: Accelerator, report_size: Option<usize>) -> Self {
        if let Some(len) = report_size {
            check_layout(len);
        }
        Self {
            source,
            sink,
            accel,
            report_size,
            state: DriverState::Running,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> DriverState {
        self.state
    }

    #[cfg(test)]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    #[cfg(test)]
    pub fn accelerator(&self) -> &Accelerator {
        &self.accel
    }

    /// Run until `cancel` is set or the device fails. A stopped driver cannot
    /// be restarted.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<(), DriverError> {
        if self.state == DriverState::Stopped {
            return Err(DriverError::Stopped);
        }
        let result = self.run_loop(cancel);
        self.state = DriverState::Stopped;
        result
    }

    fn run_loop(&mut self, cancel: &CancelToken) -> Result<(), DriverError> {
        let mut buf = [0u8; MAX_REPORT_SIZE];
        while !cancel.is_cancelled() {
            let len = self.source.read_report(&mut buf).map_err(DriverError::Read)?;
            if len == 0 {
                continue;
            }

            let expected = match self.report_size {
                Some(expected) => expected,
                None => {
                    log::info!("Detected {} byte reports", len);
                    check_layout(len);
                    self.report_size = Some(len);
                    len
                }
            };
            if len != expected {
                return Err(DriverError::ReportLength {
                    expected,
                    actual: len,
                });
            }

            self.tick(&buf[..len])?;
        }
        log::info!("Driver cancelled");
        Ok(())
    }

    /// Decode, accelerate and emit a single report.
    pub fn tick(&mut self, report: &[u8]) -> Result<(), DriverError> {
        log::trace!("report {:02x?}", report);
        let mut sample = report::decode(report);
        let (dx, dy) = self.accel.accelerate(sample.dx, sample.dy);
        sample.dx = dx;
        sample.dy = dy;
        self.sink
            .emit(&emit::events_for(&sample))
            .map_err(DriverError::Emit)
    }
}

fn check_layout(len: usize) {
    if ReportLayout::from_len(len).is_none() {
        log::warn!(
            "Unsupported {} byte report layout, reports will decode as idle",
            len
        );
    }
}
