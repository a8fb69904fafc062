//! Capture Unit - 单传感器采集循环
//!
//! Owns one device for the lifetime of a session: initializes it inside the
//! unit's own context, waits on the start barrier, then grabs frames into a
//! buffer that is flushed to the chunk sink every `chunk_duration`.
//!
//! Every exit path of the loop (duration reached, device ended, cancellation,
//! grab/transform error or panic) runs exactly one final flush.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use contracts::{
    ChunkSink, ContractError, DeviceDriver, Frame, FramePayload, SensorRole, SessionDuration,
    Termination, UnitOutcome,
};
use observability::{metrics, FlushStats};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::signal::StartSignal;
use crate::transform::FrameTransform;

/// Lifecycle notifications of a running unit, called on the unit's thread
pub trait UnitProgress: Send {
    /// Passed the start barrier; `t0` is the unit's time origin.
    fn started(&self, _role: SensorRole, _t0: Instant) {}

    /// Capture loop ended; only the final flush remains.
    fn draining(&self, _role: SensorRole) {}
}

impl UnitProgress for () {}

/// Capture Unit
pub struct CaptureUnit {
    role: SensorRole,
    driver: Box<dyn DeviceDriver>,
    sink: Box<dyn ChunkSink>,
    chunk_duration: Duration,
    transform: FrameTransform,
    progress: Box<dyn UnitProgress>,
}

/// Counters accumulated during one run
#[derive(Debug, Default)]
struct Tally {
    frames_captured: u64,
    chunks_written: u64,
    write_failures: u64,
    flush_stats: FlushStats,
}

impl CaptureUnit {
    /// Create a unit; the role is taken from the driver.
    pub fn new(
        driver: Box<dyn DeviceDriver>,
        sink: Box<dyn ChunkSink>,
        chunk_duration: Duration,
        transform: FrameTransform,
    ) -> Self {
        Self {
            role: driver.role(),
            driver,
            sink,
            chunk_duration,
            transform,
            progress: Box::new(()),
        }
    }

    pub fn with_progress(mut self, progress: impl UnitProgress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn role(&self) -> SensorRole {
        self.role
    }

    /// Run the unit to completion and report how it ended.
    ///
    /// Blocking; meant to run on the unit's dedicated thread.
    #[instrument(
        name = "capture_unit_run",
        skip(self, start, cancel),
        fields(role = %self.role)
    )]
    pub fn run(
        mut self,
        session: &str,
        duration: SessionDuration,
        start: &StartSignal,
        cancel: &CancellationToken,
    ) -> UnitOutcome {
        let role = self.role;

        // 1. Device init, never retried
        let mut device = match self.driver.initialize() {
            Ok(device) => {
                info!("device initialized");
                device
            }
            Err(e) => {
                error!(error = %e, "device initialization failed");
                return UnitOutcome::idle(role, Termination::InitFailed(e.to_string()));
            }
        };

        // 2. Barrier
        debug!("waiting for start signal");
        start.wait_as(role);

        // 3. t0
        let t0 = Instant::now();
        self.progress.started(role, t0);
        info!(chunk_secs = self.chunk_duration.as_secs_f64(), "capture started");

        let transform = self.transform;
        let mut buffer: Vec<Frame> = Vec::new();
        let mut tally = Tally::default();
        let mut last_flush = t0;

        // 4. Capture loop
        let termination = loop {
            if cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            if duration.is_elapsed(t0.elapsed()) {
                break Termination::DurationElapsed;
            }

            let grabbed = panic::catch_unwind(AssertUnwindSafe(
                || -> Result<Option<FramePayload>, ContractError> {
                    match device.grab()? {
                        Some(payload) => transform.apply(role, payload).map(Some),
                        None => Ok(None),
                    }
                },
            ));

            match grabbed {
                Ok(Ok(Some(payload))) => {
                    buffer.push(Frame {
                        sequence: tally.frames_captured,
                        offset: t0.elapsed(),
                        payload,
                    });
                    tally.frames_captured += 1;
                    metrics::record_frame_captured(role.as_str());
                }
                Ok(Ok(None)) => {
                    info!("device returned no data");
                    break Termination::DeviceEnded;
                }
                Ok(Err(e)) => {
                    error!(error = %e, "capture error");
                    break Termination::CaptureError(e.to_string());
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(panic = %message, "capture loop panicked");
                    break Termination::CaptureError(format!("panic: {message}"));
                }
            }

            if last_flush.elapsed() >= self.chunk_duration {
                self.flush(session, &mut buffer, &mut tally);
                last_flush = Instant::now();
            }
        };

        // 5. Final flush, exactly once
        self.progress.draining(role);
        let remaining = buffer.len();
        self.flush(session, &mut buffer, &mut tally);
        info!(frames = remaining, "final flush done");

        let capture_time = t0.elapsed();
        info!(
            reason = %termination,
            frames = tally.frames_captured,
            chunks = tally.chunks_written,
            write_failures = tally.write_failures,
            flush = %tally.flush_stats,
            capture_secs = capture_time.as_secs_f64(),
            "capture unit finished"
        );

        UnitOutcome {
            role,
            termination,
            frames_captured: tally.frames_captured,
            chunks_written: tally.chunks_written,
            write_failures: tally.write_failures,
            capture_time,
        }
    }

    /// Persist and clear the buffer. Empty buffers are skipped.
    ///
    /// Write failures, sink panics included, are logged and counted; the
    /// frames are dropped and capture continues.
    fn flush(&mut self, session: &str, buffer: &mut Vec<Frame>, tally: &mut Tally) {
        if buffer.is_empty() {
            return;
        }

        let role = self.role.as_str();
        let frames = buffer.len();
        metrics::record_buffer_depth(role, frames);
        let started = Instant::now();

        let sink = &mut self.sink;
        let written = panic::catch_unwind(AssertUnwindSafe(|| sink.flush(session, buffer)))
            .unwrap_or_else(|payload| {
                Err(ContractError::chunk_write(
                    self.role,
                    format!("panic: {}", panic_message(payload.as_ref())),
                ))
            });

        match written {
            Ok(Some(chunk)) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                tally.chunks_written += 1;
                tally.flush_stats.push(latency_ms, chunk.frames);
                metrics::record_chunk_written(role, chunk.frames, chunk.bytes, latency_ms);
                debug!(
                    path = %chunk.path.display(),
                    frames = chunk.frames,
                    bytes = chunk.bytes,
                    latency_ms,
                    "chunk written"
                );
            }
            Ok(None) => warn!(frames, "sink skipped a non-empty buffer"),
            Err(e) => {
                tally.write_failures += 1;
                metrics::record_write_failure(role, frames);
                error!(error = %e, frames, "chunk write failed, frames discarded");
            }
        }

        buffer.clear();
        metrics::record_buffer_depth(role, 0);
    }
}

/// Human-readable message of a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
