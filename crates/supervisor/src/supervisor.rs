//! Session Supervisor
//!
//! `Idle → Starting → WarmingUp → Capturing → Draining → Terminated`
//!
//! Validates the blueprint, launches one capture thread per enabled role,
//! releases the start barrier after the warm-up, and collects every unit's
//! outcome. A unit failing never stops its siblings.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use capture::{panic_message, CaptureUnit, FrameTransform, StartSignal, UnitProgress};
use chunk_writer::{ChunkWriterFactory, SinkFactory};
use config_loader::ConfigLoader;
use contracts::{
    ContractError, SensorRole, SessionBlueprint, SessionDuration, Termination, UnitOutcome,
};
use devices::DriverFactory;
use observability::metrics;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Span};

use crate::report::SessionReport;
use crate::state::{SessionPhase, SessionState, UnitLiveness};

/// Session Supervisor
pub struct Supervisor {
    blueprint: SessionBlueprint,
    factory: Arc<dyn DriverFactory>,
    sinks: Arc<dyn SinkFactory>,
    duration: Option<SessionDuration>,
    warmup: Option<Duration>,
    drain_grace: Option<Duration>,
    state: watch::Sender<SessionState>,
}

/// Message from a unit thread
#[derive(Debug)]
enum UnitEvent {
    /// Passed the barrier; the unit's own `t0`
    Started(SensorRole, Instant),
    /// Capture loop ended, final flush in progress
    Draining(SensorRole),
    Finished(UnitOutcome),
}

/// Forwards a unit's lifecycle to the supervisor
struct EventSender(mpsc::UnboundedSender<UnitEvent>);

impl UnitProgress for EventSender {
    fn started(&self, role: SensorRole, t0: Instant) {
        let _ = self.0.send(UnitEvent::Started(role, t0));
    }

    fn draining(&self, role: SensorRole) {
        let _ = self.0.send(UnitEvent::Draining(role));
    }
}

/// Forced-stop point of one unit
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: tokio::time::Instant,
    /// Cancellation already sent; the next expiry declares the unit unresponsive
    cancelled: bool,
}

/// Per-unit bookkeeping of one run
#[derive(Default)]
struct Roster {
    outcomes: BTreeMap<SensorRole, UnitOutcome>,
    tokens: BTreeMap<SensorRole, CancellationToken>,
    deadlines: BTreeMap<SensorRole, Deadline>,
    /// In their final flush; never forced
    flushing: BTreeSet<SensorRole>,
}

impl Roster {
    fn next_deadline(&self) -> Option<tokio::time::Instant> {
        self.deadlines.values().map(|d| d.at).min()
    }

    fn bound(&mut self, role: SensorRole, at: Option<tokio::time::Instant>) {
        match at {
            Some(at) => {
                self.deadlines.insert(
                    role,
                    Deadline {
                        at,
                        cancelled: false,
                    },
                );
            }
            None => {
                self.deadlines.remove(&role);
            }
        }
    }
}

impl Supervisor {
    pub fn new(blueprint: SessionBlueprint, factory: Arc<dyn DriverFactory>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            blueprint,
            factory,
            sinks: Arc::new(ChunkWriterFactory),
            duration: None,
            warmup: None,
            drain_grace: None,
            state,
        }
    }

    /// Replace the on-disk chunk writers
    pub fn with_sinks(mut self, sinks: Arc<dyn SinkFactory>) -> Self {
        self.sinks = sinks;
        self
    }

    /// Override `session.duration_secs`
    pub fn with_duration(mut self, duration: SessionDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Override `session.warmup_secs`
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = Some(warmup);
        self
    }

    /// Override `session.drain_grace_secs`
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = Some(grace);
        self
    }

    pub fn blueprint(&self) -> &SessionBlueprint {
        &self.blueprint
    }

    /// Watch session state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Run one session to completion.
    ///
    /// Each unit is bounded from its own `t0`: a unit still running
    /// `duration + drain_grace` after it passed the barrier (or after the
    /// release, if it never got there) is cancelled, and declared
    /// `Unresponsive` if it is still silent one grace period later. Units in
    /// their final flush are always waited for.
    ///
    /// Cancelling `cancel` drains the session: every unit final-flushes and
    /// reports `Cancelled`.
    ///
    /// # Errors
    /// Configuration errors and output directory failures, raised before any
    /// device is initialized. Unit failures are reported in the
    /// `SessionReport`, never as an error.
    #[instrument(
        name = "supervisor_run",
        skip(self, cancel),
        fields(session = %self.blueprint.session.name)
    )]
    pub async fn run(&self, cancel: CancellationToken) -> Result<SessionReport, ContractError> {
        let launched_at = Instant::now();
        self.set_phase(SessionPhase::Starting);

        // 1. Validate and build every unit before any device is touched
        let units = match ConfigLoader::validate(&self.blueprint).and_then(|_| self.build_units())
        {
            Ok(units) => units,
            Err(e) => {
                error!(error = %e, "session cannot start");
                self.set_phase(SessionPhase::Terminated);
                return Err(e);
            }
        };

        let settings = &self.blueprint.session;
        let session = settings.name.clone();
        let duration = self.duration.unwrap_or_else(|| settings.duration());
        let warmup = self.warmup.unwrap_or_else(|| settings.warmup());
        let drain_grace = self.drain_grace.unwrap_or_else(|| settings.drain_grace());
        // None: no forced stop
        let allowance = duration
            .as_duration()
            .and_then(|d| d.checked_add(drain_grace));

        // 2. Launch
        let start = StartSignal::new();
        let unit_cancel = cancel.child_token();
        let (tx, mut rx) = mpsc::unbounded_channel::<UnitEvent>();
        let mut roster = Roster::default();
        let launch_order: Vec<SensorRole> = units.iter().map(CaptureUnit::role).collect();

        for unit in units {
            let role = unit.role();
            self.state.send_modify(|s| {
                s.units.insert(role, UnitLiveness::Pending);
            });
            let token = unit_cancel.child_token();
            roster.tokens.insert(role, token.clone());
            let launched = spawn_unit(
                unit,
                session.clone(),
                duration,
                start.clone(),
                token,
                tx.clone(),
            );
            match launched {
                Ok(()) => debug!(role = %role, "capture unit launched"),
                Err(e) => {
                    error!(role = %role, error = %e, "cannot spawn capture thread");
                    self.record(
                        &mut roster.outcomes,
                        UnitOutcome::idle(
                            role,
                            Termination::InitFailed(format!("thread spawn failed: {e}")),
                        ),
                    );
                }
            }
        }
        drop(tx);
        info!(units = launch_order.len(), ?duration, "capture units launched");

        // 3. Warm-up
        self.set_phase(SessionPhase::WarmingUp);
        info!(warmup_secs = warmup.as_secs_f64(), "warming up");
        let mut interrupted = false;
        let warmup_end = sleep(warmup);
        tokio::pin!(warmup_end);
        while self.outstanding() > 0 {
            tokio::select! {
                _ = &mut warmup_end => break,
                _ = cancel.cancelled() => {
                    info!("interrupted during warm-up");
                    interrupted = true;
                    break;
                }
                received = rx.recv() => match received {
                    Some(event) => self.handle(&mut roster, event, allowance),
                    None => break,
                },
            }
        }

        // 4. Release; units still on the barrier must see the cancellation first
        if interrupted {
            unit_cancel.cancel();
        }
        let (arrivals, stragglers) = self.release_barrier(&start, launch_order.len());

        // 5. Capture until all units end or interrupt
        if !interrupted {
            self.set_phase(SessionPhase::Capturing);
            let released = tokio::time::Instant::now();
            let initial = allowance.and_then(|a| released.checked_add(a));
            for role in self.unfinished() {
                roster.bound(role, initial);
            }

            while self.outstanding() > 0 {
                let next = roster.next_deadline();
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(event) => self.handle(&mut roster, event, allowance),
                        None => break,
                    },
                    _ = cancel.cancelled() => {
                        info!("interrupt received");
                        interrupted = true;
                        break;
                    }
                    _ = until(next) => self.expire(&mut roster, drain_grace),
                }
            }
        }

        // 6. Drain: units still looping get one grace period, flushing units
        //    are waited for
        self.set_phase(SessionPhase::Draining);
        unit_cancel.cancel();
        let grace_end = tokio::time::Instant::now().checked_add(drain_grace);
        while self.outstanding() > 0 {
            let looping: Vec<SensorRole> = self
                .unfinished()
                .into_iter()
                .filter(|role| !roster.flushing.contains(role))
                .collect();
            let limit = if looping.is_empty() { None } else { grace_end };
            tokio::select! {
                received = rx.recv() => match received {
                    Some(event) => self.handle(&mut roster, event, None),
                    None => break,
                },
                _ = until(limit) => {
                    for role in looping {
                        warn!(role = %role, grace_secs = drain_grace.as_secs_f64(), "capture unit unresponsive");
                        self.record(
                            &mut roster.outcomes,
                            UnitOutcome::idle(role, Termination::Unresponsive),
                        );
                    }
                }
            }
        }
        for role in self.unfinished() {
            warn!(role = %role, "capture unit vanished without an outcome");
            self.record(
                &mut roster.outcomes,
                UnitOutcome::idle(role, Termination::Unresponsive),
            );
        }

        self.set_phase(SessionPhase::Terminated);

        let mut outcomes = roster.outcomes;
        let report = SessionReport {
            session,
            outcomes: launch_order
                .iter()
                .filter_map(|role| outcomes.remove(role))
                .collect(),
            barrier_arrivals: arrivals,
            stragglers,
            cancelled: interrupted,
            elapsed: launched_at.elapsed(),
        };

        let failed = report.failures().count();
        if failed > 0 {
            warn!(failed, units = report.outcomes.len(), "session finished with unit failures");
        } else {
            info!(units = report.outcomes.len(), "session finished");
        }
        Ok(report)
    }

    fn build_units(&self) -> Result<Vec<CaptureUnit>, ContractError> {
        self.blueprint
            .enabled_sensors()
            .map(|(role, config)| {
                let driver = self.factory.build(role, config)?;
                if driver.role() != role {
                    return Err(ContractError::device_init(
                        role,
                        format!("driver built for '{}'", driver.role()),
                    ));
                }
                let sink = self.sinks.build(role, self.blueprint.output_directory(role))?;
                Ok(CaptureUnit::new(
                    driver,
                    sink,
                    config.chunk_duration(),
                    FrameTransform::for_sensor(role, config),
                ))
            })
            .collect()
    }

    /// Release the start barrier and report who was not there.
    fn release_barrier(&self, start: &StartSignal, launched: usize) -> (usize, Vec<SensorRole>) {
        let arrived = start.arrived_roles();
        if start.release() {
            info!(arrived = arrived.len(), expected = launched, "capture started");
        }
        metrics::record_barrier_release(arrived.len(), launched);

        let stragglers: Vec<SensorRole> = self
            .unfinished()
            .into_iter()
            .filter(|role| !arrived.contains(role))
            .collect();
        for role in &stragglers {
            warn!(role = %role, "unit not ready at start, it joins late");
        }

        self.state.send_modify(|s| {
            s.start_released = true;
            s.started_at = Some(Instant::now());
        });
        for role in arrived.iter().copied() {
            self.mark_running(role);
        }

        (arrived.len(), stragglers)
    }

    /// Apply one unit event. `allowance` bounds units from their own `t0`.
    fn handle(&self, roster: &mut Roster, event: UnitEvent, allowance: Option<Duration>) {
        match event {
            UnitEvent::Started(role, t0) => {
                if roster.outcomes.contains_key(&role) {
                    return;
                }
                debug!(role = %role, "unit passed the start barrier");
                self.mark_running(role);
                let at = allowance
                    .and_then(|a| tokio::time::Instant::from_std(t0).checked_add(a));
                roster.bound(role, at);
            }
            UnitEvent::Draining(role) => {
                roster.deadlines.remove(&role);
                roster.flushing.insert(role);
            }
            UnitEvent::Finished(outcome) => {
                roster.deadlines.remove(&outcome.role);
                roster.flushing.remove(&outcome.role);
                self.record(&mut roster.outcomes, outcome);
            }
        }
    }

    /// Cancel units past their deadline; a cancelled unit that misses the
    /// next one too is declared unresponsive.
    fn expire(&self, roster: &mut Roster, grace: Duration) {
        let now = tokio::time::Instant::now();
        let due: Vec<(SensorRole, Deadline)> = roster
            .deadlines
            .iter()
            .filter(|(_, deadline)| deadline.at <= now)
            .map(|(role, deadline)| (*role, *deadline))
            .collect();

        for (role, deadline) in due {
            if deadline.cancelled {
                roster.deadlines.remove(&role);
                warn!(role = %role, grace_secs = grace.as_secs_f64(), "capture unit unresponsive");
                self.record(
                    &mut roster.outcomes,
                    UnitOutcome::idle(role, Termination::Unresponsive),
                );
                continue;
            }

            warn!(role = %role, "capture unit overran its deadline, cancelling");
            if let Some(token) = roster.tokens.get(&role) {
                token.cancel();
            }
            match now.checked_add(grace) {
                Some(at) => {
                    roster.deadlines.insert(
                        role,
                        Deadline {
                            at,
                            cancelled: true,
                        },
                    );
                }
                None => {
                    roster.deadlines.remove(&role);
                }
            }
        }
    }

    fn mark_running(&self, role: SensorRole) {
        self.state.send_modify(|s| {
            if let Some(liveness) = s.units.get_mut(&role) {
                if *liveness == UnitLiveness::Pending {
                    *liveness = UnitLiveness::Running;
                }
            }
        });
    }

    fn record(&self, outcomes: &mut BTreeMap<SensorRole, UnitOutcome>, outcome: UnitOutcome) {
        let role = outcome.role;
        if outcomes.contains_key(&role) {
            debug!(role = %role, "duplicate outcome ignored");
            return;
        }

        metrics::record_unit_terminated(role.as_str(), outcome.termination.label());
        if outcome.termination.is_failure() {
            warn!(role = %role, reason = %outcome.termination, "capture unit failed");
        } else {
            info!(
                role = %role,
                reason = %outcome.termination,
                frames = outcome.frames_captured,
                chunks = outcome.chunks_written,
                "capture unit terminated"
            );
        }

        let liveness = UnitLiveness::from_termination(&outcome.termination);
        self.state.send_modify(|s| {
            s.units.insert(role, liveness);
        });
        outcomes.insert(role, outcome);
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.state.send_modify(|s| s.phase = phase);
        metrics::record_session_phase(phase.ordinal());
        debug!(phase = %phase, "session phase");
    }

    fn outstanding(&self) -> usize {
        self.state.borrow().outstanding()
    }

    fn unfinished(&self) -> Vec<SensorRole> {
        self.state
            .borrow()
            .units
            .iter()
            .filter(|(_, liveness)| !liveness.is_finished())
            .map(|(role, _)| *role)
            .collect()
    }
}

/// Run one unit on its own named thread.
///
/// Panics escaping the unit are reported as `Panicked`.
fn spawn_unit(
    unit: CaptureUnit,
    session: String,
    duration: SessionDuration,
    start: StartSignal,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<UnitEvent>,
) -> io::Result<()> {
    let role = unit.role();
    let unit = unit.with_progress(EventSender(events.clone()));
    let span = Span::current();
    thread::Builder::new()
        .name(format!("capture-{role}"))
        .spawn(move || {
            let _entered = span.enter();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                unit.run(&session, duration, &start, &cancel)
            }))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!(role = %role, panic = %message, "capture unit panicked");
                UnitOutcome::idle(role, Termination::Panicked(message))
            });
            if events.send(UnitEvent::Finished(outcome)).is_err() {
                debug!(role = %role, "supervisor gone, late outcome dropped");
            }
        })?;
    Ok(())
}

/// Resolve at `deadline`, or never
async fn until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
