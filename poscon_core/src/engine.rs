//! The control loop: event dispatch, per-cycle orchestration and driver I/O.
//!
//! All loop state sits behind one mutex and every event takes it exactly
//! once. Work that touches the motor driver or the observers is captured
//! under that lock and carried out after it is dropped, so a slow bus never
//! delays encoder edges.
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use eyre::eyre;
use poscon_traits::{EdgeSource, MotorDriver};

use crate::config::EngineCfg;
use crate::controller::PositionController;
use crate::decimal::Decimal;
use crate::error::{ControlError, Result};
use crate::hw_error::map_hw_error;
use crate::input::{DestinationFormat, to_pulses};
use crate::pulse::PulseCounter;
use crate::sampler::CycleSampler;
use crate::state::{RunState, RunStateMachine};
use crate::telemetry::{KinematicSnapshot, Publication, Telemetry};

pub type BoxedDriver = Box<dyn MotorDriver + Send>;
pub type BoxedEdgeSource = Box<dyn EdgeSource + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Reset,
    Start,
    Stop,
    Shutdown,
    /// Destination in revolutions.
    SetDestination(Decimal),
    SetProportionalGain(Decimal),
    SetIntegralGain(Decimal),
    SetAntiWindup(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Rising edge on the leading encoder channel.
    EncoderEdge { lagging_high: bool },
    /// Rising edge on the reference clock.
    ReferenceTick { now: Instant },
    Operator(OperatorCommand),
}

/// Controller internals exposed for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStatus {
    pub proportional_gain: Decimal,
    pub integral_gain: Decimal,
    pub anti_windup: bool,
    pub accumulator: i64,
    /// Recent errors, newest first.
    pub history: Vec<i64>,
    pub last_output: i32,
}

struct LoopState {
    pulses: PulseCounter,
    sampler: CycleSampler,
    controller: PositionController,
    run: RunStateMachine,
    counter: u64,
    destination: Decimal,
    target: i64,
}

enum DriverIo {
    Drive(i32),
    Brake,
    Release,
}

/// Side effects captured under the state lock.
#[derive(Default)]
struct Deferred {
    io: Option<DriverIo>,
    publication: Option<Publication>,
}

impl Deferred {
    fn publish(p: Publication) -> Self {
        Self {
            io: None,
            publication: Some(p),
        }
    }
}

pub struct ControlLoop {
    state: Mutex<LoopState>,
    driver: Mutex<BoxedDriver>,
    edges: Mutex<Option<BoxedEdgeSource>>,
    telemetry: Telemetry,
    format: DestinationFormat,
    pulses_per_revolution: u32,
}

impl std::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("state", &self.run_state())
            .field("pulses_per_revolution", &self.pulses_per_revolution)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

#[cfg(feature = "hardware-errors")]
fn fault_reason(code: u8) -> String {
    poscon_hardware::describe_fault(code)
}

#[cfg(not(feature = "hardware-errors"))]
fn fault_reason(code: u8) -> String {
    format!("fault code {code:#04x}")
}

impl ControlLoop {
    /// Start building a ControlLoop.
    pub fn builder() -> crate::builder::ControlLoopBuilder<crate::builder::Missing> {
        crate::builder::ControlLoopBuilder::default()
    }

    /// Called by the builder once the config has been validated.
    pub(crate) fn new(cfg: EngineCfg, format: DestinationFormat, driver: BoxedDriver) -> Self {
        let state = LoopState {
            pulses: PulseCounter::new(),
            sampler: CycleSampler::new(
                cfg.pulses_per_revolution,
                cfg.scales,
                cfg.speed_jitter_rpm,
            ),
            controller: PositionController::new(&cfg.controller, cfg.scales.gain),
            run: RunStateMachine::new(),
            counter: 0,
            destination: format.normalise(Decimal::ZERO),
            target: 0,
        };
        Self {
            state: Mutex::new(state),
            driver: Mutex::new(driver),
            edges: Mutex::new(None),
            telemetry: Telemetry::new(cfg.telemetry_capacity),
            format,
            pulses_per_revolution: cfg.pulses_per_revolution,
        }
    }

    /// Register the loop's callbacks with `source` and keep the source until
    /// shutdown. Callbacks hold a weak reference, so the source never keeps
    /// the loop alive.
    pub fn attach(self: &Arc<Self>, mut source: BoxedEdgeSource) -> Result<()> {
        if self.run_state() == RunState::Shutdown {
            return Err(eyre::Report::new(ControlError::State(
                "cannot attach after shutdown".into(),
            )));
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        source
            .on_leading_edge(Box::new(move |lagging_high| {
                if let Some(lp) = weak.upgrade()
                    && let Err(e) = lp.handle(Event::EncoderEdge { lagging_high })
                {
                    tracing::error!(error = %e, "encoder edge not handled");
                }
            }))
            .map_err(|e| eyre::Report::new(map_hw_error(e.as_ref())))?;

        let weak: Weak<Self> = Arc::downgrade(self);
        source
            .on_reference_edge(Box::new(move |now| {
                if let Some(lp) = weak.upgrade()
                    && let Err(e) = lp.handle(Event::ReferenceTick { now })
                {
                    tracing::error!(error = %e, "reference tick not handled");
                }
            }))
            .map_err(|e| eyre::Report::new(map_hw_error(e.as_ref())))?;

        let mut slot = self
            .edges
            .lock()
            .map_err(|_| eyre!("edge source lock poisoned"))?;
        if let Some(mut old) = slot.replace(source)
            && let Err(e) = old.release()
        {
            tracing::warn!(error = %e, "previous edge source release failed");
        }
        tracing::debug!("edge source attached");
        Ok(())
    }

    pub fn subscribe(&self) -> crossbeam_channel::Receiver<crate::telemetry::Publication> {
        self.telemetry.subscribe()
    }

    pub fn destination_format(&self) -> DestinationFormat {
        self.format
    }

    pub fn pulses_per_revolution(&self) -> u32 {
        self.pulses_per_revolution
    }

    pub fn run_state(&self) -> RunState {
        self.state
            .lock()
            .map(|s| s.run.state())
            .unwrap_or(RunState::Shutdown)
    }

    /// Current pulse count.
    pub fn position(&self) -> i64 {
        self.state.lock().map(|s| s.pulses.value()).unwrap_or(0)
    }

    /// Target position in pulses.
    pub fn target(&self) -> i64 {
        self.state.lock().map(|s| s.target).unwrap_or(0)
    }

    pub fn cycle_counter(&self) -> u64 {
        self.state.lock().map(|s| s.counter).unwrap_or(0)
    }

    pub fn controller_status(&self) -> Result<ControllerStatus> {
        let st = self.lock_state()?;
        let c = &st.controller;
        Ok(ControllerStatus {
            proportional_gain: c.proportional_gain(),
            integral_gain: c.integral_gain(),
            anti_windup: c.anti_windup(),
            accumulator: c.accumulator(),
            history: c.history().to_vec(),
            last_output: c.last_output(),
        })
    }

    /// Single entry point for every event.
    pub fn handle(&self, event: Event) -> Result<()> {
        let deferred = {
            let mut st = self.lock_state()?;
            match event {
                Event::EncoderEdge { lagging_high } => {
                    if !st.run.is_shutdown() {
                        st.pulses.on_edge(lagging_high);
                    }
                    return Ok(());
                }
                Event::ReferenceTick { now } => {
                    if st.run.is_shutdown() {
                        return Ok(());
                    }
                    Self::run_cycle(&mut st, now)
                }
                Event::Operator(cmd) => self.apply(&mut st, cmd)?,
            }
        };
        self.perform(deferred)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, LoopState>> {
        self.state
            .lock()
            .map_err(|_| eyre::Report::new(ControlError::State("loop state lock poisoned".into())))
    }

    /// One control cycle. Runs under the state lock.
    fn run_cycle(st: &mut LoopState, now: Instant) -> Deferred {
        let phi = st.pulses.value();
        let sample = st.sampler.on_tick(now, phi);
        st.counter = st.counter.saturating_add(1);

        let (drive, io) = if st.run.is_running() {
            let cmd = st.controller.compute_command(sample.seconds, st.target, phi);
            (cmd, Some(DriverIo::Drive(cmd)))
        } else {
            (0, None)
        };

        let snapshot = KinematicSnapshot {
            counter: st.counter,
            phi,
            rotation: sample.rotation,
            rpm: sample.rpm,
            cycle_time: sample.seconds,
            drive,
        };
        tracing::trace!(counter = st.counter, phi, drive, "cycle");
        Deferred {
            io,
            publication: Some(Publication::Snapshot(snapshot)),
        }
    }

    fn apply(&self, st: &mut LoopState, cmd: OperatorCommand) -> Result<Deferred> {
        if st.run.is_shutdown() {
            return Err(eyre::Report::new(ControlError::State(format!(
                "{cmd:?} rejected after shutdown"
            ))));
        }
        let deferred = match cmd {
            OperatorCommand::Reset => {
                let from = st.run.transition(RunState::Reset)?;
                st.counter = 0;
                st.pulses.reset();
                st.sampler.reset();
                st.controller.reset();
                // The bridge still holds the last drive command.
                Deferred {
                    io: (from == RunState::Running).then_some(DriverIo::Brake),
                    publication: None,
                }
            }
            OperatorCommand::Start => {
                st.run.transition(RunState::Running)?;
                Deferred::default()
            }
            OperatorCommand::Stop => {
                st.run.transition(RunState::Stopped)?;
                st.counter = 0;
                Deferred {
                    io: Some(DriverIo::Brake),
                    publication: None,
                }
            }
            OperatorCommand::Shutdown => {
                st.run.transition(RunState::Shutdown)?;
                Deferred {
                    io: Some(DriverIo::Release),
                    publication: None,
                }
            }
            OperatorCommand::SetDestination(rev) => {
                let destination = self.format.normalise(rev);
                let Some(target) = to_pulses(destination, self.pulses_per_revolution) else {
                    tracing::warn!(%destination, "destination beyond the pulse range");
                    return Err(eyre::Report::new(ControlError::Input(format!(
                        "destination {destination} exceeds the pulse range"
                    ))));
                };
                st.destination = destination;
                st.target = target;
                tracing::debug!(destination = %st.destination, target = st.target, "destination set");
                Deferred::publish(Publication::Target {
                    display: self.format.format(st.destination),
                    pulses: st.target,
                })
            }
            OperatorCommand::SetProportionalGain(g) => {
                let g = st.controller.set_proportional_gain(g);
                tracing::debug!(kp = %g, "proportional gain set");
                Deferred::publish(Publication::ProportionalGain(g))
            }
            OperatorCommand::SetIntegralGain(g) => {
                let g = st.controller.set_integral_gain(g);
                tracing::debug!(ki = %g, "integral gain set");
                Deferred::publish(Publication::IntegralGain(g))
            }
            OperatorCommand::SetAntiWindup(on) => {
                st.controller.set_anti_windup(on);
                tracing::debug!(anti_windup = on, "anti-windup set");
                Deferred::publish(Publication::AntiWindup(on))
            }
        };
        Ok(deferred)
    }

    /// Driver I/O and publication, outside the state lock.
    fn perform(&self, deferred: Deferred) -> Result<()> {
        let io_result = match deferred.io {
            None => Ok(()),
            Some(DriverIo::Drive(cmd)) => {
                // Failures are logged; the next cycle drives again.
                self.drive(cmd);
                Ok(())
            }
            Some(DriverIo::Brake) => self.brake(),
            Some(DriverIo::Release) => self.release_all(),
        };
        if let Some(p) = deferred.publication {
            self.telemetry.publish(&p);
        }
        io_result
    }

    fn lock_driver(&self) -> Result<MutexGuard<'_, BoxedDriver>> {
        self.driver
            .lock()
            .map_err(|_| eyre::Report::new(ControlError::State("driver lock poisoned".into())))
    }

    fn log_fault(driver: &mut BoxedDriver) {
        match driver.fault() {
            Ok(0) => {}
            Ok(code) => {
                tracing::error!(code, reason = %fault_reason(code), "motor driver fault");
            }
            Err(e) => {
                tracing::error!(error = %map_hw_error(e.as_ref()), "fault register read failed");
            }
        }
    }

    fn drive(&self, cmd: i32) {
        let Ok(mut driver) = self.lock_driver() else {
            tracing::error!("driver lock poisoned; command dropped");
            return;
        };
        // A Stop or Shutdown may have been handled since this command was
        // computed; its brake or release must win.
        if self.run_state() != RunState::Running {
            return;
        }
        Self::log_fault(&mut driver);
        if let Err(e) = driver.drive(cmd) {
            tracing::error!(command = cmd, error = %map_hw_error(e.as_ref()), "drive failed");
        }
    }

    fn brake(&self) -> Result<()> {
        let mut driver = self.lock_driver()?;
        let res = driver.brake();
        Self::log_fault(&mut driver);
        res.map_err(|e| {
            let err = map_hw_error(e.as_ref());
            tracing::error!(error = %err, "brake failed");
            eyre::Report::new(err)
        })
    }

    /// Release the driver and the edge source. Both are attempted; the first
    /// failure is returned.
    fn release_all(&self) -> Result<()> {
        let mut first: Option<ControlError> = None;
        match self.lock_driver() {
            Ok(mut driver) => {
                if let Err(e) = driver.release() {
                    let err = map_hw_error(e.as_ref());
                    tracing::error!(error = %err, "driver release failed");
                    first.get_or_insert(err);
                }
            }
            Err(e) => tracing::error!(error = %e, "driver not released"),
        }
        let source = self.edges.lock().ok().and_then(|mut s| s.take());
        if let Some(mut source) = source
            && let Err(e) = source.release()
        {
            let err = map_hw_error(e.as_ref());
            tracing::error!(error = %err, "edge source release failed");
            first.get_or_insert(err);
        }
        tracing::debug!("control loop shut down");
        match first {
            Some(err) => Err(eyre::Report::new(err)),
            None => Ok(()),
        }
    }
}
