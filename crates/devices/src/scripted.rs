//! Scripted device
//!
//! Test double that replays a fixed script of grab results, with injectable
//! init failure, init delay and panics. Shared counters let tests observe
//! what happened inside the unit context.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{
    CaptureDevice, ContractError, DeviceDriver, FramePayload, Gray16Image, SensorRole,
};

/// One scripted `grab()` result
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this payload
    Frame(FramePayload),
    /// Return `Ok(None)` (device ended)
    End,
    /// Return a read error
    Fail(String),
    /// Panic inside `grab()`
    Panic(String),
}

/// Counters observable from outside the unit context
#[derive(Debug, Default)]
pub struct ScriptProbe {
    pub init_calls: AtomicU64,
    pub grab_calls: AtomicU64,
}

impl ScriptProbe {
    pub fn init_calls(&self) -> u64 {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn grab_calls(&self) -> u64 {
        self.grab_calls.load(Ordering::SeqCst)
    }
}

/// Scripted driver
pub struct ScriptedDriver {
    role: SensorRole,
    steps: VecDeque<ScriptStep>,
    /// Repeated after the script runs out; `None` ends the device
    repeat: Option<FramePayload>,
    grab_delay: Duration,
    init_delay: Duration,
    init_error: Option<String>,
    probe: Arc<ScriptProbe>,
}

impl ScriptedDriver {
    /// Driver with an empty script (device ends on first grab)
    pub fn new(role: SensorRole) -> Self {
        Self {
            role,
            steps: VecDeque::new(),
            repeat: None,
            grab_delay: Duration::ZERO,
            init_delay: Duration::ZERO,
            init_error: None,
            probe: Arc::new(ScriptProbe::default()),
        }
    }

    /// Device producing `count` small thermal-like frames, then ending
    pub fn frames(role: SensorRole, count: usize) -> Self {
        let mut driver = Self::new(role);
        for value in 0..count {
            driver = driver.then(ScriptStep::Frame(Self::tiny_frame(value as u16)));
        }
        driver.then(ScriptStep::End)
    }

    /// Device producing frames forever
    pub fn endless(role: SensorRole) -> Self {
        let mut driver = Self::new(role);
        driver.repeat = Some(Self::tiny_frame(0));
        driver
    }

    /// 2x2 raw frame whose pixels all equal `value`
    pub fn tiny_frame(value: u16) -> FramePayload {
        FramePayload::Gray16(Gray16Image {
            width: 2,
            height: 2,
            data: vec![value; 4],
        })
    }

    pub fn then(mut self, step: ScriptStep) -> Self {
        self.steps.push_back(step);
        self
    }

    pub fn with_grab_delay(mut self, delay: Duration) -> Self {
        self.grab_delay = delay;
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn failing_init(mut self, message: impl Into<String>) -> Self {
        self.init_error = Some(message.into());
        self
    }

    /// Shared counters
    pub fn probe(&self) -> Arc<ScriptProbe> {
        Arc::clone(&self.probe)
    }
}

impl DeviceDriver for ScriptedDriver {
    fn role(&self) -> SensorRole {
        self.role
    }

    fn initialize(&mut self) -> Result<Box<dyn CaptureDevice>, ContractError> {
        self.probe.init_calls.fetch_add(1, Ordering::SeqCst);
        if !self.init_delay.is_zero() {
            thread::sleep(self.init_delay);
        }
        if let Some(message) = &self.init_error {
            return Err(ContractError::device_init(self.role, message.clone()));
        }
        Ok(Box::new(ScriptedDevice {
            role: self.role,
            steps: std::mem::take(&mut self.steps),
            repeat: self.repeat.clone(),
            grab_delay: self.grab_delay,
            probe: Arc::clone(&self.probe),
        }))
    }
}

struct ScriptedDevice {
    role: SensorRole,
    steps: VecDeque<ScriptStep>,
    repeat: Option<FramePayload>,
    grab_delay: Duration,
    probe: Arc<ScriptProbe>,
}

impl CaptureDevice for ScriptedDevice {
    fn grab(&mut self) -> Result<Option<FramePayload>, ContractError> {
        self.probe.grab_calls.fetch_add(1, Ordering::SeqCst);
        if !self.grab_delay.is_zero() {
            thread::sleep(self.grab_delay);
        }
        match self.steps.pop_front() {
            Some(ScriptStep::Frame(payload)) => Ok(Some(payload)),
            Some(ScriptStep::End) => Ok(None),
            Some(ScriptStep::Fail(message)) => Err(ContractError::device_read(self.role, message)),
            Some(ScriptStep::Panic(message)) => panic!("{message}"),
            None => Ok(self.repeat.clone()),
        }
    }
}
