use super::events::{LoopEvent, LoopObserver, TracingObserver};
use super::rules::RulesEngine;
use crate::config::{ControlConfig, ParameterDefaults};
use crate::db::{Database, MeasurementSink};
use crate::error::{GreenhouseError, Result};
use crate::models::{Alert, LoopSettings, Measurement};
use crate::sensors::ReadingSource;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
}

/// Read-only view of the loop for the foreground.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStatus {
    pub state: LoopState,
    pub pump_active: bool,
    pub cycles: u64,
    pub last_measurement_id: Option<i64>,
}

/// Requests consumed by the loop at the next cycle boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    PumpOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Stopped,
    /// Best-effort join timed out; the task was asked to abort but may still
    /// be executing its current cycle.
    Abandoned,
}

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub stop_timeout: Duration,
    pub max_persistence_failures: u32,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(5),
            max_persistence_failures: 5,
        }
    }
}

impl From<&ControlConfig> for LoopOptions {
    fn from(config: &ControlConfig) -> Self {
        Self {
            stop_timeout: Duration::from_secs(config.stop_timeout_secs),
            max_persistence_failures: config.max_persistence_failures.max(1),
        }
    }
}

/// State owned by the loop task. Handed back to [`ControlLoop`] on join so
/// the pump state survives a stop/start.
struct Worker {
    store: Database,
    sink: Arc<dyn MeasurementSink>,
    source: Box<dyn ReadingSource>,
    engine: RulesEngine,
    observer: Arc<dyn LoopObserver>,
    status: Arc<watch::Sender<LoopStatus>>,
    interval: Duration,
    pump_active: bool,
    cycles: u64,
    last_measurement_id: Option<i64>,
    max_persistence_failures: u32,
}

struct RunningLoop {
    token: CancellationToken,
    commands: mpsc::UnboundedSender<LoopCommand>,
    handle: JoinHandle<Option<Worker>>,
}

/// Periodic sample → evaluate → persist loop driving the irrigation pump.
pub struct ControlLoop {
    worker: Option<Worker>,
    running: Option<RunningLoop>,
    status: Arc<watch::Sender<LoopStatus>>,
    observer: Arc<dyn LoopObserver>,
    stop_timeout: Duration,
}

impl ControlLoop {
    /// Seeds absent parameters with `defaults` and prepares an idle loop
    /// that persists into `db`.
    pub fn new(
        db: Database,
        source: Box<dyn ReadingSource>,
        defaults: &ParameterDefaults,
    ) -> Result<Self> {
        db.seed_defaults(defaults.entries())?;

        let status = Arc::new(watch::Sender::new(LoopStatus {
            state: LoopState::Idle,
            pump_active: false,
            cycles: 0,
            last_measurement_id: None,
        }));
        let observer: Arc<dyn LoopObserver> = Arc::new(TracingObserver);
        let options = LoopOptions::default();

        let worker = Worker {
            sink: Arc::new(db.clone()),
            store: db,
            source,
            engine: RulesEngine::new(),
            observer: Arc::clone(&observer),
            status: Arc::clone(&status),
            interval: LoopSettings::default().interval,
            pump_active: false,
            cycles: 0,
            last_measurement_id: None,
            max_persistence_failures: options.max_persistence_failures,
        };

        Ok(Self {
            worker: Some(worker),
            running: None,
            status,
            observer,
            stop_timeout: options.stop_timeout,
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn MeasurementSink>) -> Self {
        if let Some(worker) = self.worker.as_mut() {
            worker.sink = sink;
        }
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        if let Some(worker) = self.worker.as_mut() {
            worker.observer = Arc::clone(&observer);
        }
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: LoopOptions) -> Self {
        if let Some(worker) = self.worker.as_mut() {
            worker.max_persistence_failures = options.max_persistence_failures.max(1);
        }
        self.stop_timeout = options.stop_timeout;
        self
    }

    pub fn status(&self) -> LoopStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Spawns the loop task. Starting a running loop only emits
    /// [`LoopEvent::AlreadyRunning`].
    pub async fn start(&mut self) -> Result<()> {
        if let Some(running) = self.running.take() {
            if !running.handle.is_finished() {
                self.running = Some(running);
                self.observer.emit(&LoopEvent::AlreadyRunning);
                return Ok(());
            }
            // The task ended on its own (aborted after storage failures).
            self.reclaim(running.handle.await);
        }

        let worker = self.worker.take().ok_or(GreenhouseError::LoopAbandoned)?;

        let token = CancellationToken::new();
        let (commands, rx) = mpsc::unbounded_channel();

        self.status.send_modify(|s| s.state = LoopState::Running);
        let handle = tokio::spawn(worker.run(token.clone(), rx));

        self.running = Some(RunningLoop {
            token,
            commands,
            handle,
        });
        Ok(())
    }

    /// Signals the loop and waits up to the stop timeout for it to finish.
    pub async fn stop(&mut self) -> StopOutcome {
        let Some(running) = self.running.take() else {
            return StopOutcome::NotRunning;
        };

        self.status.send_modify(|s| s.state = LoopState::Stopping);
        running.token.cancel();
        let abort = running.handle.abort_handle();

        match tokio::time::timeout(self.stop_timeout, running.handle).await {
            Ok(joined) => {
                if self.reclaim(joined) {
                    StopOutcome::Stopped
                } else {
                    StopOutcome::Abandoned
                }
            }
            Err(_) => {
                abort.abort();
                self.status.send_modify(|s| s.state = LoopState::Idle);
                self.observer.emit(&LoopEvent::Abandoned);
                StopOutcome::Abandoned
            }
        }
    }

    /// Switches the pump off. While running the request is queued for the
    /// next cycle boundary; while idle it applies immediately.
    ///
    /// After an abandoned stop the worker is gone and the published status is
    /// the only pump state left, so it is forced off there.
    pub fn turn_pump_off(&mut self) {
        if let Some(running) = self.running.as_ref().filter(|r| !r.handle.is_finished()) {
            if running.commands.send(LoopCommand::PumpOff).is_ok() {
                return;
            }
        }
        if let Some(worker) = self.worker.as_mut() {
            worker.handle_command(LoopCommand::PumpOff);
            return;
        }

        let switched = self
            .status
            .send_if_modified(|s| std::mem::replace(&mut s.pump_active, false));
        if switched {
            self.observer.emit(&LoopEvent::PumpSwitched {
                active: false,
                manual: true,
            });
        }
    }

    fn reclaim(
        &mut self,
        joined: std::result::Result<Option<Worker>, tokio::task::JoinError>,
    ) -> bool {
        self.status.send_modify(|s| s.state = LoopState::Idle);
        match joined {
            Ok(Some(worker)) => {
                self.worker = Some(worker);
                true
            }
            Ok(None) => {
                self.observer.emit(&LoopEvent::Abandoned);
                false
            }
            Err(e) => {
                self.observer.emit(&LoopEvent::Crashed {
                    message: e.to_string(),
                });
                self.observer.emit(&LoopEvent::Abandoned);
                false
            }
        }
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.token.cancel();
        }
    }
}

impl Worker {
    /// Drives cycles until cancelled. Returns `None` when the worker was lost
    /// with its blocking cycle.
    async fn run(
        self,
        token: CancellationToken,
        mut commands: mpsc::UnboundedReceiver<LoopCommand>,
    ) -> Option<Self> {
        let mut worker = self;
        let observer = Arc::clone(&worker.observer);
        let status = Arc::clone(&worker.status);
        observer.emit(&LoopEvent::Started);
        let mut persistence_failures = 0u32;

        while !token.is_cancelled() {
            while let Ok(command) = commands.try_recv() {
                worker.handle_command(command);
            }

            let cycle_start = Instant::now();

            // Sensor reads and SQLite calls block; keep them off the runtime
            // threads so timers, including the stop timeout, keep running.
            let cycle = tokio::task::spawn_blocking(move || {
                let outcome = worker.run_cycle();
                if let Err(e) = &outcome {
                    worker.record_failure(e);
                }
                (worker, outcome)
            });
            let (returned, outcome) = match cycle.await {
                Ok(done) => done,
                Err(e) => {
                    observer.emit(&LoopEvent::Crashed {
                        message: e.to_string(),
                    });
                    status.send_modify(|s| s.state = LoopState::Idle);
                    return None;
                }
            };
            worker = returned;

            match outcome {
                Ok(()) => persistence_failures = 0,
                Err(e) => {
                    if e.is_persistence() {
                        persistence_failures += 1;
                        if persistence_failures >= worker.max_persistence_failures {
                            observer.emit(&LoopEvent::Aborted {
                                consecutive_failures: persistence_failures,
                            });
                            break;
                        }
                    }
                }
            }
            worker.publish();

            let remaining = worker.interval.saturating_sub(cycle_start.elapsed());
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(remaining) => {}
            }
        }

        status.send_modify(|s| s.state = LoopState::Idle);
        observer.emit(&LoopEvent::Stopped);
        Some(worker)
    }

    fn run_cycle(&mut self) -> Result<()> {
        let settings = self.store.load_loop_settings()?;
        self.interval = settings.interval;

        let sample = self.source.read(&settings.simulation)?;
        let captured_at = Utc::now();

        let decision = self
            .engine
            .evaluate(&sample, &settings.thresholds, self.pump_active);
        if let Some(active) = decision.pump_changed(self.pump_active) {
            self.observer.emit(&LoopEvent::PumpSwitched {
                active,
                manual: false,
            });
        }
        self.pump_active = decision.pump_active;

        let alert_count = decision.alerts.len();
        for draft in decision.alerts {
            let mut alert = draft.into_alert(captured_at);
            alert.id = Some(self.sink.append_alert(&alert)?);
            self.observer.emit(&LoopEvent::AlertRaised(alert));
        }

        let measurement = Measurement::captured_at(sample, self.pump_active, captured_at);
        let id = self.sink.append_measurement(&measurement)?;

        self.cycles += 1;
        self.last_measurement_id = Some(id);
        self.observer.emit(&LoopEvent::CycleCompleted {
            measurement_id: id,
            sample,
            pump_active: self.pump_active,
            alerts: alert_count,
        });

        Ok(())
    }

    fn record_failure(&self, error: &GreenhouseError) {
        let message = error.to_string();
        let alert_persisted = self.sink.append_alert(&Alert::error(message.clone())).is_ok();
        self.observer.emit(&LoopEvent::CycleFailed {
            message,
            alert_persisted,
        });
    }

    fn handle_command(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::PumpOff => {
                if self.pump_active {
                    self.pump_active = false;
                    self.observer.emit(&LoopEvent::PumpSwitched {
                        active: false,
                        manual: true,
                    });
                }
            }
        }
        self.publish();
    }

    fn publish(&self) {
        self.status.send_modify(|s| {
            s.pump_active = self.pump_active;
            s.cycles = self.cycles;
            s.last_measurement_id = self.last_measurement_id;
        });
    }
}
