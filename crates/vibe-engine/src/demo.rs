use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use vibe_contracts::models::ScenarioType;

use crate::client::StreamOutcome;
use crate::store::VibeStore;

pub const DEMO_SCENARIOS: [ScenarioType; 3] = [
    ScenarioType::LateNightReturn,
    ScenarioType::WeekendFamilyTrip,
    ScenarioType::MorningCommute,
];
pub const DEFAULT_SCENARIO_PAUSE: Duration = Duration::from_secs(3);

/// Stops a running demo from any thread, waking it out of its pause.
#[derive(Debug, Clone, Default)]
pub struct DemoStop {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl DemoStop {
    pub fn is_stopped(&self) -> bool {
        self.inner.0.lock().map(|stopped| *stopped).unwrap_or(true)
    }

    fn reset(&self) {
        if let Ok(mut stopped) = self.inner.0.lock() {
            *stopped = false;
        }
    }

    fn raise(&self) {
        if let Ok(mut stopped) = self.inner.0.lock() {
            *stopped = true;
        }
        self.inner.1.notify_all();
    }

    /// Sleeps for `pause` unless stopped first. Returns true when stopped.
    fn wait(&self, pause: Duration) -> bool {
        let (lock, signal) = &*self.inner;
        let Ok(stopped) = lock.lock() else {
            return true;
        };
        match signal.wait_timeout_while(stopped, pause, |stopped| !*stopped) {
            Ok((stopped, _)) => *stopped,
            Err(_) => true,
        }
    }
}

/// Plays the canned scenarios one after another through the store.
pub struct DemoRunner {
    store: Arc<VibeStore>,
    scenarios: Vec<ScenarioType>,
    pause: Duration,
    stop: DemoStop,
    running: AtomicBool,
}

/// Handle returned by [`DemoRunner::stop_handle`].
#[derive(Clone)]
pub struct DemoControl {
    store: Arc<VibeStore>,
    stop: DemoStop,
}

impl DemoControl {
    /// Ends the loop and the analysis in flight; the demo flag drops at once.
    pub fn stop(&self) {
        self.stop.raise();
        self.store.cancel_stream();
        self.store.set_demo_mode(false);
    }
}

impl DemoRunner {
    pub fn new(store: Arc<VibeStore>) -> Self {
        Self {
            store,
            scenarios: DEMO_SCENARIOS.to_vec(),
            pause: DEFAULT_SCENARIO_PAUSE,
            stop: DemoStop::default(),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_scenarios(mut self, scenarios: Vec<ScenarioType>) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn stop_handle(&self) -> DemoControl {
        DemoControl {
            store: self.store.clone(),
            stop: self.stop.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn run(&self) -> usize {
        self.run_with(|_, _| {})
    }

    /// Runs every scenario in order and returns how many analyses completed.
    ///
    /// A failing scenario is logged and skipped. A second call while one is
    /// running returns 0 immediately.
    pub fn run_with<F>(&self, mut on_scenario: F) -> usize
    where
        F: FnMut(usize, ScenarioType),
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return 0;
        }
        self.stop.reset();
        self.store.set_demo_mode(true);

        let mut completed = 0;
        for (index, scenario) in self.scenarios.iter().copied().enumerate() {
            if self.stop.is_stopped() {
                break;
            }
            on_scenario(index, scenario);
            log::info!("demo scenario {}: {}", index + 1, scenario.label());
            match self.store.load_scenario(scenario) {
                Ok(_) => {
                    if self.store.analyze_stream() == Some(StreamOutcome::Completed) {
                        completed += 1;
                    }
                }
                Err(err) => log::error!("demo scenario {} failed: {err:#}", scenario.as_str()),
            }
            let last = index + 1 == self.scenarios.len();
            if !last && self.stop.wait(self.pause) {
                break;
            }
        }

        self.store.set_demo_mode(false);
        self.running.store(false, Ordering::SeqCst);
        completed
    }
}
