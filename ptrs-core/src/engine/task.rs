//! Background task handle: run any engine job off the caller's thread.
//!
//! The caller keeps a handle exposing progress and cancellation; the job
//! receives the shared [`RunControl`] and must thread it into every engine
//! call it makes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::SimError;

use super::control::RunControl;

/// Handle to a job running on its own thread.
#[derive(Debug)]
pub struct SimulationTask<T> {
    control: Arc<RunControl>,
    handle: JoinHandle<Result<T, SimError>>,
}

impl<T: Send + 'static> SimulationTask<T> {
    /// Spawn `job` on a new thread.
    ///
    /// ```
    /// use ptrs_core::domain::ComponentUncertainty;
    /// use ptrs_core::engine::{SimulationConfig, SimulationEngine, SimulationTask};
    ///
    /// let components = vec![ComponentUncertainty::new("a", 50.0, 40.0, 60.0, 1.0)];
    /// let config = SimulationConfig::seeded(2_000, 7);
    /// let task = SimulationTask::spawn(move |control| {
    ///     SimulationEngine::new().run_with_control(&components, &config, control)
    /// });
    /// let out = task.join().unwrap();
    /// assert_eq!(out.composite.len(), 2_000);
    /// ```
    pub fn spawn<F>(job: F) -> Self
    where
        F: FnOnce(&RunControl) -> Result<T, SimError> + Send + 'static,
    {
        let control = Arc::new(RunControl::new());
        let shared = Arc::clone(&control);
        let handle = thread::spawn(move || job(&shared));
        Self { control, handle }
    }

    /// Fraction of registered work completed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.control.fraction()
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn control(&self) -> Arc<RunControl> {
        Arc::clone(&self.control)
    }

    /// Wait for the job. A panicking job surfaces as `SimError::TaskFailed`.
    pub fn join(self) -> Result<T, SimError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(SimError::TaskFailed(msg))
            }
        }
    }
}
