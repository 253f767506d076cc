use tracing::info;

/// Receives progress updates from a running job
///
/// Called synchronously from the job's own thread at fixed checkpoints;
/// `fraction` is always within `0.0..=1.0`.
pub trait ProgressObserver {
    fn report(&mut self, fraction: f32, phase: &str);
}

/// Discards all progress updates
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn report(&mut self, _fraction: f32, _phase: &str) {}
}

/// Logs progress updates through `tracing`
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn report(&mut self, fraction: f32, phase: &str) {
        info!("[{:>3.0}%] {}", fraction * 100.0, phase);
    }
}

/// Adapts a closure into a [`ProgressObserver`]
pub struct FnProgress<F>(pub F);

impl<F: FnMut(f32, &str)> ProgressObserver for FnProgress<F> {
    fn report(&mut self, fraction: f32, phase: &str) {
        (self.0)(fraction, phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_checkpoints(observer: &mut dyn ProgressObserver) {
        observer.report(0.0, "Starting...");
        observer.report(0.5, "Halfway");
        observer.report(1.0, "Done");
    }

    #[test]
    fn test_closure_observer_sees_every_update() {
        let mut seen = Vec::new();
        run_checkpoints(&mut FnProgress(|fraction: f32, phase: &str| {
            seen.push((fraction, phase.to_string()));
        }));

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1], (0.5, "Halfway".to_string()));
    }

    #[test]
    fn test_silent_and_logging_observers_accept_updates() {
        run_checkpoints(&mut NoProgress);
        run_checkpoints(&mut LogProgress);
    }
}
