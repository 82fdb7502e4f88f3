//! Pipeline Stages
//!
//! A stage's only externally invoked operation is `process`. Every call
//! fires "processing started", runs the stage logic, then fires
//! "processing completed" with the same event. Both fire when the logic
//! decides not to act; "completed" is skipped only when the logic errors.

use std::sync::Arc;

use super::observer::{ObserverId, ObserverList};
use crate::logic::error::GestureResult;

// ============================================================================
// TRAITS
// ============================================================================

/// Stage logic plugged into a `Stage`
pub trait PipelineStage<E>: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Transformation / decision logic for one event
    fn execute(&self, event: &E) -> GestureResult<()>;
}

/// Anything events can be routed to
pub trait EventSink<E>: Send + Sync {
    fn process(&self, event: &E) -> GestureResult<()>;
}

// ============================================================================
// STAGE
// ============================================================================

/// Stage logic wrapped with its pre/post observation hooks
pub struct Stage<E: 'static, S> {
    inner: S,
    started: ObserverList<E>,
    completed: ObserverList<E>,
}

impl<E: 'static, S: PipelineStage<E>> Stage<E, S> {
    pub fn new(inner: S) -> Self {
        log::debug!("Pipeline stage '{}' created", inner.name());
        Self {
            inner,
            started: ObserverList::new(),
            completed: ObserverList::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Observers fired before the stage logic runs
    pub fn started(&self) -> &ObserverList<E> {
        &self.started
    }

    /// Observers fired after the stage logic succeeded
    pub fn completed(&self) -> &ObserverList<E> {
        &self.completed
    }

    pub fn on_started<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.started.subscribe(callback)
    }

    pub fn on_completed<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.completed.subscribe(callback)
    }

    /// Run one event through the stage
    pub fn process(&self, event: &E) -> GestureResult<()> {
        // observer sets are fixed for the whole call
        let started = self.started.snapshot();
        let completed = self.completed.snapshot();

        started.notify(event);

        if let Err(e) = self.inner.execute(event) {
            log::warn!("Stage '{}' failed: {}", self.inner.name(), e);
            return Err(e);
        }

        completed.notify(event);
        Ok(())
    }
}

impl<E: 'static, S: PipelineStage<E>> EventSink<E> for Stage<E, S> {
    fn process(&self, event: &E) -> GestureResult<()> {
        Stage::process(self, event)
    }
}

// ============================================================================
// FAN-OUT
// ============================================================================

/// Ordered fan-out to downstream sinks
///
/// Stages hold a `Pipeline` only to route events; they do not own what
/// they route to beyond the shared reference.
pub struct Pipeline<E> {
    sinks: Vec<Arc<dyn EventSink<E>>>,
}

impl<E> Pipeline<E> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn connect(&mut self, sink: Arc<dyn EventSink<E>>) {
        self.sinks.push(sink);
    }

    pub fn with(mut self, sink: Arc<dyn EventSink<E>>) -> Self {
        self.connect(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver to every sink in order
    ///
    /// A failing sink does not stop delivery to the others; the first error
    /// is returned once all sinks have run.
    pub fn process(&self, event: &E) -> GestureResult<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.process(event) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<E> Default for Pipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventSink<E> for Pipeline<E> {
    fn process(&self, event: &E) -> GestureResult<()> {
        Pipeline::process(self, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::error::GestureError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
        act: bool,
        fail: AtomicBool,
    }

    impl PipelineStage<u32> for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn execute(&self, event: &u32) -> GestureResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GestureError::Stage {
                    stage: "recorder".to_string(),
                    reason: "boom".to_string(),
                });
            }
            if self.act {
                self.log.lock().push(format!("execute {}", event));
            }
            Ok(())
        }
    }

    fn stage(act: bool) -> (Stage<u32, Recorder>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stage = Stage::new(Recorder {
            log: Arc::clone(&log),
            act,
            fail: AtomicBool::new(false),
        });
        let started = Arc::clone(&log);
        stage.on_started(move |e| started.lock().push(format!("started {}", e)));
        let completed = Arc::clone(&log);
        stage.on_completed(move |e| completed.lock().push(format!("completed {}", e)));
        (stage, log)
    }

    #[test]
    fn test_hooks_wrap_execute_in_order() {
        let (stage, log) = stage(true);
        stage.process(&5).unwrap();
        assert_eq!(*log.lock(), vec!["started 5", "execute 5", "completed 5"]);
    }

    #[test]
    fn test_hooks_fire_when_stage_does_not_act() {
        let (stage, log) = stage(false);
        stage.process(&1).unwrap();
        stage.process(&2).unwrap();
        assert_eq!(
            *log.lock(),
            vec!["started 1", "completed 1", "started 2", "completed 2"]
        );
    }

    #[test]
    fn test_completed_skipped_on_failure() {
        let (stage, log) = stage(true);
        stage.inner().fail.store(true, Ordering::SeqCst);
        assert!(stage.process(&3).is_err());
        assert_eq!(*log.lock(), vec!["started 3"]);
    }

    #[test]
    fn test_pipeline_fan_out_continues_after_error() {
        let (good, good_log) = stage(true);
        let (bad, bad_log) = stage(true);
        bad.inner().fail.store(true, Ordering::SeqCst);

        let bad: Arc<dyn EventSink<u32>> = Arc::new(bad);
        let good: Arc<dyn EventSink<u32>> = Arc::new(good);
        let pipeline = Pipeline::new().with(bad).with(good);

        assert!(pipeline.process(&7).is_err());
        assert_eq!(*bad_log.lock(), vec!["started 7"]);
        assert_eq!(*good_log.lock(), vec!["started 7", "execute 7", "completed 7"]);
    }
}
