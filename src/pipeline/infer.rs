//! Multi-model inference with per-attempt timeout and ordered fallback.
//!
//! Candidates are tried strictly in configured order and the first success
//! wins; there is no scoring between models. Each attempt races the call
//! against a deadline while a progress tick reports elapsed time. All three
//! live on the attempt's stack frame, so whichever branch finishes the race,
//! the other two are dropped on the spot. A call that loses to the deadline is
//! dropped with them and its eventual result is never observed.
//!
//! ```text
//! A ──fail──▶ (1 s) ──▶ B ──timeout──▶ (1 s) ──▶ C ──ok──▶ reply
//! ```

use crate::config::ReviewConfig;
use crate::error::InferenceError;
use crate::platform::{InferenceResponse, InferenceService};
use crate::progress::ReviewProgressCallback;
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Per-attempt timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTiming {
    /// How long one model may take before it counts as failed.
    pub timeout: Duration,
    /// Period of the elapsed-time progress tick.
    pub tick: Duration,
    /// Pause between a failed candidate and the next one.
    pub fallback_delay: Duration,
}

impl Default for AttemptTiming {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            tick: Duration::from_secs(5),
            fallback_delay: Duration::from_secs(1),
        }
    }
}

/// The winning model's raw reply.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub model: String,
    /// 1-indexed position in the candidate list.
    pub position: usize,
    pub response: InferenceResponse,
    pub duration_ms: u64,
}

/// Drives the ordered candidate list against an [`InferenceService`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
    models: Vec<String>,
    timing: AttemptTiming,
}

impl Orchestrator {
    pub fn new(models: Vec<String>, timing: AttemptTiming) -> Self {
        Self { models, timing }
    }

    pub fn from_config(config: &ReviewConfig) -> Self {
        Self::new(
            config.models.clone(),
            AttemptTiming {
                timeout: config.attempt_timeout(),
                tick: config.progress_interval(),
                fallback_delay: config.fallback_delay(),
            },
        )
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Ask each candidate in turn for feedback on `file_path` until one
    /// answers.
    ///
    /// Only total exhaustion is an error; it carries the last candidate's
    /// failure.
    pub async fn run(
        &self,
        service: &dyn InferenceService,
        file_path: &str,
        prompt: &str,
        progress: &dyn ReviewProgressCallback,
    ) -> Result<ModelReply, InferenceError> {
        let total = self.models.len();
        let mut last_error: Option<InferenceError> = None;

        for (i, model) in self.models.iter().enumerate() {
            let position = i + 1;
            if i > 0 {
                progress.on_status("Trying alternative model...");
                sleep(self.timing.fallback_delay).await;
            }

            info!("Analyzing with {} ({}/{})", model, position, total);
            progress.on_model_start(model, position, total);
            progress.on_status(&format!("Analyzing with {model}... ({position}/{total})"));

            let started = Instant::now();
            match self.attempt(service, model, file_path, prompt, progress).await {
                Ok(response) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    info!("{} answered in {}ms", model, duration_ms);
                    return Ok(ModelReply {
                        model: model.clone(),
                        position,
                        response,
                        duration_ms,
                    });
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    progress.on_model_error(model, &e.to_string());
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) => Err(InferenceError::AllModelsFailed {
                attempts: total,
                last: Box::new(last),
            }),
            None => Err(InferenceError::NoCandidates),
        }
    }

    async fn attempt(
        &self,
        service: &dyn InferenceService,
        model: &str,
        file_path: &str,
        prompt: &str,
        progress: &dyn ReviewProgressCallback,
    ) -> Result<InferenceResponse, InferenceError> {
        let start = Instant::now();
        let call = service.feedback(file_path, prompt, model);
        tokio::pin!(call);

        let deadline = sleep(self.timing.timeout);
        tokio::pin!(deadline);

        let period = self.timing.tick.max(Duration::from_millis(1));
        let mut ticker = interval_at(start + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                outcome = &mut call => {
                    return outcome.map_err(|e| InferenceError::ModelFailed {
                        model: model.to_string(),
                        detail: e.to_string(),
                    });
                }
                _ = &mut deadline => {
                    return Err(InferenceError::Timeout {
                        model: model.to_string(),
                        secs: self.timing.timeout.as_secs(),
                    });
                }
                _ = ticker.tick() => {
                    let elapsed = start.elapsed();
                    debug!("{} still running after {:?}", model, elapsed);
                    progress.on_model_tick(model, elapsed);
                    progress.on_status(&format!(
                        "Analyzing with {model}... ({}s elapsed)",
                        elapsed.as_secs()
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Script {
        Ok { after: Duration, body: &'static str },
        Fail { after: Duration, detail: &'static str },
    }

    #[derive(Default)]
    struct ScriptedService {
        scripts: HashMap<String, Script>,
        calls: Mutex<Vec<String>>,
        /// Models whose call ran to completion (past its delay).
        settled: Mutex<Vec<String>>,
    }

    impl ScriptedService {
        fn with(mut self, model: &str, script: Script) -> Self {
            self.scripts.insert(model.to_string(), script);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn settled(&self) -> Vec<String> {
            self.settled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceService for ScriptedService {
        async fn feedback(
            &self,
            _file_path: &str,
            _prompt: &str,
            model: &str,
        ) -> Result<InferenceResponse, PlatformError> {
            self.calls.lock().unwrap().push(model.to_string());
            let script = self.scripts.get(model).cloned().unwrap_or(Script::Fail {
                after: Duration::ZERO,
                detail: "unscripted",
            });
            match script {
                Script::Ok { after, body } => {
                    sleep(after).await;
                    self.settled.lock().unwrap().push(model.to_string());
                    Ok(InferenceResponse::text(body))
                }
                Script::Fail { after, detail } => {
                    sleep(after).await;
                    Err(PlatformError::Inference(detail.to_string()))
                }
            }
        }
    }

    #[derive(Default)]
    struct Events {
        log: Mutex<Vec<String>>,
    }

    impl Events {
        fn take(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl ReviewProgressCallback for Events {
        fn on_status(&self, status: &str) {
            self.log.lock().unwrap().push(format!("status:{status}"));
        }
        fn on_model_start(&self, model: &str, position: usize, total: usize) {
            self.log
                .lock()
                .unwrap()
                .push(format!("start:{model}:{position}/{total}"));
        }
        fn on_model_tick(&self, model: &str, elapsed: Duration) {
            self.log
                .lock()
                .unwrap()
                .push(format!("tick:{model}:{}", elapsed.as_secs()));
        }
        fn on_model_error(&self, model: &str, _error: &str) {
            self.log.lock().unwrap().push(format!("error:{model}"));
        }
    }

    fn abc() -> Orchestrator {
        Orchestrator::new(
            vec!["a".into(), "b".into(), "c".into()],
            AttemptTiming::default(),
        )
    }

    fn fail_now(detail: &'static str) -> Script {
        Script::Fail {
            after: Duration::ZERO,
            detail,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_in_order_until_success() {
        let service = ScriptedService::default()
            .with("a", fail_now("a down"))
            .with("b", fail_now("b down"))
            .with("c", Script::Ok { after: Duration::ZERO, body: "{}" });
        let events = Events::default();
        let started = Instant::now();

        let reply = abc().run(&service, "/cv.png", "p", &events).await.unwrap();

        assert_eq!(reply.model, "c");
        assert_eq!(reply.position, 3);
        assert_eq!(service.calls(), vec!["a", "b", "c"]);
        // One fallback pause before b and one before c.
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        let starts: Vec<_> = events
            .take()
            .into_iter()
            .filter(|e| e.starts_with("start:"))
            .collect();
        assert_eq!(starts, vec!["start:a:1/3", "start:b:2/3", "start:c:3/3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_stops_the_loop() {
        let service = ScriptedService::default()
            .with("a", Script::Ok { after: Duration::from_secs(2), body: "first" })
            .with("b", Script::Ok { after: Duration::ZERO, body: "second" });
        let events = Events::default();

        let reply = abc().run(&service, "/cv.png", "p", &events).await.unwrap();

        assert_eq!(reply.model, "a");
        assert_eq!(reply.duration_ms, 2000);
        assert_eq!(service.calls(), vec!["a"]);
        assert!(!events.take().iter().any(|e| e.contains("alternative")));
    }

    #[tokio::test(start_paused = true)]
    async fn all_failing_wraps_the_last_error() {
        let service = ScriptedService::default()
            .with("a", fail_now("a down"))
            .with("b", fail_now("b down"))
            .with("c", fail_now("c down"));
        let started = Instant::now();

        let err = abc()
            .run(&service, "/cv.png", "p", &crate::progress::NoopProgressCallback)
            .await
            .unwrap_err();

        match err {
            InferenceError::AllModelsFailed { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.model(), Some("c"));
                assert!(last.to_string().contains("c down"));
            }
            other => panic!("expected AllModelsFailed, got {other:?}"),
        }
        // No pause after the final candidate.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(service.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_moves_on_and_ignores_late_result() {
        let service = ScriptedService::default()
            .with("a", Script::Ok { after: Duration::from_secs(90), body: "late" })
            .with("b", Script::Ok { after: Duration::from_secs(1), body: "on time" });
        let events = Events::default();
        let started = Instant::now();

        let reply = abc().run(&service, "/cv.png", "p", &events).await.unwrap();

        assert_eq!(reply.model, "b");
        assert_eq!(reply.response, InferenceResponse::text("on time"));
        // 60 s deadline, 1 s fallback pause, 1 s for b.
        assert_eq!(started.elapsed(), Duration::from_secs(62));
        assert!(events.take().contains(&"error:a".to_string()));

        // Run the clock past a's scheduled completion; its call was dropped
        // at the deadline and never settles.
        sleep(Duration::from_secs(120)).await;
        assert_eq!(service.calls(), vec!["a", "b"]);
        assert_eq!(service.settled(), vec!["b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_error_names_the_model() {
        let service = ScriptedService::default()
            .with("a", Script::Ok { after: Duration::from_secs(90), body: "late" });
        let single = Orchestrator::new(vec!["a".into()], AttemptTiming::default());

        let err = single
            .run(&service, "/cv.png", "p", &crate::progress::NoopProgressCallback)
            .await
            .unwrap_err();

        match err {
            InferenceError::AllModelsFailed { attempts, last } => {
                assert_eq!(attempts, 1);
                assert_eq!(last.to_string(), "Analysis timed out after 60 seconds with a");
            }
            other => panic!("expected AllModelsFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_report_elapsed_and_stop_with_the_attempt() {
        let service = ScriptedService::default()
            .with("a", Script::Ok { after: Duration::from_secs(12), body: "{}" });
        let events = Events::default();

        abc().run(&service, "/cv.png", "p", &events).await.unwrap();
        sleep(Duration::from_secs(30)).await;

        let log = events.take();
        let ticks: Vec<_> = log.iter().filter(|e| e.starts_with("tick:")).collect();
        assert_eq!(ticks, vec!["tick:a:5", "tick:a:10"]);
        assert!(log.contains(&"status:Analyzing with a... (10s elapsed)".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_candidate_list() {
        let service = ScriptedService::default();
        let none = Orchestrator::new(Vec::new(), AttemptTiming::default());
        let err = none
            .run(&service, "/cv.png", "p", &crate::progress::NoopProgressCallback)
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::NoCandidates));
        assert!(service.calls().is_empty());
    }
}
