//! The sentry loop: poll the motion sensor, capture on motion, repeat.
//!
//! [`Sentry`] owns the motion input and the camera for as long as it runs.
//! Each poll reads the sensor once. A HIGH reading logs a detection, takes
//! one capture named after the wall-clock time, and then waits out the
//! debounce interval so sustained motion does not produce a burst of
//! captures. A LOW reading waits one poll interval.
//!
//! Read and capture failures are logged and counted; they never stop the
//! loop. The loop only ends when its [`CancellationToken`] is cancelled, after
//! which the devices are dropped and released.

use crate::camera::{Camera, CaptureNamer, TIME_FORMAT};
use crate::clock::{Clock, SystemClock};
use crate::config::LoopConfig;
use crate::sensors::MotionInput;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Counters kept while the loop runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentryStats {
    /// Sensor reads attempted.
    pub polls: u64,
    /// HIGH readings.
    pub detections: u64,
    /// Captures written to disk.
    pub captures: u64,
    pub capture_failures: u64,
    pub read_failures: u64,
    pub last_capture: Option<PathBuf>,
}

pub struct Sentry<I, C, K = SystemClock> {
    input: I,
    camera: C,
    clock: K,
    namer: CaptureNamer,
    timing: LoopConfig,
    stats: SentryStats,
}

impl<I, C> Sentry<I, C, SystemClock>
where
    I: MotionInput,
    C: Camera,
{
    pub fn new(input: I, camera: C, namer: CaptureNamer, timing: LoopConfig) -> Self {
        Self::with_clock(input, camera, SystemClock, namer, timing)
    }
}

impl<I, C, K> Sentry<I, C, K>
where
    I: MotionInput,
    C: Camera,
    K: Clock,
{
    pub fn with_clock(
        input: I,
        camera: C,
        clock: K,
        namer: CaptureNamer,
        timing: LoopConfig,
    ) -> Self {
        Self {
            input,
            camera,
            clock,
            namer,
            timing,
            stats: SentryStats::default(),
        }
    }

    pub fn stats(&self) -> &SentryStats {
        &self.stats
    }

    /// Run until `cancel` fires, then release the devices and return the stats.
    pub async fn run(mut self, cancel: CancellationToken) -> SentryStats {
        log::info!(
            "Watching {} (poll every {:?}, debounce {:?}), saving to {}",
            self.input.describe(),
            self.timing.poll_interval(),
            self.timing.debounce(),
            self.namer.dir().display()
        );

        while !cancel.is_cancelled() {
            let wait = self.poll_once().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        let stats = std::mem::take(&mut self.stats);
        log::info!(
            "Sentry stopped after {} polls: {} detections, {} captures, {} capture failures, {} read failures",
            stats.polls,
            stats.detections,
            stats.captures,
            stats.capture_failures,
            stats.read_failures
        );
        stats
    }

    /// Read the sensor once, capture if it is HIGH, and return how long to
    /// wait before the next poll.
    pub async fn poll_once(&mut self) -> Duration {
        self.stats.polls += 1;

        let level = match self.input.read() {
            Ok(level) => level,
            Err(e) => {
                self.stats.read_failures += 1;
                log::warn!("{}; retrying", e);
                return self.timing.poll_interval();
            }
        };
        let now = self.clock.now();

        if !level.is_high() {
            return self.timing.poll_interval();
        }

        self.stats.detections += 1;
        log::info!("Intruder detected at {}", now.format(TIME_FORMAT));

        let path = self.namer.next_path(now).await;
        match self.camera.capture(&path).await {
            Ok(()) => {
                self.stats.captures += 1;
                log::info!("Saved {}", path.display());
                self.stats.last_capture = Some(path);
            }
            Err(e) => {
                self.stats.capture_failures += 1;
                log::error!("{}", e);
            }
        }

        self.timing.debounce()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SentryError};
    use crate::input::simulation::SimulatedMotion;
    use crate::sensors::Level::{self, High, Low};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Arc;
    use tokio::time::Instant;

    const POLL: Duration = Duration::from_millis(50);
    const DEBOUNCE: Duration = Duration::from_secs(2);

    fn timing() -> LoopConfig {
        LoopConfig {
            poll_interval_ms: POLL.as_millis() as u64,
            debounce_ms: DEBOUNCE.as_millis() as u64,
        }
    }

    fn namer() -> CaptureNamer {
        CaptureNamer::new("/home/pi/Pictures", "Img")
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    /// Wall clock that moves with tokio's (paused) clock.
    struct VirtualClock {
        base: NaiveDateTime,
        start: Instant,
    }

    impl VirtualClock {
        fn starting_at(base: NaiveDateTime) -> Self {
            Self {
                base,
                start: Instant::now(),
            }
        }
    }

    impl Clock for VirtualClock {
        fn now(&self) -> NaiveDateTime {
            let elapsed = TimeDelta::from_std(self.start.elapsed()).unwrap();
            self.base + elapsed
        }
    }

    /// Camera that records capture paths instead of writing files.
    #[derive(Clone, Default)]
    struct RecordingCamera {
        captures: Arc<Mutex<Vec<PathBuf>>>,
        fail: bool,
    }

    impl RecordingCamera {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn captured(&self) -> Vec<PathBuf> {
            self.captures.lock().clone()
        }
    }

    #[async_trait]
    impl Camera for RecordingCamera {
        async fn capture(&mut self, path: &Path) -> Result<()> {
            self.captures.lock().push(path.to_path_buf());
            if self.fail {
                Err(SentryError::Capture("No space left on device".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Input that replays readings and records when each read happened.
    struct ScriptedInput {
        readings: VecDeque<Result<Level>>,
        reads: Arc<Mutex<Vec<(Instant, Level)>>>,
    }

    impl ScriptedInput {
        fn new(readings: impl IntoIterator<Item = Result<Level>>) -> Self {
            Self {
                readings: readings.into_iter().collect(),
                reads: Arc::default(),
            }
        }
    }

    impl MotionInput for ScriptedInput {
        fn read(&mut self) -> Result<Level> {
            let reading = self.readings.pop_front().unwrap_or(Ok(Low));
            if let Ok(level) = &reading {
                self.reads.lock().push((Instant::now(), *level));
            }
            reading
        }

        fn describe(&self) -> String {
            "scripted input".to_string()
        }
    }

    async fn run_for<I, C, K>(sentry: Sentry<I, C, K>, duration: Duration) -> SentryStats
    where
        I: MotionInput + 'static,
        C: Camera + 'static,
        K: Clock + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sentry.run(cancel.clone()));
        tokio::time::sleep(duration).await;
        cancel.cancel();
        handle.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_readings_never_capture() {
        let camera = RecordingCamera::default();
        let input = SimulatedMotion::sequence([Low; 20]);
        let sentry = Sentry::with_clock(
            input,
            camera.clone(),
            VirtualClock::starting_at(noon()),
            namer(),
            timing(),
        );

        let stats = run_for(sentry, Duration::from_secs(1)).await;

        assert!(camera.captured().is_empty());
        assert_eq!(stats.detections, 0);
        assert!(stats.polls >= 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_capture_per_high_reading() {
        let camera = RecordingCamera::default();
        let input = SimulatedMotion::sequence([High, Low, High, High, Low]);
        let sentry = Sentry::with_clock(
            input,
            camera.clone(),
            VirtualClock::starting_at(noon()),
            namer(),
            timing(),
        );

        let stats = run_for(sentry, Duration::from_secs(10)).await;

        assert_eq!(camera.captured().len(), 3);
        assert_eq!(stats.detections, 3);
        assert_eq!(stats.captures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_with_single_detection() {
        // Reads at t0, t0+50ms, t0+100ms, t0+150ms; the wall clock crosses
        // into 12:01:00 between the first and second read.
        let base = noon() + TimeDelta::milliseconds(59_950);
        let camera = RecordingCamera::default();
        let input = SimulatedMotion::sequence([Low, Low, High, Low]);
        let sentry = Sentry::with_clock(
            input,
            camera.clone(),
            VirtualClock::starting_at(base),
            namer(),
            timing(),
        );

        let stats = run_for(sentry, Duration::from_secs(5)).await;

        assert_eq!(
            camera.captured(),
            vec![PathBuf::from("/home/pi/Pictures/Img 12:01:00.jpg")]
        );
        assert_eq!(stats.captures, 1);
        assert_eq!(
            stats.last_capture,
            Some(PathBuf::from("/home/pi/Pictures/Img 12:01:00.jpg"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_motion_within_debounce_captures_once() {
        // HIGH for long enough to cover ten polls, but shorter than the debounce.
        let camera = RecordingCamera::default();
        let input = SimulatedMotion::high_for(POLL * 10);
        let sentry = Sentry::with_clock(
            input,
            camera.clone(),
            VirtualClock::starting_at(noon()),
            namer(),
            timing(),
        );

        let stats = run_for(sentry, Duration::from_secs(5)).await;

        assert_eq!(camera.captured().len(), 1);
        assert_eq!(stats.detections, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_delays_next_read() {
        let input = ScriptedInput::new([Ok(High), Ok(Low), Ok(Low)]);
        let reads = input.reads.clone();
        let sentry = Sentry::with_clock(
            input,
            RecordingCamera::default(),
            VirtualClock::starting_at(noon()),
            namer(),
            timing(),
        );

        run_for(sentry, Duration::from_secs(3)).await;

        let reads = reads.lock().clone();
        assert!(reads.len() >= 3);
        assert_eq!(reads[0].1, High);
        assert!(reads[1].0 - reads[0].0 >= DEBOUNCE);
        let idle_gap = reads[2].0 - reads[1].0;
        assert!(idle_gap >= POLL && idle_gap < DEBOUNCE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_captures_in_different_seconds_get_different_names() {
        let camera = RecordingCamera::default();
        let input = SimulatedMotion::sequence([High, High]);
        let sentry = Sentry::with_clock(
            input,
            camera.clone(),
            VirtualClock::starting_at(noon()),
            namer(),
            timing(),
        );

        run_for(sentry, Duration::from_secs(5)).await;

        let captured = camera.captured();
        assert_eq!(
            captured,
            vec![
                PathBuf::from("/home/pi/Pictures/Img 12:00:00.jpg"),
                PathBuf::from("/home/pi/Pictures/Img 12:00:02.jpg"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failure_keeps_polling() {
        let camera = RecordingCamera::failing();
        let input = SimulatedMotion::sequence([High, Low, Low, High]);
        let sentry = Sentry::with_clock(
            input,
            camera.clone(),
            VirtualClock::starting_at(noon()),
            namer(),
            timing(),
        );

        let stats = run_for(sentry, Duration::from_secs(10)).await;

        // Both detections were attempted; neither produced a file.
        assert_eq!(camera.captured().len(), 2);
        assert_eq!(stats.detections, 2);
        assert_eq!(stats.captures, 0);
        assert_eq!(stats.capture_failures, 2);
        assert_eq!(stats.last_capture, None);
        assert!(stats.polls > 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_keeps_polling() {
        let camera = RecordingCamera::default();
        let input = SimulatedMotion::sequence([High]).failing_first(3);
        let sentry = Sentry::with_clock(
            input,
            camera.clone(),
            VirtualClock::starting_at(noon()),
            namer(),
            timing(),
        );

        let stats = run_for(sentry, Duration::from_secs(1)).await;

        assert_eq!(stats.read_failures, 3);
        assert_eq!(stats.captures, 1);
        assert_eq!(camera.captured().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_debounce() {
        let sentry = Sentry::with_clock(
            SimulatedMotion::sequence([High]),
            RecordingCamera::default(),
            VirtualClock::starting_at(noon()),
            namer(),
            timing(),
        );

        let start = Instant::now();
        let stats = run_for(sentry, Duration::from_millis(500)).await;

        assert_eq!(stats.captures, 1);
        assert!(start.elapsed() < DEBOUNCE);
    }

    #[tokio::test]
    async fn test_already_cancelled_never_polls() {
        let camera = RecordingCamera::default();
        let sentry = Sentry::new(SimulatedMotion::sequence([High]), camera.clone(), namer(), timing());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = sentry.run(cancel).await;

        assert_eq!(stats, SentryStats::default());
        assert!(camera.captured().is_empty());
    }

    #[tokio::test]
    async fn test_poll_once_returns_next_wait() {
        let mut sentry = Sentry::new(
            SimulatedMotion::sequence([Low, High]),
            RecordingCamera::default(),
            namer(),
            timing(),
        );

        assert_eq!(sentry.poll_once().await, POLL);
        assert_eq!(sentry.poll_once().await, DEBOUNCE);
        assert_eq!(sentry.stats().polls, 2);
        assert_eq!(sentry.stats().captures, 1);
    }
}
