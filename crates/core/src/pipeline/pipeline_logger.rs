use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for one swap request.
///
/// Use cases report stage durations, per-frame metrics and progress here so
/// the CLI, the service and tests can each decide what to do with them.
pub trait PipelineLogger: Send {
    /// Sampled frames finished so far out of `total`.
    fn progress(&mut self, current: usize, total: usize);

    /// Wall time of one named stage (decode, identity, dispatch, ...).
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// One observation of a named metric (e.g. faces swapped in a frame).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-request report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by the service and by tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logs progress through the `log` facade and keeps enough data for a
/// summary: stages in the order they ran, metrics as count/sum/max.
///
/// Progress lines are throttled to every `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    stages: Vec<(String, f64)>,
    metrics: BTreeMap<String, MetricStats>,
    started: Instant,
    sampled_frames: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricStats {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl MetricStats {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            stages: Vec::new(),
            metrics: BTreeMap::new(),
            started: Instant::now(),
            sampled_frames: 0,
        }
    }

    /// Total recorded time of `stage`, if it ran.
    pub fn stage_ms(&self, stage: &str) -> Option<f64> {
        let mut matching = self.stages.iter().filter(|(name, _)| name == stage).peekable();
        matching.peek()?;
        Some(matching.map(|(_, ms)| ms).sum())
    }

    pub fn metric_stats(&self, name: &str) -> Option<MetricStats> {
        self.metrics.get(name).copied()
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Swap summary ({} sampled frames, {:.1}s):",
            self.sampled_frames,
            elapsed_ms / 1000.0
        )];

        for (stage, ms) in &self.stages {
            lines.push(format!("  {stage:12}: {ms:8.1}ms"));
        }

        for (name, stats) in &self.metrics {
            lines.push(format!(
                "  {name}: total {:.0}, avg {:.1}, max {:.0}",
                stats.sum,
                stats.mean(),
                stats.max
            ));
        }

        if let Some(dispatch_ms) = self.stage_ms("dispatch") {
            if self.sampled_frames > 0 && dispatch_ms > 0.0 {
                let fps = self.sampled_frames as f64 / (dispatch_ms / 1000.0);
                lines.push(format!("  Inference throughput: {fps:.1} frames/s"));
            }
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.sampled_frames = total;
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Swapping: {current}/{total} sampled frames ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        log::debug!("Stage {stage} took {duration_ms:.1}ms");
        self.stages.push((stage.to_string(), duration_ms));
    }

    fn metric(&mut self, name: &str, value: f64) {
        let stats = self.metrics.entry(name.to_string()).or_default();
        stats.max = if stats.count == 0 {
            value
        } else {
            stats.max.max(value)
        };
        stats.count += 1;
        stats.sum += value;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
