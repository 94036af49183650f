use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for per-tick pipeline events.
///
/// Keeps the tick code free of any particular reporting mechanism; the
/// host decides whether timings go to the log, a UI or nowhere.
pub trait PipelineLogger: Send {
    /// A tick ran to completion and published its output.
    fn tick(&mut self, frame_index: usize);

    /// Record how long a named stage took within one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. detection count).
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn tick(&mut self, _frame_index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// Running aggregate of one named series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
    pub last: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 { value } else { self.max.max(value) };
        self.count += 1;
        self.sum += value;
        self.last = value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Aggregates stage timings and metrics, logs a heartbeat every
/// `report_every` published ticks and a summary at the end.
/// Only per-key aggregates are kept, never individual samples.
pub struct StatsPipelineLogger {
    report_every: usize,
    timings: BTreeMap<String, SeriesStats>,
    metrics: BTreeMap<String, SeriesStats>,
    start_time: Instant,
    ticks: usize,
}

impl StatsPipelineLogger {
    pub fn new(report_every: usize) -> Self {
        Self {
            report_every: report_every.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// The formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({} ticks, {:.1}s total):",
            self.ticks,
            elapsed_ms / 1000.0
        )];

        for (stage, stats) in &self.timings {
            let total_ms = stats.sum;
            let avg_ms = stats.mean();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        for (name, stats) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.1}  max {:.0}",
                stats.mean(),
                stats.max
            ));
        }

        if self.ticks > 0 && elapsed_ms > 0.0 {
            let rate = self.ticks as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.1} ticks/s"));
        }

        Some(lines.join("\n"))
    }

    pub fn timing_stats(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    pub fn metric_stats(&self, name: &str) -> Option<SeriesStats> {
        self.metrics.get(name).copied()
    }
}

impl Default for StatsPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn tick(&mut self, frame_index: usize) {
        self.ticks += 1;
        if self.ticks % self.report_every == 0 {
            let last = self
                .metrics
                .get("detections")
                .map_or(0.0, |stats| stats.last);
            log::info!(
                "{} ticks published (frame {frame_index}, {last:.0} detections)",
                self.ticks
            );
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.tick(1);
        logger.timing("detect", 5.0);
        logger.metric("detections", 3.0);
        logger.summary();
    }

    #[test]
    fn test_timing_aggregates_values() {
        let mut logger = StatsPipelineLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("scale", 5.0);

        let detect = logger.timing_stats("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_relative_eq!(detect.sum, 50.0);
        assert_relative_eq!(detect.max, 30.0);
        assert_relative_eq!(detect.last, 30.0);
        assert_eq!(logger.timing_stats("scale").unwrap().count, 1);
        assert!(logger.timing_stats("publish").is_none());
    }

    #[test]
    fn test_metric_average() {
        let mut logger = StatsPipelineLogger::new(10);
        logger.metric("detections", 3.0);
        logger.metric("detections", 4.0);

        let stats = logger.metric_stats("detections").unwrap();
        assert_relative_eq!(stats.mean(), 3.5);
    }

    #[test]
    fn test_negative_series_max_is_not_clamped_to_zero() {
        let mut logger = StatsPipelineLogger::new(10);
        logger.metric("offset", -4.0);
        logger.metric("offset", -2.0);

        assert_relative_eq!(logger.metric_stats("offset").unwrap().max, -2.0);
    }

    #[test]
    fn test_long_session_keeps_aggregates_only() {
        let mut logger = StatsPipelineLogger::new(1_000_000);
        for i in 0..100_000 {
            logger.tick(i);
            logger.timing("detect", 2.0);
            logger.metric("detections", (i % 3) as f64);
        }

        let detect = logger.timing_stats("detect").unwrap();
        assert_eq!(detect.count, 100_000);
        assert_relative_eq!(detect.mean(), 2.0);
        assert_relative_eq!(logger.metric_stats("detections").unwrap().max, 2.0);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StatsPipelineLogger::new(10);
        logger.tick(0);
        logger.timing("acquire", 2.0);
        logger.timing("detect", 20.0);
        logger.metric("detections", 2.0);
        logger.metric("detections", 5.0);

        let summary = logger.summary_string().unwrap();

        assert!(summary.contains("Pipeline summary (1 ticks"));
        assert!(summary.contains("acquire"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("avg 3.5  max 5"));
        assert!(summary.contains("ticks/s"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StatsPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_tick_counts() {
        let mut logger = StatsPipelineLogger::new(3);
        for i in 0..7 {
            logger.tick(i);
        }
        assert_eq!(logger.ticks(), 7);
    }

    #[test]
    fn test_report_interval_is_at_least_one() {
        let logger = StatsPipelineLogger::new(0);
        assert_eq!(logger.report_every, 1);
        assert_eq!(StatsPipelineLogger::default().report_every, 100);
    }
}
