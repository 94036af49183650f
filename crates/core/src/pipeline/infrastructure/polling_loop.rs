use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::pipeline::pipeline_controller::{PipelineController, TickOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    /// The controller stopped or lost its device.
    WentIdle,
    TickLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopSummary {
    pub ticks: usize,
    pub published: usize,
    pub skipped: usize,
    pub stop_reason: StopReason,
}

/// Drives `PipelineController::tick` on the calling thread at the
/// controller's poll interval.
///
/// Ticks never overlap: the next one starts no earlier than
/// `previous_start + interval`, and later if a tick overruns. The cancel
/// flag is only observed between ticks.
pub struct PollingLoop {
    cancelled: Arc<AtomicBool>,
    max_ticks: Option<usize>,
}

impl PollingLoop {
    pub fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled,
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: Option<usize>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn run(&self, controller: &mut PipelineController) -> LoopSummary {
        let mut ticks = 0;
        let mut published = 0;
        let mut skipped = 0;

        let stop_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if self.max_ticks.is_some_and(|max| ticks >= max) {
                break StopReason::TickLimit;
            }

            let started = Instant::now();
            let outcome = controller.tick();
            ticks += 1;
            match outcome {
                TickOutcome::Published(_) => published += 1,
                TickOutcome::Skipped => skipped += 1,
                TickOutcome::Idle | TickOutcome::DeviceLost => break StopReason::WentIdle,
            }

            let deadline = started + controller.poll_interval();
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        };

        log::debug!("Polling ended after {ticks} ticks: {stop_reason:?}");
        LoopSummary {
            ticks,
            published,
            skipped,
            stop_reason,
        }
    }
}
