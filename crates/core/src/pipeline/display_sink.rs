use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use super::frame_pipeline::PipelineOutput;

const DEFAULT_CHANNEL_CAPACITY: usize = 2;

/// Receives each published tick. Must not block the pipeline.
pub trait DisplaySink: Send {
    fn publish(&self, output: &PipelineOutput);
}

/// Hands outputs to another thread over a bounded channel.
///
/// When the consumer falls behind the newest output is dropped rather than
/// stalling the tick. Every drop is logged and counted.
pub struct ChannelDisplaySink {
    tx: Sender<PipelineOutput>,
    dropped: Arc<AtomicUsize>,
}

impl ChannelDisplaySink {
    pub fn new() -> (Self, Receiver<PipelineOutput>) {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, Receiver<PipelineOutput>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        let sink = Self {
            tx,
            dropped: Arc::new(AtomicUsize::new(0)),
        };
        (sink, rx)
    }

    /// Shared count of outputs that never reached the receiver.
    pub fn dropped_counter(&self) -> Arc<AtomicUsize> {
        self.dropped.clone()
    }
}

impl DisplaySink for ChannelDisplaySink {
    fn publish(&self, output: &PipelineOutput) {
        match self.tx.try_send(output.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Display busy, dropped frame {}", output.frame_index);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Display receiver gone, dropped frame {}", output.frame_index);
            }
        }
    }
}
