//! Inbound interfaces between the agent pipeline and the status display.
//!
//! Producers (speech recognition, dialogue, camera capture, audio analysis)
//! hold a cloneable [`FeedHandle`] and never block. The render thread owns the
//! single [`FeedReceiver`] and drains it once per tick. Log lines, triggers and
//! silence updates travel through one ordered channel so each producer's calls
//! arrive in the order they were made; spectrum and camera frames use
//! latest-value slots instead of queues.

mod camera;
mod entry;
mod slot;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

pub use camera::{CameraClaim, CameraFrame};
pub use entry::{LogEntry, Severity};
pub use slot::LatestSlot;

use camera::CameraShared;

/// Number of silence frames after which speech capture ends.
pub const SILENCE_FRAMES_MAX: u32 = 20;

/// Named lifecycle signals fired by the dialogue pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Wake word detected.
    Wake,
    /// A reply is being generated.
    Think,
    /// A memory was written to long-term storage.
    SaveMemory,
}

/// Ordered events delivered to the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Log(LogEntry),
    Trigger(Trigger),
    /// Frames of silence counted so far, `0..=SILENCE_FRAMES_MAX`.
    SilenceProgress(u32),
}

/// Latest magnitude spectrum, positive-frequency half only.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    pub bins: Vec<f32>,
    pub sample_rate: u32,
}

impl SpectrumFrame {
    pub fn is_silent(&self) -> bool {
        self.bins.iter().all(|value| *value == 0.0)
    }
}

/// Error conditions surfaced by the feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("display feed receiver has been dropped")]
    Disconnected,
    #[error("camera feed is already claimed by another reader")]
    CameraAlreadyClaimed,
    #[error("camera frame {width}x{height} needs {expected} bytes but got {actual}")]
    FrameSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Default)]
struct Shared {
    /// Last log sequence number handed out. Held while the entry is sent.
    log_seq: Mutex<u64>,
    spectrum: LatestSlot<SpectrumFrame>,
    camera: Arc<CameraShared>,
    shutdown: AtomicBool,
}

/// Create a connected producer handle and render-side receiver.
pub fn feed() -> (FeedHandle, FeedReceiver) {
    let (tx, rx) = mpsc::channel();
    let shared = Arc::new(Shared::default());
    (
        FeedHandle {
            tx,
            shared: Arc::clone(&shared),
        },
        FeedReceiver { rx, shared },
    )
}

/// Producer side. Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    tx: Sender<FeedEvent>,
    shared: Arc<Shared>,
}

impl FeedHandle {
    pub fn push_log(
        &self,
        source: impl Into<String>,
        text: impl Into<String>,
        severity: impl Into<Severity>,
    ) -> Result<(), FeedError> {
        let entry = LogEntry::new(source, text, severity.into());
        let mut seq = self
            .shared
            .log_seq
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *seq += 1;
        self.send(FeedEvent::Log(entry.with_seq(*seq)))
    }

    pub fn trigger(&self, trigger: Trigger) -> Result<(), FeedError> {
        self.send(FeedEvent::Trigger(trigger))
    }

    pub fn trigger_wake(&self) -> Result<(), FeedError> {
        self.trigger(Trigger::Wake)
    }

    pub fn trigger_think(&self) -> Result<(), FeedError> {
        self.trigger(Trigger::Think)
    }

    pub fn trigger_save_memory(&self) -> Result<(), FeedError> {
        self.trigger(Trigger::SaveMemory)
    }

    pub fn set_silence_progress(&self, frames: u32) -> Result<(), FeedError> {
        self.send(FeedEvent::SilenceProgress(frames.min(SILENCE_FRAMES_MAX)))
    }

    pub fn publish_spectrum(&self, bins: Vec<f32>, sample_rate: u32) {
        self.shared
            .spectrum
            .publish(SpectrumFrame { bins, sample_rate });
    }

    /// Mark the spectrum as absent (device lost or stopped).
    pub fn clear_spectrum(&self) {
        self.shared.spectrum.clear();
    }

    pub fn publish_camera_frame(&self, frame: CameraFrame) {
        self.shared.camera.frames.publish(frame);
    }

    /// Capture size most recently requested by the display, if any.
    pub fn requested_camera_resolution(&self) -> Option<(u32, u32)> {
        self.shared.camera.requested_resolution()
    }

    pub fn request_shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    fn send(&self, event: FeedEvent) -> Result<(), FeedError> {
        self.tx.send(event).map_err(|_| FeedError::Disconnected)
    }
}

/// Render-thread side of the feed.
#[derive(Debug)]
pub struct FeedReceiver {
    rx: Receiver<FeedEvent>,
    shared: Arc<Shared>,
}

impl FeedReceiver {
    /// Take every event queued since the last drain, in arrival order.
    pub fn drain(&self) -> Vec<FeedEvent> {
        self.rx.try_iter().collect()
    }

    pub fn latest_spectrum(&self) -> Option<Arc<SpectrumFrame>> {
        self.shared.spectrum.latest()
    }

    pub fn spectrum_generation(&self) -> u64 {
        self.shared.spectrum.generation()
    }

    pub fn claim_camera(&self) -> Result<CameraClaim, FeedError> {
        self.shared.camera.claim()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod feed_tests {
    use super::*;

    #[test]
    fn events_drain_in_push_order() {
        let (handle, receiver) = feed();
        handle.push_log("STT", "hello", "INFO").expect("push");
        handle.trigger_think().expect("trigger");
        handle.set_silence_progress(42).expect("silence");

        let events = receiver.drain();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], FeedEvent::Log(entry) if entry.text == "hello"));
        assert_eq!(events[1], FeedEvent::Trigger(Trigger::Think));
        assert_eq!(events[2], FeedEvent::SilenceProgress(SILENCE_FRAMES_MAX));
        assert!(receiver.drain().is_empty());
    }

    #[test]
    fn log_sequence_is_shared_between_clones() {
        let (first, receiver) = feed();
        let second = first.clone();
        first.push_log("STT", "one", Severity::User).expect("push");
        second.push_log("LLM", "two", Severity::Tars).expect("push");
        second.trigger_wake().expect("trigger");
        first.push_log("STT", "three", Severity::User).expect("push");

        let seqs: Vec<u64> = receiver
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                FeedEvent::Log(entry) => Some(entry.seq),
                _ => None,
            })
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn push_after_receiver_drop_reports_disconnect() {
        let (handle, receiver) = feed();
        drop(receiver);
        assert!(matches!(
            handle.push_log("LLM", "hi", Severity::System),
            Err(FeedError::Disconnected)
        ));
    }

    #[test]
    fn shutdown_flag_is_shared() {
        let (handle, receiver) = feed();
        assert!(!receiver.shutdown_requested());
        handle.clone().request_shutdown();
        assert!(receiver.shutdown_requested());
        assert!(handle.shutdown_requested());
    }

    #[test]
    fn silent_spectrum_detection() {
        let frame = SpectrumFrame {
            bins: vec![0.0; 8],
            sample_rate: 22_500,
        };
        assert!(frame.is_silent());
    }
}
