use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::slot::LatestSlot;
use crate::FeedError;

/// Decoded camera image in straight RGBA8, row-major, no padding.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl CameraFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FeedError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(FeedError::FrameSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

#[derive(Debug, Default)]
pub(crate) struct CameraShared {
    pub(crate) frames: LatestSlot<CameraFrame>,
    claimed: AtomicBool,
    requested: Mutex<Option<(u32, u32)>>,
}

impl CameraShared {
    pub(crate) fn claim(self: &Arc<Self>) -> Result<CameraClaim, FeedError> {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FeedError::CameraAlreadyClaimed);
        }
        Ok(CameraClaim {
            shared: Arc::clone(self),
        })
    }

    pub(crate) fn requested_resolution(&self) -> Option<(u32, u32)> {
        *self.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive read access to the camera feed. Released on drop.
#[derive(Debug)]
pub struct CameraClaim {
    shared: Arc<CameraShared>,
}

impl CameraClaim {
    pub fn frame(&self) -> Option<Arc<CameraFrame>> {
        self.shared.frames.latest()
    }

    /// Ask the producer for a different capture size (panel expand/collapse).
    pub fn request_resolution(&self, width: u32, height: u32) {
        *self
            .shared
            .requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((width.max(1), height.max(1)));
    }
}

impl Drop for CameraClaim {
    fn drop(&mut self) {
        self.shared.claimed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod camera_tests {
    use super::*;

    #[test]
    fn frame_rejects_mismatched_buffer() {
        let err = CameraFrame::new(2, 2, vec![0; 15]).expect_err("short buffer");
        assert!(matches!(err, FeedError::FrameSize { expected: 16, .. }));
        assert!(CameraFrame::new(0, 2, Vec::new()).is_err());
        assert!(CameraFrame::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn second_claim_fails_until_first_is_dropped() {
        let shared = Arc::new(CameraShared::default());
        let first = shared.claim().expect("first claim");
        assert!(matches!(
            shared.claim(),
            Err(FeedError::CameraAlreadyClaimed)
        ));
        drop(first);
        assert!(shared.claim().is_ok());
    }

    #[test]
    fn resolution_request_is_visible_to_producer() {
        let shared = Arc::new(CameraShared::default());
        let claim = shared.claim().expect("claim");
        assert_eq!(shared.requested_resolution(), None);
        claim.request_resolution(640, 0);
        assert_eq!(shared.requested_resolution(), Some((640, 1)));
    }
}
