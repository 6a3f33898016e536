use anyhow::Result;
use monitor_feed::CameraClaim;

use super::{FrameContext, PanelRenderer};
use crate::canvas::{Canvas, Rgba};
use crate::layout::PanelRect;

const BACKGROUND: Rgba = [0, 0, 0, 200];
const BORDER: Rgba = [76, 194, 230, 255];
const PLACEHOLDER: &str = "NO SIGNAL";
const PLACEHOLDER_COLOR: Rgba = [150, 150, 150, 255];

/// Shows the latest camera frame, or a placeholder while none is available.
#[derive(Debug, Default)]
pub struct CameraPanel {
    claim: Option<CameraClaim>,
}

impl CameraPanel {
    pub fn new(claim: Option<CameraClaim>) -> Self {
        Self { claim }
    }

    pub fn has_feed(&self) -> bool {
        self.claim.is_some()
    }

    /// Ask the producer for frames matching the panel size.
    pub fn request_resolution(&self, width: u32, height: u32) {
        if let Some(claim) = &self.claim {
            claim.request_resolution(width, height);
        }
    }

    /// Drop the claim so another consumer may take the camera.
    pub fn release(&mut self) -> bool {
        self.claim.take().is_some()
    }
}

impl PanelRenderer for CameraPanel {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        canvas.fill_rect(0, 0, w, h, BACKGROUND);

        match self.claim.as_ref().and_then(CameraClaim::frame) {
            Some(image) => canvas.blit_scaled(
                image.width(),
                image.height(),
                image.pixels(),
                PanelRect::new(0, 0, canvas.width(), canvas.height()),
                1.0,
            ),
            None => {
                let text_width = frame.typeface.measure(PLACEHOLDER, frame.font_px) as i32;
                let line_height = frame.typeface.line_height(frame.font_px) as i32;
                frame.typeface.draw(
                    canvas,
                    (w - text_width) / 2,
                    (h - line_height) / 2,
                    PLACEHOLDER,
                    frame.font_px,
                    PLACEHOLDER_COLOR,
                );
            }
        }

        canvas.stroke_rect(0, 0, w, h, frame.px(2.0).max(1), BORDER);
        Ok(())
    }
}
