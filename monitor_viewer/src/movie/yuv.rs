use theorafile_rs::{
    th_pixel_fmt, th_pixel_fmt_TH_PF_420, th_pixel_fmt_TH_PF_422, th_pixel_fmt_TH_PF_444,
};

/// Chroma subsampling of a decoded Theora frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsampling {
    Yuv420,
    Yuv422,
    Yuv444,
}

impl Subsampling {
    pub fn from_theora(format: th_pixel_fmt) -> Option<Self> {
        match format {
            pf if pf == th_pixel_fmt_TH_PF_420 => Some(Self::Yuv420),
            pf if pf == th_pixel_fmt_TH_PF_422 => Some(Self::Yuv422),
            pf if pf == th_pixel_fmt_TH_PF_444 => Some(Self::Yuv444),
            _ => None,
        }
    }

    fn shifts(self) -> (usize, usize) {
        match self {
            Self::Yuv420 => (1, 1),
            Self::Yuv422 => (1, 0),
            Self::Yuv444 => (0, 0),
        }
    }
}

/// Plane geometry for one frame: a full-size luma plane followed by two
/// chroma planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    width: usize,
    height: usize,
    chroma_width: usize,
    chroma_height: usize,
    subsampling: Subsampling,
}

impl FrameLayout {
    pub fn new(width: usize, height: usize, subsampling: Subsampling) -> Self {
        let (sx, sy) = subsampling.shifts();
        Self {
            width,
            height,
            chroma_width: (width >> sx).max(1),
            chroma_height: (height >> sy).max(1),
            subsampling,
        }
    }

    pub fn yuv_len(&self) -> Option<usize> {
        let luma = self.width.checked_mul(self.height)?;
        let chroma = self.chroma_width.checked_mul(self.chroma_height)?;
        luma.checked_add(chroma.checked_mul(2)?)
    }

    pub fn rgba_len(&self) -> Option<usize> {
        self.width.checked_mul(self.height)?.checked_mul(4)
    }

    /// Write the frame in `yuv` as opaque RGBA into `rgba`.
    pub fn convert(&self, yuv: &[u8], rgba: &mut [u8]) {
        let luma_len = self.width * self.height;
        let chroma_len = self.chroma_width * self.chroma_height;
        if yuv.len() < luma_len + 2 * chroma_len || rgba.len() < luma_len * 4 {
            return;
        }
        let (luma, chroma) = yuv.split_at(luma_len);
        let (cb_plane, cr_plane) = chroma.split_at(chroma_len);
        let (sx, sy) = self.subsampling.shifts();

        for (row, (luma_row, out_row)) in luma
            .chunks_exact(self.width)
            .zip(rgba.chunks_exact_mut(self.width * 4))
            .enumerate()
        {
            let chroma_row = (row >> sy).min(self.chroma_height - 1) * self.chroma_width;
            for (col, (y, out)) in luma_row.iter().zip(out_row.chunks_exact_mut(4)).enumerate() {
                let chroma_index = chroma_row + (col >> sx).min(self.chroma_width - 1);
                let [r, g, b] = ycbcr_to_rgb(*y, cb_plane[chroma_index], cr_plane[chroma_index]);
                out.copy_from_slice(&[r, g, b, 255]);
            }
        }
    }
}

/// BT.601 full-range conversion.
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    [
        (y + 1.402 * cr).clamp(0.0, 255.0) as u8,
        (y - 0.344_136 * cb - 0.714_136 * cr).clamp(0.0, 255.0) as u8,
        (y + 1.772 * cb).clamp(0.0, 255.0) as u8,
    ]
}

#[cfg(test)]
mod yuv_tests {
    use super::*;

    #[test]
    fn neutral_chroma_is_grey() {
        assert_eq!(ycbcr_to_rgb(90, 128, 128), [90, 90, 90]);
        assert_eq!(ycbcr_to_rgb(255, 128, 128), [255, 255, 255]);
    }

    #[test]
    fn strong_red_chroma_saturates_red() {
        let [r, g, b] = ycbcr_to_rgb(76, 85, 255);
        assert!(r > 240, "red {r}");
        assert!(g < 20 && b < 20, "green {g} blue {b}");
    }

    #[test]
    fn plane_sizes_follow_subsampling() {
        let layout = FrameLayout::new(6, 4, Subsampling::Yuv420);
        assert_eq!(layout.yuv_len(), Some(24 + 2 * 6));
        let layout = FrameLayout::new(6, 4, Subsampling::Yuv422);
        assert_eq!(layout.yuv_len(), Some(24 + 2 * 12));
        let layout = FrameLayout::new(6, 4, Subsampling::Yuv444);
        assert_eq!(layout.yuv_len(), Some(24 * 3));
        assert_eq!(layout.rgba_len(), Some(96));
    }

    #[test]
    fn quarter_chroma_covers_two_by_two_blocks() {
        let layout = FrameLayout::new(4, 2, Subsampling::Yuv420);
        let mut yuv = vec![128u8; 8];
        // Left block neutral, right block pushed toward blue.
        yuv.extend_from_slice(&[128, 255]);
        yuv.extend_from_slice(&[128, 128]);
        let mut rgba = vec![0u8; 32];
        layout.convert(&yuv, &mut rgba);
        assert_eq!(&rgba[0..4], &[128, 128, 128, 255]);
        assert_eq!(&rgba[16..20], &[128, 128, 128, 255]);
        let right_bottom = &rgba[28..32];
        assert_eq!(right_bottom[2], 255);
        assert!(right_bottom[0] == 128 && right_bottom[1] < 128);
    }

    #[test]
    fn short_buffers_are_ignored() {
        let layout = FrameLayout::new(4, 4, Subsampling::Yuv444);
        let mut rgba = vec![7u8; 64];
        layout.convert(&[0; 10], &mut rgba);
        assert!(rgba.iter().all(|byte| *byte == 7));
    }
}
