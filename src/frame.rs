//! Owned pixel buffers and rectangle geometry
//!
//! `Frame` is the substrate every other component operates on: a contiguous
//! row-major pixel matrix with explicit channel count. Cropping and resizing
//! always produce new owned buffers, never views into an existing one.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use crate::error::{VisionError, VisionResult};

/// Axis-aligned rectangle in image coordinates.
///
/// Used for search regions, crop requests and match bounding boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Center point, e.g. the tap target for a matched button.
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    /// Clip this rectangle so it fits inside a `frame_width` x `frame_height`
    /// image. A rectangle entirely outside the image clips to empty.
    pub fn clip_to(&self, frame_width: u32, frame_height: u32) -> Rect {
        let x = self.x.min(frame_width);
        let y = self.y.min(frame_height);
        Rect {
            x,
            y,
            width: self.width.min(frame_width.saturating_sub(x)),
            height: self.height.min(frame_height.saturating_sub(y)),
        }
    }
}

/// An owned 8-bit pixel matrix with 1 (luma), 3 (RGB) or 4 (RGBA) channels.
///
/// Invariant: `data.len() == width * height * channels`, enforced by every
/// constructor. A `Frame` is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Frame {
    /// Build a frame from raw row-major pixel data.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> VisionResult<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(VisionError::BufferShape {
                description: format!("unsupported channel count {channels}, expected 1, 3 or 4"),
            });
        }
        let expected = width as usize * height as usize * channels as usize;
        if expected == 0 {
            return Err(VisionError::BufferShape {
                description: format!("zero-sized frame {width}x{height}x{channels}"),
            });
        }
        if data.len() != expected {
            return Err(VisionError::BufferShape {
                description: format!(
                    "{} bytes of pixel data for a {width}x{height}x{channels} frame, expected {expected}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build a frame from a decoded image, keeping alpha only when present.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::from_gray(gray.clone()),
            other if other.color().has_alpha() => {
                let rgba = other.to_rgba8();
                Self {
                    width: rgba.width(),
                    height: rgba.height(),
                    channels: 4,
                    data: rgba.into_raw(),
                }
            }
            other => {
                let rgb = other.to_rgb8();
                Self {
                    width: rgb.width(),
                    height: rgb.height(),
                    channels: 3,
                    data: rgb.into_raw(),
                }
            }
        }
    }

    pub fn from_gray(gray: GrayImage) -> Self {
        Self {
            width: gray.width(),
            height: gray.height(),
            channels: 1,
            data: gray.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len_bytes(&self) -> usize {
        self.data.len()
    }

    /// Extract `region` into a new owned frame.
    ///
    /// The region must lie fully inside the frame; use [`Rect::clip_to`]
    /// first when the caller cannot guarantee that.
    pub fn crop(&self, region: Rect) -> VisionResult<Frame> {
        if region.is_empty()
            || region.x + region.width > self.width
            || region.y + region.height > self.height
        {
            return Err(VisionError::RegionOutOfBounds {
                region,
                width: self.width,
                height: self.height,
            });
        }
        let ch = self.channels as usize;
        let src_stride = self.width as usize * ch;
        let row_bytes = region.width as usize * ch;
        let mut data = Vec::with_capacity(region.height as usize * row_bytes);
        for row in region.y..region.y + region.height {
            let start = row as usize * src_stride + region.x as usize * ch;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        Ok(Frame {
            width: region.width,
            height: region.height,
            channels: self.channels,
            data,
        })
    }

    /// Bilinear resize into a new owned frame.
    pub fn resize(&self, new_width: u32, new_height: u32) -> VisionResult<Frame> {
        if new_width == 0 || new_height == 0 {
            return Err(VisionError::BufferShape {
                description: format!("cannot resize to {new_width}x{new_height}"),
            });
        }
        let filter = imageops::FilterType::Triangle;
        let frame = match self.channels {
            1 => Frame::from_gray(imageops::resize(
                &self.as_gray_image(),
                new_width,
                new_height,
                filter,
            )),
            3 => {
                let resized = imageops::resize(&self.as_rgb_image(), new_width, new_height, filter);
                Frame {
                    width: new_width,
                    height: new_height,
                    channels: 3,
                    data: resized.into_raw(),
                }
            }
            _ => {
                let resized =
                    imageops::resize(&self.as_rgba_image(), new_width, new_height, filter);
                Frame {
                    width: new_width,
                    height: new_height,
                    channels: 4,
                    data: resized.into_raw(),
                }
            }
        };
        Ok(frame)
    }

    /// Resize by a uniform factor, rounding the target dimensions.
    pub fn scaled(&self, factor: f32) -> VisionResult<Frame> {
        let new_width = (self.width as f32 * factor).round() as u32;
        let new_height = (self.height as f32 * factor).round() as u32;
        self.resize(new_width, new_height)
    }

    /// Collapse to a single luma plane for matching.
    pub fn to_gray(&self) -> GrayImage {
        match self.channels {
            1 => self.as_gray_image(),
            3 => DynamicImage::ImageRgb8(self.as_rgb_image()).to_luma8(),
            _ => DynamicImage::ImageRgba8(self.as_rgba_image()).to_luma8(),
        }
    }

    fn as_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
            .expect("frame length invariant")
    }

    fn as_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("frame length invariant")
    }

    fn as_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .expect("frame length invariant")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VisionError;

    #[test]
    fn test_from_raw_rejects_length_mismatch() {
        let err = Frame::from_raw(10, 10, 3, vec![0u8; 100]).unwrap_err();
        assert!(matches!(err, VisionError::BufferShape { .. }));
    }

    #[test]
    fn test_from_raw_rejects_bad_channel_count() {
        let err = Frame::from_raw(10, 10, 2, vec![0u8; 200]).unwrap_err();
        assert!(matches!(err, VisionError::BufferShape { .. }));
    }

    #[test]
    fn test_crop_copies_expected_pixels() {
        let mut data = vec![0u8; 8 * 4];
        for (i, px) in data.iter_mut().enumerate() {
            *px = i as u8;
        }
        let frame = Frame::from_raw(8, 4, 1, data).unwrap();
        let cropped = frame.crop(Rect::new(2, 1, 3, 2)).unwrap();

        assert_eq!(cropped.width(), 3);
        assert_eq!(cropped.height(), 2);
        // Row 1 starts at byte 8, row 2 at byte 16.
        assert_eq!(cropped.data(), &[10, 11, 12, 18, 19, 20]);
    }

    #[test]
    fn test_crop_rejects_out_of_bounds() {
        let frame = Frame::from_raw(8, 8, 1, vec![0u8; 64]).unwrap();
        let err = frame.crop(Rect::new(4, 4, 8, 8)).unwrap_err();
        assert!(matches!(err, VisionError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn test_resize_produces_new_dimensions() {
        let frame = Frame::from_raw(10, 10, 3, vec![128u8; 300]).unwrap();
        let resized = frame.resize(5, 7).unwrap();
        assert_eq!(resized.width(), 5);
        assert_eq!(resized.height(), 7);
        assert_eq!(resized.len_bytes(), 5 * 7 * 3);
    }

    #[test]
    fn test_scaled_rounds_dimensions() {
        let frame = Frame::from_raw(40, 40, 1, vec![50u8; 1600]).unwrap();
        let scaled = frame.scaled(0.9).unwrap();
        assert_eq!(scaled.width(), 36);
        assert_eq!(scaled.height(), 36);
    }

    #[test]
    fn test_to_gray_from_rgb() {
        // A pure red frame converts to a uniform mid-dark luma plane.
        let mut data = Vec::with_capacity(4 * 4 * 3);
        for _ in 0..16 {
            data.extend_from_slice(&[255, 0, 0]);
        }
        let frame = Frame::from_raw(4, 4, 3, data).unwrap();
        let gray = frame.to_gray();
        let first = gray.as_raw()[0];
        assert!(first > 0 && first < 128);
        assert!(gray.as_raw().iter().all(|&v| v == first));
    }

    #[test]
    fn test_rect_clip_to_bounds() {
        let clipped = Rect::new(1000, 2200, 200, 200).clip_to(1080, 2280);
        assert_eq!(clipped, Rect::new(1000, 2200, 80, 80));

        let outside = Rect::new(5000, 10, 50, 50).clip_to(1080, 2280);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_rect_center_and_contains() {
        let rect = Rect::new(100, 150, 50, 50);
        assert_eq!(rect.center(), (125, 175));
        assert!(rect.contains(100, 150));
        assert!(!rect.contains(150, 150));
    }
}
