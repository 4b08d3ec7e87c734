// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangles in page pixel space and in page-normalized space.

/// Half a texel, used to inset sample rectangles away from their neighbours.
const HALF_TEXEL: f32 = 0.5;

/// An axis-aligned rectangle in page pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge (pixels).
    pub x: u16,
    /// Top edge (pixels).
    pub y: u16,
    /// Width (pixels).
    pub width: u16,
    /// Height (pixels).
    pub height: u16,
}

impl PixelRect {
    /// Creates a new rectangle.
    #[inline]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        u32::from(self.x) + u32::from(self.width)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        u32::from(self.y) + u32::from(self.height)
    }

    /// Area in pixels.
    #[inline]
    pub fn area(&self) -> u32 {
        u32::from(self.width) * u32::from(self.height)
    }

    /// Whether the rectangle covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && u32::from(self.x) < other.right()
            && u32::from(other.x) < self.right()
            && u32::from(self.y) < other.bottom()
            && u32::from(other.y) < self.bottom()
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// An allocation handed out by a [`RectanglePacker`](crate::RectanglePacker).
///
/// The geometry is the image area itself. The padding reserved around it is
/// owned by the packer and is not part of this rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PackedRect {
    /// Which atlas page the allocation lives on.
    pub page_index: u32,
    /// X position in the page (pixels).
    pub x: u16,
    /// Y position in the page (pixels).
    pub y: u16,
    /// Width of the image (pixels).
    pub width: u16,
    /// Height of the image (pixels).
    pub height: u16,
}

impl PackedRect {
    /// The image area in page pixel space.
    #[inline]
    pub fn pixels(&self) -> PixelRect {
        PixelRect::new(self.x, self.y, self.width, self.height)
    }

    /// The area reserved for this allocation: the image plus trailing padding,
    /// clipped to the page.
    pub fn padded(&self, padding: u16, page_width: u16, page_height: u16) -> PixelRect {
        let clip = |origin: u16, extent: u16, limit: u16| {
            let end = (u32::from(origin) + u32::from(extent) + u32::from(padding))
                .min(u32::from(limit));
            // `end` never exceeds `limit`, which is a u16.
            u16::try_from(end - u32::from(origin)).unwrap_or(extent)
        };
        PixelRect::new(
            self.x,
            self.y,
            clip(self.x, self.width, page_width),
            clip(self.y, self.height, page_height),
        )
    }
}

/// A rectangle in page-normalized (0..1) space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UvRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl UvRect {
    /// Exclusive right edge.
    #[inline]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Maps an allocation directly to unit space. Used as the blit target.
    pub fn draw_rect(rect: &PackedRect, page_width: u16, page_height: u16) -> Self {
        let (du, dv) = texel(page_width, page_height);
        Self {
            x: f32::from(rect.x) * du,
            y: f32::from(rect.y) * dv,
            width: f32::from(rect.width) * du,
            height: f32::from(rect.height) * dv,
        }
    }

    /// Maps an allocation to unit space, inset by half a texel on every edge
    /// so bilinear sampling never reaches a neighbouring image.
    pub fn sample_rect(rect: &PackedRect, page_width: u16, page_height: u16) -> Self {
        let (du, dv) = texel(page_width, page_height);
        Self {
            x: (f32::from(rect.x) + HALF_TEXEL) * du,
            y: (f32::from(rect.y) + HALF_TEXEL) * dv,
            width: (f32::from(rect.width) - 2.0 * HALF_TEXEL) * du,
            height: (f32::from(rect.height) - 2.0 * HALF_TEXEL) * dv,
        }
    }
}

fn texel(page_width: u16, page_height: u16) -> (f32, f32) {
    (
        1.0 / f32::from(page_width.max(1)),
        1.0 / f32::from(page_height.max(1)),
    )
}

/// Where a blit should land: the pixel rectangle and its page-normalized
/// equivalent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawTarget {
    /// Destination in page pixels.
    pub pixels: PixelRect,
    /// Destination in page-normalized coordinates.
    pub uv: UvRect,
}
