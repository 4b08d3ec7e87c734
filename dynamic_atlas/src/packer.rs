// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-page rectangle bin packer.

use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};
use core::hash::Hash;
use hashbrown::{Equivalent, HashMap};

use crate::key::ImageKey;
use crate::region::{PackedRect, PixelRect};

/// Packs rectangles into one fixed-size atlas page.
///
/// Free space is kept as a list of disjoint regions. An allocation scans the
/// list in order and takes the first region that can hold it, then splits
/// the remainder of that region in two (guillotine split along the shorter
/// leftover axis). Each allocation reserves `padding` extra pixels to its
/// right and bottom, except where it touches the page edge, so a full-page
/// image still fits an empty packer.
///
/// The packer never reclaims space on its own. Releasing an image only clears
/// its `used` flag; the space comes back when the owner calls [`reset`] during
/// a reflow.
///
/// [`reset`]: Self::reset
pub struct RectanglePacker {
    page_index: u32,
    width: u16,
    height: u16,
    padding: u16,
    free: Vec<PixelRect>,
    slots: HashMap<ImageKey, Slot>,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    rect: PackedRect,
    used: bool,
}

impl RectanglePacker {
    /// Creates an empty packer for page `page_index`.
    pub fn new(page_index: u32, width: u16, height: u16, padding: u16) -> Self {
        let mut packer = Self {
            page_index,
            width: 0,
            height: 0,
            padding: 0,
            free: Vec::new(),
            slots: HashMap::new(),
        };
        packer.reset(width, height, padding);
        packer
    }

    /// Discards every allocation and free region, leaving an empty packer of
    /// the given size.
    pub fn reset(&mut self, width: u16, height: u16, padding: u16) {
        self.width = width;
        self.height = height;
        self.padding = padding;
        self.free.clear();
        self.slots.clear();
        if width > 0 && height > 0 {
            self.free.push(PixelRect::new(0, 0, width, height));
        }
    }

    /// Allocates a `width × height` rectangle for `key`.
    ///
    /// Returns `None` iff no free region can hold the image plus its padding.
    /// The new rectangle starts out `used`. If `key` already had an allocation
    /// in this packer, the old one is forgotten (its space stays reserved
    /// until the next reset).
    pub fn allocate(&mut self, width: u16, height: u16, key: ImageKey) -> Option<PackedRect> {
        if width == 0 || height == 0 {
            return None;
        }
        let index = self
            .free
            .iter()
            .position(|region| self.fits(region, width, height))?;
        let region = self.free.remove(index);

        let reserved_w = width.saturating_add(self.padding).min(region.width);
        let reserved_h = height.saturating_add(self.padding).min(region.height);
        let leftover_w = region.width - reserved_w;
        let leftover_h = region.height - reserved_h;

        let (right, below) = if leftover_w < leftover_h {
            (
                PixelRect::new(region.x + reserved_w, region.y, leftover_w, reserved_h),
                PixelRect::new(region.x, region.y + reserved_h, region.width, leftover_h),
            )
        } else {
            (
                PixelRect::new(region.x + reserved_w, region.y, leftover_w, region.height),
                PixelRect::new(region.x, region.y + reserved_h, reserved_w, leftover_h),
            )
        };
        // The split pieces take the consumed region's place in scan order.
        for piece in [below, right] {
            if !piece.is_empty() {
                self.free.insert(index, piece);
            }
        }

        let rect = PackedRect {
            page_index: self.page_index,
            x: region.x,
            y: region.y,
            width,
            height,
        };
        if let Some(stale) = self.slots.insert(key, Slot { rect, used: true }) {
            log::debug!(
                "page {}: key re-allocated, abandoning {:?}",
                self.page_index,
                stale.rect
            );
        }
        Some(rect)
    }

    /// Whether `region` can hold a `width × height` image plus padding.
    fn fits(&self, region: &PixelRect, width: u16, height: u16) -> bool {
        let needed = |extent: u16, end: u32, page_extent: u16| {
            if end == u32::from(page_extent) {
                u32::from(extent)
            } else {
                u32::from(extent) + u32::from(self.padding)
            }
        };
        needed(width, region.right(), self.width) <= u32::from(region.width)
            && needed(height, region.bottom(), self.height) <= u32::from(region.height)
    }

    /// Looks up the allocation recorded for `key`.
    pub fn lookup<Q>(&self, key: &Q) -> Option<PackedRect>
    where
        Q: Hash + Equivalent<ImageKey> + ?Sized,
    {
        self.slots.get(key).map(|slot| slot.rect)
    }

    /// Whether `key` has an allocation that is currently in use.
    pub fn is_used<Q>(&self, key: &Q) -> bool
    where
        Q: Hash + Equivalent<ImageKey> + ?Sized,
    {
        self.slots.get(key).is_some_and(|slot| slot.used)
    }

    /// Sets the `used` flag of the allocation for `key`.
    ///
    /// Returns `false` if the packer has no allocation for `key`.
    pub fn set_used<Q>(&mut self, key: &Q, used: bool) -> bool
    where
        Q: Hash + Equivalent<ImageKey> + ?Sized,
    {
        match self.slots.get_mut(key) {
            Some(slot) => {
                slot.used = used;
                true
            }
            None => false,
        }
    }

    /// Whether at least one recorded allocation is not in use, so that a reset
    /// followed by re-packing the used ones could free space.
    pub fn has_free_capacity(&self) -> bool {
        self.slots.values().any(|slot| !slot.used)
    }

    /// Keys with an allocation in this packer.
    pub fn keys(&self) -> impl Iterator<Item = &ImageKey> + '_ {
        self.slots.keys()
    }

    /// Every allocation with its `used` flag.
    pub fn allocations(&self) -> impl Iterator<Item = (&ImageKey, PackedRect, bool)> + '_ {
        self.slots
            .iter()
            .map(|(key, slot)| (key, slot.rect, slot.used))
    }

    /// The free regions, in scan order.
    pub fn free_regions(&self) -> &[PixelRect] {
        &self.free
    }

    /// Number of recorded allocations.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing has been allocated since the last reset.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index of the page this packer belongs to.
    #[inline]
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Page width in pixels.
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Page height in pixels.
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Padding in pixels kept between neighbouring allocations.
    #[inline]
    pub fn padding(&self) -> u16 {
        self.padding
    }
}

impl Debug for RectanglePacker {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RectanglePacker")
            .field("page_index", &self.page_index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("padding", &self.padding)
            .field("allocations", &self.slots.len())
            .field("free_regions", &self.free.len())
            .finish()
    }
}
