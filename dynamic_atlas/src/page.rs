// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Atlas pages and their configuration.

use core::fmt::{Debug, Formatter};

use crate::packer::RectanglePacker;

/// Default padding between neighbouring images, in pixels.
pub const DEFAULT_PADDING: u16 = 1;

/// Default number of pages created when a cache is first used.
pub const DEFAULT_INITIAL_PAGES: usize = 1;

/// Page size class. Every page of a cache has the same square dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AtlasGroup {
    /// 256 × 256 pages.
    Size256,
    /// 512 × 512 pages.
    Size512,
    /// 1024 × 1024 pages.
    Size1024,
    /// 2048 × 2048 pages.
    Size2048,
}

impl AtlasGroup {
    /// Every group, smallest first.
    pub const ALL: [Self; 4] = [Self::Size256, Self::Size512, Self::Size1024, Self::Size2048];

    /// Side length of a page in this group, in pixels.
    #[inline]
    pub const fn dimension(self) -> u16 {
        match self {
            Self::Size256 => 256,
            Self::Size512 => 512,
            Self::Size1024 => 1024,
            Self::Size2048 => 2048,
        }
    }

    /// The smallest group whose pages can hold a `width × height` image.
    pub fn smallest_fitting(width: u32, height: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|group| width.max(height) <= u32::from(group.dimension()))
    }
}

/// Settings shared by every cache of a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Pixels kept free to the right of and below every image, except at the
    /// page edge.
    pub padding: u16,
    /// Number of pages created eagerly on first use.
    pub initial_pages: usize,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            initial_pages: DEFAULT_INITIAL_PAGES,
        }
    }
}

/// One page of a cache: a host surface plus the packer that tracks it.
pub struct AtlasPage<S> {
    pub(crate) index: u32,
    pub(crate) surface: S,
    pub(crate) packer: RectanglePacker,
}

impl<S: Copy> AtlasPage<S> {
    pub(crate) fn new(index: u32, surface: S, dimension: u16, padding: u16) -> Self {
        Self {
            index,
            surface,
            packer: RectanglePacker::new(index, dimension, dimension, padding),
        }
    }

    /// Position of this page in its cache.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The host surface backing this page.
    #[inline]
    pub fn surface(&self) -> S {
        self.surface
    }

    /// The packer tracking allocations on this page.
    #[inline]
    pub fn packer(&self) -> &RectanglePacker {
        &self.packer
    }
}

impl<S: Debug> Debug for AtlasPage<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AtlasPage")
            .field("index", &self.index)
            .field("surface", &self.surface)
            .field("packer", &self.packer)
            .finish()
    }
}
