// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU backend storing atlas pages in Vello [`Pixmap`]s.
//!
//! Useful for tests, for software rendering, and for inspecting atlas pages.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt::{Debug, Formatter};
use hashbrown::HashMap;
use vello_common::pixmap::Pixmap;

use crate::backend::{
    AssetLoader, Blitter, LoadHandle, LoadMode, LoadStatus, SourceImage, SurfaceAllocator,
};
use crate::region::DrawTarget;

impl SourceImage for Pixmap {
    fn width(&self) -> u32 {
        u32::from(Self::width(self))
    }

    fn height(&self) -> u32 {
        u32::from(Self::height(self))
    }
}

/// Identifies one page of a [`PixmapAtlas`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageSurface(u32);

impl PageSurface {
    /// Position of the page in its [`PixmapAtlas`].
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Atlas page storage backed by [`Pixmap`]s.
///
/// Blits copy source pixels row by row. Grayscale blits replace each pixel's
/// colour with its luma, keeping alpha.
#[derive(Default)]
pub struct PixmapAtlas {
    pages: Vec<Pixmap>,
}

impl PixmapAtlas {
    /// Creates an atlas without pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pixels of a page.
    pub fn page(&self, surface: PageSurface) -> Option<&Pixmap> {
        self.pages.get(surface.0 as usize)
    }

    /// Every page, in creation order.
    pub fn pages(&self) -> &[Pixmap] {
        &self.pages
    }

    /// Writes a page to a PNG file, creating parent directories as needed.
    #[cfg(feature = "png")]
    pub fn save_page_png(
        &self,
        surface: PageSurface,
        path: &std::path::Path,
    ) -> std::io::Result<()> {
        let page = self.page(surface).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such atlas page")
        })?;
        save_pixmap_to_png(page, path)
    }
}

impl SurfaceAllocator for PixmapAtlas {
    type Surface = PageSurface;

    #[expect(
        clippy::cast_possible_truncation,
        reason = "page counts stay far below u32::MAX"
    )]
    fn create_surface(&mut self, width: u16, height: u16) -> PageSurface {
        self.pages.push(Pixmap::new(width, height));
        PageSurface((self.pages.len() - 1) as u32)
    }
}

impl<I> Blitter<I> for PixmapAtlas
where
    I: Borrow<Pixmap> + ?Sized,
{
    fn clear(&mut self, surface: PageSurface) {
        if let Some(page) = self.pages.get_mut(surface.0 as usize) {
            page.data_as_u8_slice_mut().fill(0);
        }
    }

    fn draw(&mut self, surface: PageSurface, target: DrawTarget, image: &I, gray: bool) {
        let Some(page) = self.pages.get_mut(surface.0 as usize) else {
            log::warn!("draw into unknown atlas page {}", surface.0);
            return;
        };
        copy_into_page(image.borrow(), page, target, gray);
    }
}

impl Debug for PixmapAtlas {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let sizes: Vec<_> = self
            .pages
            .iter()
            .map(|page| (page.width(), page.height()))
            .collect();
        f.debug_struct("PixmapAtlas").field("pages", &sizes).finish()
    }
}

/// Copies the top-left corner of `src` into `target` on `dst`, clipped to both.
fn copy_into_page(src: &Pixmap, dst: &mut Pixmap, target: DrawTarget, gray: bool) {
    let dst_x = usize::from(target.pixels.x);
    let dst_y = usize::from(target.pixels.y);
    let src_stride = usize::from(src.width());
    let dst_stride = usize::from(dst.width());
    let copy_width = usize::from(target.pixels.width)
        .min(src_stride)
        .min(dst_stride.saturating_sub(dst_x));
    let copy_height = usize::from(target.pixels.height)
        .min(usize::from(src.height()))
        .min(usize::from(dst.height()).saturating_sub(dst_y));

    let src_data = src.data_as_u8_slice();
    let dst_data = dst.data_as_u8_slice_mut();

    for y in 0..copy_height {
        let src_row_start = y * src_stride * 4;
        let src_row = &src_data[src_row_start..src_row_start + copy_width * 4];
        let dst_row_start = ((dst_y + y) * dst_stride + dst_x) * 4;
        let dst_row = &mut dst_data[dst_row_start..dst_row_start + copy_width * 4];

        if gray {
            for (out, px) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                let luma = luma(px[0], px[1], px[2]);
                out.copy_from_slice(&[luma, luma, luma, px[3]]);
            }
        } else {
            dst_row.copy_from_slice(src_row);
        }
    }
}

/// Rec. 601 luma with 8-bit fixed point weights. The weights sum to 256, so a
/// premultiplied input stays premultiplied.
#[expect(
    clippy::cast_possible_truncation,
    reason = "the weighted sum shifted right by 8 fits in u8"
)]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b)) >> 8) as u8
}

#[cfg(feature = "png")]
fn save_pixmap_to_png(pixmap: &Pixmap, path: &std::path::Path) -> std::io::Result<()> {
    use std::fs::File;
    use std::io::BufWriter;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let w = BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, u32::from(pixmap.width()), u32::from(pixmap.height()));
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header().map_err(std::io::Error::other)?;
    writer
        .write_image_data(pixmap.data_as_u8_slice())
        .map_err(std::io::Error::other)?;

    Ok(())
}

/// Serves preloaded pixmaps by path.
///
/// Every load completes immediately: [`Succeed`](LoadStatus::Succeed) for a
/// known path, [`Failed`](LoadStatus::Failed) otherwise.
#[derive(Default)]
pub struct PixmapLoader {
    images: HashMap<String, Arc<Pixmap>>,
}

impl PixmapLoader {
    /// Creates a loader without images.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `pixmap` available under `path`, replacing any previous image.
    pub fn insert(&mut self, path: impl Into<String>, pixmap: Pixmap) {
        self.images.insert(path.into(), Arc::new(pixmap));
    }

    /// Forgets the image under `path`. Loads already handed out keep it.
    pub fn remove(&mut self, path: &str) -> bool {
        self.images.remove(path).is_some()
    }
}

impl AssetLoader for PixmapLoader {
    type Image = Arc<Pixmap>;
    type Handle = PixmapHandle;

    fn load(&mut self, path: &str, _mode: LoadMode) -> PixmapHandle {
        PixmapHandle(self.images.get(path).cloned())
    }
}

impl Debug for PixmapLoader {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let mut paths: Vec<_> = self.images.keys().collect();
        paths.sort_unstable();
        f.debug_struct("PixmapLoader")
            .field("images", &paths)
            .finish()
    }
}

/// A finished [`PixmapLoader`] load.
#[derive(Clone)]
pub struct PixmapHandle(Option<Arc<Pixmap>>);

impl LoadHandle for PixmapHandle {
    type Image = Arc<Pixmap>;

    fn status(&self) -> LoadStatus {
        if self.0.is_some() {
            LoadStatus::Succeed
        } else {
            LoadStatus::Failed
        }
    }

    fn image(&self) -> Option<&Arc<Pixmap>> {
        self.0.as_ref()
    }

    fn release(self) {}
}

impl Debug for PixmapHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let size = self.0.as_ref().map(|p| (p.width(), p.height()));
        f.debug_tuple("PixmapHandle").field(&size).finish()
    }
}
