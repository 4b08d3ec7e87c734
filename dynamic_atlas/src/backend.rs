// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-supplied collaborators: asset loading, page surfaces and blitting.
//!
//! The cache never touches pixels or files itself. It asks an [`AssetLoader`]
//! for source images, a [`SurfaceAllocator`] for page surfaces, and a
//! [`Blitter`] to copy sources into pages.

use alloc::sync::Arc;
use core::fmt::Debug;

use crate::region::DrawTarget;

/// How an asset load should be performed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// The loader should finish before returning the handle.
    Sync,
    /// The loader may return a handle that is still
    /// [`Processing`](LoadStatus::Processing).
    #[default]
    Async,
}

/// Progress of an asset load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    /// Still in flight.
    Processing,
    /// Finished; the image should be available.
    Succeed,
    /// Finished without an image.
    Failed,
}

/// Pixel dimensions of a loaded source image.
pub trait SourceImage {
    /// Width in pixels.
    fn width(&self) -> u32;
    /// Height in pixels.
    fn height(&self) -> u32;
}

impl<T: SourceImage + ?Sized> SourceImage for Arc<T> {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }
}

/// An in-flight or finished load of one source path.
pub trait LoadHandle {
    /// The loaded image type.
    type Image: SourceImage;

    /// Current status of the load.
    fn status(&self) -> LoadStatus;

    /// The loaded image, once [`Succeed`](LoadStatus::Succeed).
    fn image(&self) -> Option<&Self::Image>;

    /// Whether the load has finished, successfully or not.
    fn is_done(&self) -> bool {
        self.status() != LoadStatus::Processing
    }

    /// Gives the handle back to the loader. Called exactly once, when the
    /// cache no longer needs the asset.
    fn release(self);
}

/// Starts asset loads.
pub trait AssetLoader {
    /// The loaded image type.
    type Image: SourceImage;
    /// Handle type returned by [`load`](Self::load).
    type Handle: LoadHandle<Image = Self::Image>;

    /// Starts loading `path`.
    fn load(&mut self, path: &str, mode: LoadMode) -> Self::Handle;
}

/// Creates page surfaces.
pub trait SurfaceAllocator {
    /// Opaque identifier of a page surface.
    type Surface: Copy + Debug + PartialEq;

    /// Creates a new, cleared surface.
    fn create_surface(&mut self, width: u16, height: u16) -> Self::Surface;
}

/// Copies source images into page surfaces.
pub trait Blitter<I: ?Sized>: SurfaceAllocator {
    /// Clears every pixel of `surface` to transparent.
    fn clear(&mut self, surface: Self::Surface);

    /// Draws `image` into `target` on `surface`, converting it to grayscale
    /// if `gray` is set.
    fn draw(&mut self, surface: Self::Surface, target: DrawTarget, image: &I, gray: bool);
}
