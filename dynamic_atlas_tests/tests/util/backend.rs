// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scriptable asset loader and a blitter that records what it is asked to do.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use dynamic_atlas::{
    AssetLoader, Blitter, DrawTarget, LoadHandle, LoadMode, LoadStatus, PixelRect, SourceImage,
    SurfaceAllocator, UvRect,
};

/// A source image that only knows its path and size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MockImage {
    pub(crate) path: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl SourceImage for MockImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

pub(crate) struct MockHandle {
    path: String,
    status: Rc<Cell<LoadStatus>>,
    image: Option<MockImage>,
    released: Rc<RefCell<Vec<String>>>,
}

impl LoadHandle for MockHandle {
    type Image = MockImage;

    fn status(&self) -> LoadStatus {
        self.status.get()
    }

    fn image(&self) -> Option<&MockImage> {
        match self.status.get() {
            LoadStatus::Succeed => self.image.as_ref(),
            _ => None,
        }
    }

    fn release(self) {
        self.released.borrow_mut().push(self.path);
    }
}

/// Loads images registered with [`MockLoader::add_image`].
///
/// Synchronous loads finish immediately. Asynchronous loads stay
/// [`Processing`](LoadStatus::Processing) until [`finish`](MockLoader::finish)
/// is called for their path; unknown paths then fail.
#[derive(Default)]
pub(crate) struct MockLoader {
    sizes: HashMap<String, (u32, u32)>,
    missing: HashSet<String>,
    controls: HashMap<String, Rc<Cell<LoadStatus>>>,
    released: Rc<RefCell<Vec<String>>>,
    pub(crate) loads: Vec<(String, LoadMode)>,
}

impl MockLoader {
    pub(crate) fn add_image(&mut self, path: &str, width: u32, height: u32) {
        self.sizes.insert(path.to_owned(), (width, height));
    }

    /// Loads of `path` will succeed without producing an image.
    pub(crate) fn add_missing(&mut self, path: &str) {
        self.missing.insert(path.to_owned());
    }

    /// Completes the most recent load of `path`.
    pub(crate) fn finish(&self, path: &str) {
        let status = self.final_status(path);
        if let Some(control) = self.controls.get(path) {
            control.set(status);
        }
    }

    pub(crate) fn load_count(&self, path: &str) -> usize {
        self.loads.iter().filter(|(p, _)| p == path).count()
    }

    pub(crate) fn release_count(&self, path: &str) -> usize {
        self.released.borrow().iter().filter(|p| *p == path).count()
    }

    fn final_status(&self, path: &str) -> LoadStatus {
        if self.sizes.contains_key(path) || self.missing.contains(path) {
            LoadStatus::Succeed
        } else {
            LoadStatus::Failed
        }
    }
}

impl AssetLoader for MockLoader {
    type Image = MockImage;
    type Handle = MockHandle;

    fn load(&mut self, path: &str, mode: LoadMode) -> MockHandle {
        self.loads.push((path.to_owned(), mode));
        let status = match mode {
            LoadMode::Sync => self.final_status(path),
            LoadMode::Async => LoadStatus::Processing,
        };
        let control = Rc::new(Cell::new(status));
        self.controls.insert(path.to_owned(), control.clone());
        let image = if self.missing.contains(path) {
            None
        } else {
            self.sizes.get(path).map(|&(width, height)| MockImage {
                path: path.to_owned(),
                width,
                height,
            })
        };
        MockHandle {
            path: path.to_owned(),
            status: control,
            image,
            released: self.released.clone(),
        }
    }
}

/// One recorded blit.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Draw {
    pub(crate) surface: u32,
    pub(crate) path: String,
    pub(crate) pixels: PixelRect,
    pub(crate) uv: UvRect,
    pub(crate) gray: bool,
}

/// Surfaces are numbered in creation order.
#[derive(Default)]
pub(crate) struct RecordingSurfaces {
    pub(crate) sizes: Vec<(u16, u16)>,
    pub(crate) draws: Vec<Draw>,
    pub(crate) clears: Vec<u32>,
}

impl RecordingSurfaces {
    pub(crate) fn draws_of(&self, path: &str) -> usize {
        self.draws.iter().filter(|d| d.path == path).count()
    }
}

impl SurfaceAllocator for RecordingSurfaces {
    type Surface = u32;

    fn create_surface(&mut self, width: u16, height: u16) -> u32 {
        self.sizes.push((width, height));
        (self.sizes.len() - 1) as u32
    }
}

impl Blitter<MockImage> for RecordingSurfaces {
    fn clear(&mut self, surface: u32) {
        self.clears.push(surface);
    }

    fn draw(&mut self, surface: u32, target: DrawTarget, image: &MockImage, gray: bool) {
        self.draws.push(Draw {
            surface,
            path: image.path.clone(),
            pixels: target.pixels,
            uv: target.uv,
            gray,
        });
    }
}
