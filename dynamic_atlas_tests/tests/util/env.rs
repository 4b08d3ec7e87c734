// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A cache wired to the mock backend, and result recording.

use std::cell::RefCell;
use std::rc::Rc;

use dynamic_atlas::{
    AtlasConfig, AtlasGroup, AtlasSprite, DynamicAtlasCache, ErrorKind, ImageResult, LoadMode,
    Subscriber,
};

use super::{MockLoader, RecordingSurfaces};

pub(crate) type TestCache = DynamicAtlasCache<MockLoader, RecordingSurfaces>;

/// Collects every result delivered to one subscriber.
pub(crate) struct Recorder {
    subscriber: Subscriber<u32>,
    results: Rc<RefCell<Vec<ImageResult<u32>>>>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = results.clone();
        let subscriber = Subscriber::new(move |result: &ImageResult<u32>| {
            sink.borrow_mut().push(result.clone());
        });
        Self {
            subscriber,
            results,
        }
    }

    pub(crate) fn subscriber(&self) -> Subscriber<u32> {
        self.subscriber.clone()
    }

    pub(crate) fn count(&self) -> usize {
        self.results.borrow().len()
    }

    pub(crate) fn results(&self) -> Vec<ImageResult<u32>> {
        self.results.borrow().clone()
    }

    /// The most recent result, which must be a sprite.
    pub(crate) fn sprite(&self) -> AtlasSprite<u32> {
        match self.results.borrow().last() {
            Some(Ok(sprite)) => *sprite,
            other => panic!("expected a sprite, got {other:?}"),
        }
    }

    /// The most recent result, which must be an error.
    pub(crate) fn error_kind(&self) -> ErrorKind {
        match self.results.borrow().last() {
            Some(Err(err)) => err.kind(),
            other => panic!("expected an error, got {other:?}"),
        }
    }
}

/// A cache together with the mock loader and surfaces it talks to.
pub(crate) struct TestEnv {
    pub(crate) loader: MockLoader,
    pub(crate) surfaces: RecordingSurfaces,
    pub(crate) cache: TestCache,
}

impl TestEnv {
    pub(crate) fn new(group: AtlasGroup) -> Self {
        Self::with_config(group, AtlasConfig::default())
    }

    pub(crate) fn with_config(group: AtlasGroup, config: AtlasConfig) -> Self {
        Self {
            loader: MockLoader::default(),
            surfaces: RecordingSurfaces::default(),
            cache: TestCache::new(group, config),
        }
    }

    /// Registers square images, all of side `side`.
    pub(crate) fn with_images(mut self, paths: &[&str], side: u32) -> Self {
        for path in paths {
            self.loader.add_image(path, side, side);
        }
        self
    }

    pub(crate) fn request(&mut self, path: &str, gray: bool, mode: LoadMode, recorder: &Recorder) {
        self.cache.request_image(
            &mut self.loader,
            &mut self.surfaces,
            path,
            gray,
            mode,
            recorder.subscriber(),
        );
    }

    /// Synchronous colour request.
    pub(crate) fn request_sync(&mut self, path: &str, recorder: &Recorder) {
        self.request(path, false, LoadMode::Sync, recorder);
    }

    pub(crate) fn release(&mut self, path: &str, gray: bool, recorder: &Recorder) {
        self.cache.release_image(path, gray, &recorder.subscriber());
    }

    pub(crate) fn poll(&mut self) {
        self.cache.poll(&mut self.loader, &mut self.surfaces);
    }
}

/// Small deterministic generator for randomized sequences.
pub(crate) struct Lcg(u32);

impl Lcg {
    pub(crate) fn new(seed: u32) -> Self {
        Self(seed)
    }

    /// A value in `0..bound`.
    pub(crate) fn below(&mut self, bound: u32) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) % bound
    }
}
