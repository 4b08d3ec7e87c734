// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end tests against the CPU pixmap backend.

use dynamic_atlas::renderers::pixmap::{PageSurface, PixmapAtlas, PixmapLoader};
use dynamic_atlas::{
    AtlasConfig, AtlasGroup, AtlasSprite, DynamicAtlasCache, ErrorKind, ImageResult, LoadMode,
    Subscriber,
};
use std::cell::RefCell;
use std::rc::Rc;
use vello_common::pixmap::Pixmap;

type PixmapCache = DynamicAtlasCache<PixmapLoader, PixmapAtlas>;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 128, 0, 255];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

fn solid(width: u16, height: u16, rgba: [u8; 4]) -> Pixmap {
    let mut pixmap = Pixmap::new(width, height);
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
    pixmap
}

fn pixel(pixmap: &Pixmap, x: u16, y: u16) -> [u8; 4] {
    let i = (usize::from(y) * usize::from(pixmap.width()) + usize::from(x)) * 4;
    let d = pixmap.data_as_u8_slice();
    [d[i], d[i + 1], d[i + 2], d[i + 3]]
}

struct PixmapEnv {
    loader: PixmapLoader,
    atlas: PixmapAtlas,
    cache: PixmapCache,
}

impl PixmapEnv {
    fn new() -> Self {
        Self {
            loader: PixmapLoader::new(),
            atlas: PixmapAtlas::new(),
            cache: PixmapCache::new(AtlasGroup::Size256, AtlasConfig::default()),
        }
    }

    /// Requests an image and returns everything delivered to the subscriber.
    fn request(
        &mut self,
        path: &str,
        gray: bool,
    ) -> Rc<RefCell<Vec<ImageResult<PageSurface>>>> {
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = results.clone();
        self.cache.request_image(
            &mut self.loader,
            &mut self.atlas,
            path,
            gray,
            LoadMode::Sync,
            Subscriber::new(move |result: &ImageResult<PageSurface>| {
                sink.borrow_mut().push(result.clone());
            }),
        );
        results
    }

    fn page_of(&self, sprite: &AtlasSprite<PageSurface>) -> &Pixmap {
        self.atlas.page(sprite.surface).unwrap()
    }
}

fn last_sprite(results: &RefCell<Vec<ImageResult<PageSurface>>>) -> AtlasSprite<PageSurface> {
    results.borrow().last().unwrap().clone().unwrap()
}

#[test]
fn pixmap_images_land_in_their_rectangles() {
    let mut env = PixmapEnv::new();
    env.loader.insert("red", solid(10, 10, RED));
    env.loader.insert("green", solid(6, 4, GREEN));

    let red = last_sprite(&env.request("red", false));
    let gray = last_sprite(&env.request("red", true));
    let green = last_sprite(&env.request("green", false));

    assert_eq!((red.rect.x, red.rect.y), (0, 0));
    assert_eq!((gray.rect.x, gray.rect.y), (11, 0));
    assert_eq!((green.rect.width, green.rect.height), (6, 4));
    assert_eq!(env.atlas.pages().len(), 1);

    let page = env.page_of(&red);
    assert_eq!(pixel(page, 0, 0), RED);
    assert_eq!(pixel(page, 9, 9), RED);
    // Padding column and row stay empty.
    assert_eq!(pixel(page, 10, 0), CLEAR);
    assert_eq!(pixel(page, 0, 10), CLEAR);
    assert_eq!(pixel(page, 11, 0), [76, 76, 76, 255]);
    assert_eq!(pixel(page, green.rect.x, green.rect.y), GREEN);
    assert_eq!(
        pixel(page, green.rect.x + 5, green.rect.y + 3),
        GREEN
    );
    assert_eq!(pixel(page, green.rect.x, green.rect.y + 4), CLEAR);
}

#[test]
fn pixmap_unknown_path_fails() {
    let mut env = PixmapEnv::new();
    let results = env.request("nowhere.png", false);
    let results = results.borrow();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].as_ref().unwrap_err().kind(),
        ErrorKind::LoadFailed
    );
    assert!(env.atlas.pages().is_empty());
}

#[test]
fn pixmap_reflow_clears_released_pixels() {
    let mut env = PixmapEnv::new();
    let colors = [
        [255, 0, 0, 255],
        [0, 255, 0, 255],
        [0, 0, 255, 255],
        [255, 255, 255, 255],
        [10, 20, 30, 255],
    ];
    let names = ["q0", "q1", "q2", "q3", "q4"];
    for (name, rgba) in names.iter().zip(colors) {
        env.loader.insert(*name, solid(127, 127, rgba));
    }
    let quadrants: Vec<_> = names[..4].iter().map(|name| env.request(name, false)).collect();

    // Release the two top quadrants and ask for one more image.
    let anyone = Subscriber::new(|_: &ImageResult<PageSurface>| {});
    env.cache.release_image("q0", false, &anyone);
    env.cache.release_image("q1", false, &anyone);
    let q4 = last_sprite(&env.request("q4", false));

    assert_eq!(env.cache.stats().reflows, 1);
    let q3 = last_sprite(&quadrants[3]);
    let q2 = last_sprite(&quadrants[2]);
    assert_eq!((q3.rect.x, q3.rect.y), (0, 0));
    assert_eq!((q2.rect.x, q2.rect.y), (128, 0));
    assert_eq!((q4.rect.x, q4.rect.y), (128, 128));

    let page = env.page_of(&q4);
    assert_eq!(pixel(page, 0, 0), colors[3]);
    assert_eq!(pixel(page, 128, 0), colors[2]);
    assert_eq!(pixel(page, 128, 128), colors[4]);
    assert_eq!(pixel(page, 0, 128), CLEAR, "released pixels are wiped");
}

#[test]
fn pixmap_page_can_be_saved_as_png() {
    let mut env = PixmapEnv::new();
    env.loader.insert("dot", solid(3, 3, GREEN));
    let dot = last_sprite(&env.request("dot", false));

    let dir = std::env::temp_dir().join(format!("dynamic_atlas_tests_{}", std::process::id()));
    let path = dir.join("pages").join("page_0.png");
    env.atlas.save_page_png(dot.surface, &path).unwrap();
    let written = std::fs::metadata(&path).unwrap();
    assert!(written.len() > 0);
    std::fs::remove_dir_all(&dir).unwrap();

    let unknown = PixmapAtlas::new().save_page_png(dot.surface, &path);
    assert_eq!(unknown.unwrap_err().kind(), std::io::ErrorKind::NotFound);
}
