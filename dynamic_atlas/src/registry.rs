// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One cache per page size class.

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::{Debug, Formatter};
use hashbrown::HashMap;

use crate::backend::{AssetLoader, Blitter, LoadMode, SurfaceAllocator};
use crate::cache::DynamicAtlasCache;
use crate::entry::{EntryPool, Subscriber};
use crate::page::{AtlasConfig, AtlasGroup};

/// Owns the cache of every [`AtlasGroup`] in use.
///
/// Caches are created on first use and live as long as the registry. All of
/// them draw their entries from one shared pool.
pub struct AtlasGroupRegistry<L: AssetLoader, S: SurfaceAllocator> {
    config: AtlasConfig,
    caches: HashMap<AtlasGroup, DynamicAtlasCache<L, S>>,
    pool: Rc<RefCell<EntryPool<S::Surface>>>,
}

impl<L, S> AtlasGroupRegistry<L, S>
where
    L: AssetLoader,
    S: SurfaceAllocator,
{
    /// Creates an empty registry whose caches all use `config`.
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            config,
            caches: HashMap::new(),
            pool: Rc::new(RefCell::new(EntryPool::new())),
        }
    }

    /// The cache for `group`, created if this is its first use.
    pub fn get_or_create_cache(&mut self, group: AtlasGroup) -> &mut DynamicAtlasCache<L, S> {
        let config = self.config;
        let pool = &self.pool;
        self.caches.entry(group).or_insert_with(|| {
            log::debug!("creating atlas cache for {group:?}");
            DynamicAtlasCache::with_pool(group, config, Rc::clone(pool))
        })
    }

    /// The cache for `group`, if it has been created.
    pub fn cache(&self, group: AtlasGroup) -> Option<&DynamicAtlasCache<L, S>> {
        self.caches.get(&group)
    }

    /// Groups that have a cache, smallest first.
    pub fn groups(&self) -> impl Iterator<Item = AtlasGroup> + '_ {
        AtlasGroup::ALL
            .into_iter()
            .filter(|group| self.caches.contains_key(group))
    }

    /// Settings applied to every cache.
    #[inline]
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Recycled entries currently waiting in the shared pool.
    pub fn pooled_entries(&self) -> usize {
        self.pool.borrow().len()
    }

    /// Releases a request made through [`request_image`](Self::request_image).
    pub fn release_image(
        &mut self,
        group: AtlasGroup,
        path: &str,
        gray: bool,
        subscriber: &Subscriber<S::Surface>,
    ) {
        match self.caches.get_mut(&group) {
            Some(cache) => cache.release_image(path, gray, subscriber),
            None => log::warn!("release of `{path}` for {group:?}, which has no cache"),
        }
    }
}

impl<L, S> AtlasGroupRegistry<L, S>
where
    L: AssetLoader,
    S: Blitter<L::Image>,
{
    /// Requests an image from the cache for `group`.
    ///
    /// See [`DynamicAtlasCache::request_image`].
    pub fn request_image(
        &mut self,
        group: AtlasGroup,
        loader: &mut L,
        surfaces: &mut S,
        path: &str,
        gray: bool,
        mode: LoadMode,
        subscriber: Subscriber<S::Surface>,
    ) {
        self.get_or_create_cache(group)
            .request_image(loader, surfaces, path, gray, mode, subscriber);
    }

    /// Polls every cache for completed loads, smallest group first.
    pub fn poll(&mut self, loader: &mut L, surfaces: &mut S) {
        for group in AtlasGroup::ALL {
            if let Some(cache) = self.caches.get_mut(&group) {
                cache.poll(loader, surfaces);
            }
        }
    }
}

impl<L, S> Default for AtlasGroupRegistry<L, S>
where
    L: AssetLoader,
    S: SurfaceAllocator,
{
    fn default() -> Self {
        Self::new(AtlasConfig::default())
    }
}

impl<L, S> Debug for AtlasGroupRegistry<L, S>
where
    L: AssetLoader,
    S: SurfaceAllocator,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let mut caches: alloc::vec::Vec<_> = self.caches.iter().collect();
        caches.sort_unstable_by_key(|(group, _)| **group);
        f.debug_struct("AtlasGroupRegistry")
            .field("config", &self.config)
            .field("caches", &caches)
            .field("pool", &self.pool.borrow())
            .finish()
    }
}
