// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-group image cache: request/release protocol, placement, reflow and
//! page growth.

use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt::{Debug, Formatter};
use hashbrown::HashMap;
use log::{debug, error, warn};

use crate::backend::{
    AssetLoader, Blitter, LoadHandle, LoadMode, LoadStatus, SourceImage, SurfaceAllocator,
};
use crate::entry::{AtlasSprite, CacheEntry, EntryPool, EntryState, ImageResult, Subscriber};
use crate::error::Error;
use crate::key::{ImageKey, ImageKeyRef};
use crate::page::{AtlasConfig, AtlasGroup, AtlasPage};
use crate::region::{DrawTarget, PackedRect, PixelRect, UvRect};

/// Counters describing what a cache has done so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AtlasStats {
    /// Calls to [`DynamicAtlasCache::request_image`].
    pub requests: u64,
    /// Requests answered from a sticky slot without a redraw.
    pub sticky_hits: u64,
    /// Calls into [`AssetLoader::load`].
    pub loads_issued: u64,
    /// Images drawn into a page.
    pub blits: u64,
    /// Pages cleared and re-packed.
    pub reflows: u64,
    /// Pages created.
    pub pages_created: u64,
}

/// A live key, as reported by [`DynamicAtlasCache::live_keys`].
#[derive(Clone, Debug, PartialEq)]
pub struct LiveKey {
    /// The cached image.
    pub key: ImageKey,
    /// Outstanding requests.
    pub ref_count: u32,
    /// Current state of the entry.
    pub state: EntryState,
}

/// Packs images of one [`AtlasGroup`] into same-sized pages.
///
/// Requests are reference counted per [`ImageKey`]. Concurrent requests for a
/// key that is still loading share one load and are all answered when it
/// completes. Once placed, an image keeps its rectangle (its "sticky slot")
/// even after the last release, so a later request is answered without
/// loading or drawing again. Sticky slots are only lost when their page is
/// reflowed to make room.
///
/// The cache itself never blocks. Asynchronous loads are picked up by
/// [`poll`](Self::poll), which the host calls once per frame.
pub struct DynamicAtlasCache<L: AssetLoader, S: SurfaceAllocator> {
    pages: PageSet<S::Surface>,
    table: EntryTable<S::Surface>,
    loads: LoadTable<L::Handle>,
    pool: Rc<RefCell<EntryPool<S::Surface>>>,
}

/// Pages and the placements that outlive entries.
struct PageSet<H> {
    group: AtlasGroup,
    config: AtlasConfig,
    pages: Vec<AtlasPage<H>>,
    sticky: HashMap<ImageKey, PackedRect>,
    stats: AtlasStats,
}

/// Live entries and the keys waiting on a load.
struct EntryTable<H> {
    entries: HashMap<ImageKey, CacheEntry<H>>,
    waiting: Vec<ImageKey>,
}

/// Loader handles shared by the grayscale and colour variants of a path.
struct LoadTable<Hd> {
    slots: HashMap<Arc<str>, LoadSlot<Hd>>,
}

struct LoadSlot<Hd> {
    handle: Hd,
    /// Live entries using this load.
    users: u32,
}

/// What a load has produced so far.
enum Completion<'a, I> {
    /// No load is held for the path.
    Unloaded,
    Processing,
    Loaded(&'a I),
    Failed,
    Missing,
}

impl<I> Completion<'_, I> {
    fn error(&self, key: ImageKey) -> Error {
        match self {
            Self::Missing => Error::missing_asset(key),
            _ => Error::load_failed(key),
        }
    }
}

/// How to proceed with a request after looking up its entry.
enum Outcome<H> {
    Answered,
    Retry(ImageKey),
    Fresh(Subscriber<H>),
    Corrupt(Subscriber<H>),
}

impl<L, S> DynamicAtlasCache<L, S>
where
    L: AssetLoader,
    S: SurfaceAllocator,
{
    /// Creates an empty cache with its own entry pool.
    pub fn new(group: AtlasGroup, config: AtlasConfig) -> Self {
        Self::with_pool(group, config, Rc::new(RefCell::new(EntryPool::new())))
    }

    pub(crate) fn with_pool(
        group: AtlasGroup,
        config: AtlasConfig,
        pool: Rc<RefCell<EntryPool<S::Surface>>>,
    ) -> Self {
        Self {
            pages: PageSet {
                group,
                config,
                pages: Vec::new(),
                sticky: HashMap::new(),
                stats: AtlasStats::default(),
            },
            table: EntryTable {
                entries: HashMap::new(),
                waiting: Vec::new(),
            },
            loads: LoadTable {
                slots: HashMap::new(),
            },
            pool,
        }
    }

    /// Drops one request for an image.
    ///
    /// `subscriber` must be the one passed to the matching request; it is
    /// removed from the entry's subscriptions. When the last request is
    /// released the entry is recycled and the shared load is released if no
    /// other entry uses it. The image stays in its page and can be reused by
    /// a later request.
    pub fn release_image(&mut self, path: &str, gray: bool, subscriber: &Subscriber<S::Surface>) {
        let lookup = ImageKeyRef::new(path, gray);
        let Some(entry) = self.table.entries.get_mut(&lookup) else {
            warn!("release of `{lookup}` without a matching request");
            return;
        };
        entry.unsubscribe(subscriber);
        match entry.ref_count.checked_sub(1) {
            Some(remaining) => entry.ref_count = remaining,
            None => error!("reference count underflow for `{lookup}`, clamping to zero"),
        }
        if entry.ref_count > 0 {
            return;
        }

        let Some((key, entry)) = self.table.entries.remove_entry(&lookup) else {
            return;
        };
        if let EntryState::Ready { rect, .. } = entry.state {
            if let Some(page) = self.pages.page_mut(rect.page_index) {
                page.packer.set_used(&key, false);
            }
        }
        if entry.holds_load {
            self.loads.release_user(key.path());
        }
        self.pool.borrow_mut().recycle(entry);
        debug!("`{key}` released");
    }

    /// Appends a new, empty page and returns it.
    pub fn create_page(&mut self, surfaces: &mut S) -> &AtlasPage<S::Surface> {
        let index = self.pages.create_page(surfaces);
        &self.pages.pages[index]
    }

    /// The page size class of this cache.
    #[inline]
    pub fn group(&self) -> AtlasGroup {
        self.pages.group
    }

    /// Side length of every page, in pixels.
    #[inline]
    pub fn page_dimension(&self) -> u16 {
        self.pages.group.dimension()
    }

    /// Settings this cache was built with.
    #[inline]
    pub fn config(&self) -> &AtlasConfig {
        &self.pages.config
    }

    /// Every page, in creation order.
    pub fn pages(&self) -> &[AtlasPage<S::Surface>] {
        &self.pages.pages
    }

    /// Free regions of page `page`, or `None` if there is no such page.
    pub fn free_regions(&self, page: u32) -> Option<&[PixelRect]> {
        self.pages.page(page).map(|page| page.packer.free_regions())
    }

    /// Every key with outstanding requests, ordered by key.
    pub fn live_keys(&self) -> Vec<LiveKey> {
        let mut keys: Vec<_> = self
            .table
            .entries
            .iter()
            .map(|(key, entry)| LiveKey {
                key: key.clone(),
                ref_count: entry.ref_count,
                state: entry.state,
            })
            .collect();
        keys.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        keys
    }

    /// Outstanding requests for an image; zero if it has no entry.
    pub fn ref_count(&self, path: &str, gray: bool) -> u32 {
        self.table
            .entries
            .get(&ImageKeyRef::new(path, gray))
            .map_or(0, |entry| entry.ref_count)
    }

    /// State of the entry for an image, if it has one.
    pub fn entry_state(&self, path: &str, gray: bool) -> Option<EntryState> {
        self.table
            .entries
            .get(&ImageKeyRef::new(path, gray))
            .map(|entry| entry.state)
    }

    /// The sticky slot of an image, if it still has one.
    pub fn sticky_rect(&self, path: &str, gray: bool) -> Option<PackedRect> {
        self.pages
            .sticky
            .get(&ImageKeyRef::new(path, gray))
            .copied()
    }

    /// Whether any request is waiting on an asynchronous load.
    pub fn has_pending_loads(&self) -> bool {
        !self.table.waiting.is_empty()
    }

    /// Counters accumulated since the cache was created.
    pub fn stats(&self) -> AtlasStats {
        self.pages.stats
    }
}

impl<L, S> DynamicAtlasCache<L, S>
where
    L: AssetLoader,
    S: Blitter<L::Image>,
{
    /// Requests an image and registers `subscriber` for its result.
    ///
    /// The subscriber is called immediately when the image is already in a
    /// page, or once the load completes (during this call for synchronous
    /// loads, otherwise from [`poll`](Self::poll)). It is called again if the
    /// image later moves during a page reflow. Every call must be paired with
    /// a [`release_image`](Self::release_image) using the same subscriber.
    ///
    /// An empty `path` is answered with [`ErrorKind::EmptyPath`] and leaves the
    /// cache untouched; it must not be released.
    ///
    /// [`ErrorKind::EmptyPath`]: crate::ErrorKind::EmptyPath
    pub fn request_image(
        &mut self,
        loader: &mut L,
        surfaces: &mut S,
        path: &str,
        gray: bool,
        mode: LoadMode,
        subscriber: Subscriber<S::Surface>,
    ) {
        self.pages.stats.requests += 1;
        if path.is_empty() {
            debug!("rejecting request with an empty path");
            subscriber.notify(&Err(Error::empty_path()));
            return;
        }

        let lookup = ImageKeyRef::new(path, gray);
        let outcome = match self.table.entries.get_key_value_mut(&lookup) {
            None => Outcome::Fresh(subscriber),
            Some((key, entry)) => {
                entry.ref_count += 1;
                match entry.state {
                    EntryState::Loading => {
                        entry.pending.push(subscriber);
                        Outcome::Answered
                    }
                    EntryState::Unrequested => {
                        entry.pending.push(subscriber);
                        entry.state = EntryState::Loading;
                        Outcome::Retry(key.clone())
                    }
                    EntryState::Ready { rect, uv } => {
                        if self.pages.is_consistent(key, rect) {
                            entry.replay.push(subscriber.clone());
                            let sprite = self.pages.sprite(rect, uv);
                            subscriber.notify(&Ok(sprite));
                            Outcome::Answered
                        } else {
                            error!(
                                "`{key}` points at {rect:?}, which its page no longer holds; \
                                 discarding the entry"
                            );
                            Outcome::Corrupt(subscriber)
                        }
                    }
                }
            }
        };

        match outcome {
            Outcome::Answered => {}
            Outcome::Retry(key) => {
                debug!("retrying `{key}` after a failed load");
                self.start_load(loader, surfaces, key, mode);
            }
            Outcome::Fresh(subscriber) => {
                self.request_fresh(loader, surfaces, lookup, mode, subscriber);
            }
            Outcome::Corrupt(subscriber) => {
                self.discard_entry(lookup);
                self.request_fresh(loader, surfaces, lookup, mode, subscriber);
            }
        }
    }

    /// Delivers completed asynchronous loads: places and draws their images
    /// and notifies subscribers.
    ///
    /// Images taken off a reflowed page whose asset had already been released
    /// are loaded again through `loader`.
    pub fn poll(&mut self, loader: &mut L, surfaces: &mut S) {
        let waiting = core::mem::take(&mut self.table.waiting);
        for key in waiting {
            self.complete(loader, surfaces, key);
        }
    }

    fn request_fresh(
        &mut self,
        loader: &mut L,
        surfaces: &mut S,
        lookup: ImageKeyRef<'_>,
        mode: LoadMode,
        subscriber: Subscriber<S::Surface>,
    ) {
        // Share the path allocation with an existing load when there is one.
        let key = match self.loads.slots.get_key_value(lookup.path()) {
            Some((path, _)) => ImageKey::new(path.clone(), lookup.is_gray()),
            None => ImageKey::from(lookup),
        };
        let mut entry = self.pool.borrow_mut().acquire();
        entry.ref_count = 1;
        entry.pending.push(subscriber);

        if let Some(sticky) = self.pages.take_sticky(&key) {
            self.pages.stats.sticky_hits += 1;
            debug!("`{key}` reuses its sticky slot {sticky:?}");
            let sprite = self.pages.sprite(sticky, self.pages.sample_uv(&sticky));
            // No new load: the pixels are already in place. A reflow that
            // needs them again reloads the asset.
            entry.holds_load = self.loads.join(key.path());
            self.table.entries.insert(key.clone(), entry);
            self.table.resolve(&key, sprite);
            return;
        }

        entry.state = EntryState::Loading;
        self.table.entries.insert(key.clone(), entry);
        self.start_load(loader, surfaces, key, mode);
    }

    /// Makes sure the entry for `key` uses a load, then completes it now or
    /// queues it.
    fn start_load(&mut self, loader: &mut L, surfaces: &mut S, key: ImageKey, mode: LoadMode) {
        let Some(entry) = self.table.entries.get_mut(&key) else {
            return;
        };
        let add_user = !core::mem::replace(&mut entry.holds_load, true);
        let status = self
            .loads
            .acquire(loader, key.shared_path(), mode, add_user, &mut self.pages.stats);
        if status == LoadStatus::Processing {
            self.table.waiting.push(key);
        } else {
            self.complete(loader, surfaces, key);
        }
    }

    fn complete(&mut self, loader: &mut L, surfaces: &mut S, key: ImageKey) {
        let Some(entry) = self.table.entries.get(&key) else {
            warn!("discarding completed load of `{key}`: no live entry");
            return;
        };
        if entry.state != EntryState::Loading {
            return;
        }

        let placed = match self.loads.completion(key.path()) {
            Completion::Processing => {
                self.table.waiting.push(key);
                return;
            }
            Completion::Unloaded => {
                debug!("reloading `{key}` to draw it again");
                self.start_load(loader, surfaces, key, LoadMode::Async);
                return;
            }
            Completion::Loaded(image) => {
                self.pages
                    .place(surfaces, &mut self.table, &self.loads, &key, image)
            }
            completion => Err(completion.error(key.clone())),
        };
        match placed {
            Ok(sprite) => self.table.resolve(&key, sprite),
            Err(err) => {
                error!("{err}");
                self.table.reject(&key, err);
            }
        }
    }

    /// Drops the entry for `lookup` together with its sticky slot.
    fn discard_entry(&mut self, lookup: ImageKeyRef<'_>) {
        let Some((key, entry)) = self.table.entries.remove_entry(&lookup) else {
            return;
        };
        if let Some(rect) = self.pages.sticky.remove(&key) {
            if let Some(page) = self.pages.page_mut(rect.page_index) {
                page.packer.set_used(&key, false);
            }
        }
        if entry.holds_load {
            self.loads.release_user(key.path());
        }
        self.pool.borrow_mut().recycle(entry);
    }
}

impl<H> PageSet<H>
where
    H: Copy + Debug + PartialEq,
{
    #[inline]
    fn dimension(&self) -> u16 {
        self.group.dimension()
    }

    fn page(&self, index: u32) -> Option<&AtlasPage<H>> {
        self.pages.get(index as usize)
    }

    fn page_mut(&mut self, index: u32) -> Option<&mut AtlasPage<H>> {
        self.pages.get_mut(index as usize)
    }

    fn sample_uv(&self, rect: &PackedRect) -> UvRect {
        let dim = self.dimension();
        UvRect::sample_rect(rect, dim, dim)
    }

    /// The sprite for a rectangle handed out by one of these pages.
    fn sprite(&self, rect: PackedRect, uv: UvRect) -> AtlasSprite<H> {
        AtlasSprite {
            surface: self.pages[rect.page_index as usize].surface,
            rect,
            uv,
        }
    }

    /// Whether the page of `rect` still holds it for `key`.
    fn is_consistent(&self, key: &ImageKey, rect: PackedRect) -> bool {
        self.page(rect.page_index)
            .is_some_and(|page| page.packer.lookup(key) == Some(rect))
    }

    /// The sticky slot of `key`, marked used again. Stale slots are dropped.
    fn take_sticky(&mut self, key: &ImageKey) -> Option<PackedRect> {
        let rect = *self.sticky.get(key)?;
        if !self.is_consistent(key, rect) {
            warn!("dropping stale sticky slot of `{key}`");
            self.sticky.remove(key);
            return None;
        }
        self.page_mut(rect.page_index)?.packer.set_used(key, true);
        Some(rect)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "page counts stay far below u32::MAX"
    )]
    fn create_page<A>(&mut self, surfaces: &mut A) -> usize
    where
        A: SurfaceAllocator<Surface = H> + ?Sized,
    {
        let dim = self.dimension();
        let index = self.pages.len();
        let surface = surfaces.create_surface(dim, dim);
        self.pages.push(AtlasPage::new(
            index as u32,
            surface,
            dim,
            self.config.padding,
        ));
        self.stats.pages_created += 1;
        debug!("{:?}: created page {index} ({dim}x{dim})", self.group);
        index
    }

    fn first_fit(&mut self, width: u16, height: u16, key: &ImageKey) -> Option<PackedRect> {
        self.pages
            .iter_mut()
            .find_map(|page| page.packer.allocate(width, height, key.clone()))
    }

    fn grow<A>(
        &mut self,
        surfaces: &mut A,
        width: u16,
        height: u16,
        key: &ImageKey,
    ) -> Option<PackedRect>
    where
        A: SurfaceAllocator<Surface = H> + ?Sized,
    {
        let index = self.create_page(surfaces);
        self.pages[index].packer.allocate(width, height, key.clone())
    }

    /// Draws `image` at `rect` and records the sticky slot.
    fn commit<B, I>(
        &mut self,
        surfaces: &mut B,
        key: &ImageKey,
        rect: PackedRect,
        image: &I,
    ) -> AtlasSprite<H>
    where
        B: Blitter<I, Surface = H> + ?Sized,
        I: ?Sized,
    {
        let dim = self.dimension();
        let target = DrawTarget {
            pixels: rect.pixels(),
            uv: UvRect::draw_rect(&rect, dim, dim),
        };
        let sprite = self.sprite(rect, self.sample_uv(&rect));
        surfaces.draw(sprite.surface, target, image, key.is_gray());
        self.sticky.insert(key.clone(), rect);
        self.stats.blits += 1;
        sprite
    }

    /// Finds room for a loaded image and draws it: first fit, then reflow,
    /// then a new page.
    fn place<B, Hd>(
        &mut self,
        surfaces: &mut B,
        table: &mut EntryTable<H>,
        loads: &LoadTable<Hd>,
        key: &ImageKey,
        image: &Hd::Image,
    ) -> Result<AtlasSprite<H>, Error>
    where
        Hd: LoadHandle,
        B: Blitter<Hd::Image, Surface = H> + ?Sized,
    {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(Error::empty_image(key.clone(), width, height));
        }
        let dim = self.dimension();
        let size = u16::try_from(width)
            .ok()
            .zip(u16::try_from(height).ok())
            .filter(|&(w, h)| w <= dim && h <= dim);
        let Some((w, h)) = size else {
            return Err(Error::image_too_large(key.clone(), width, height, dim));
        };

        while self.pages.len() < self.config.initial_pages {
            self.create_page(surfaces);
        }
        let rect = self
            .first_fit(w, h, key)
            .or_else(|| self.reflow_for(surfaces, table, loads, w, h, key))
            .or_else(|| self.grow(surfaces, w, h, key))
            .ok_or_else(|| Error::image_too_large(key.clone(), width, height, dim))?;
        Ok(self.commit(surfaces, key, rect, image))
    }

    /// Reflows pages with unused allocations, in order, until one of them
    /// can hold `width × height`.
    fn reflow_for<B, Hd>(
        &mut self,
        surfaces: &mut B,
        table: &mut EntryTable<H>,
        loads: &LoadTable<Hd>,
        width: u16,
        height: u16,
        key: &ImageKey,
    ) -> Option<PackedRect>
    where
        Hd: LoadHandle,
        B: Blitter<Hd::Image, Surface = H> + ?Sized,
    {
        let mut start = 0;
        while let Some(offset) = self.pages[start..]
            .iter()
            .position(|page| page.packer.has_free_capacity())
        {
            let index = start + offset;
            self.reflow_page(surfaces, table, loads, index);
            if let Some(rect) = self.pages[index].packer.allocate(width, height, key.clone()) {
                return Some(rect);
            }
            start = index + 1;
        }
        None
    }

    /// Clears page `index` and re-places every live image that was on it.
    ///
    /// Sticky slots on the page are lost. Images whose asset is still loaded
    /// are drawn again, on this page when they fit and elsewhere otherwise,
    /// and their subscribers are told the new location. Images whose asset is
    /// not loaded go back to waiting; their subscribers receive
    /// [`ErrorKind::PageReflowed`](crate::ErrorKind::PageReflowed) and are
    /// answered again later.
    fn reflow_page<B, Hd>(
        &mut self,
        surfaces: &mut B,
        table: &mut EntryTable<H>,
        loads: &LoadTable<Hd>,
        index: usize,
    ) where
        Hd: LoadHandle,
        B: Blitter<Hd::Image, Surface = H> + ?Sized,
    {
        let dim = self.dimension();
        let page = &mut self.pages[index];
        let page_index = page.index;
        debug!("{:?}: reflowing page {page_index}", self.group);
        page.packer.reset(dim, dim, self.config.padding);
        surfaces.clear(page.surface);
        self.sticky.retain(|_, rect| rect.page_index != page_index);
        self.stats.reflows += 1;

        let mut occupants: Vec<(ImageKey, PackedRect)> = table
            .entries
            .iter()
            .filter_map(|(key, entry)| match entry.state {
                EntryState::Ready { rect, .. } if rect.page_index == page_index => {
                    Some((key.clone(), rect))
                }
                _ => None,
            })
            .collect();
        occupants.sort_unstable_by_key(|(_, rect)| (rect.y, rect.x));

        for (key, old) in &occupants {
            match loads.completion(key.path()) {
                Completion::Loaded(image) => {
                    let (w, h) = (old.width, old.height);
                    let rect = self.pages[index]
                        .packer
                        .allocate(w, h, key.clone())
                        .or_else(|| self.first_fit(w, h, key))
                        .or_else(|| self.grow(surfaces, w, h, key));
                    match rect {
                        Some(rect) => {
                            let sprite = self.commit(surfaces, key, rect, image);
                            table.resolve(key, sprite);
                        }
                        None => table.evict(
                            key,
                            Error::image_too_large(
                                key.clone(),
                                u32::from(w),
                                u32::from(h),
                                dim,
                            ),
                        ),
                    }
                }
                Completion::Processing | Completion::Unloaded => table.withdraw(key),
                completion => table.evict(key, completion.error(key.clone())),
            }
        }
        debug!(
            "{:?}: page {page_index} reflowed, {} live images re-placed",
            self.group,
            occupants.len()
        );
    }
}

impl<H> EntryTable<H>
where
    H: Copy,
{
    /// Marks `key` ready and answers every subscriber.
    fn resolve(&mut self, key: &ImageKey, sprite: AtlasSprite<H>) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.state = EntryState::Ready {
            rect: sprite.rect,
            uv: sprite.uv,
        };
        let result: ImageResult<H> = Ok(sprite);
        for subscriber in entry.replay.iter().chain(&entry.pending) {
            subscriber.notify(&result);
        }
        entry.settle_pending();
    }

    /// Marks `key` failed and answers the subscribers still waiting.
    fn reject(&mut self, key: &ImageKey, error: Error) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.state = EntryState::Unrequested;
        let result: ImageResult<H> = Err(error);
        for subscriber in &entry.pending {
            subscriber.notify(&result);
        }
        entry.settle_pending();
    }

    /// Fails a placed image, answering every subscriber.
    fn evict(&mut self, key: &ImageKey, error: Error) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.requeue();
        }
        self.reject(key, error);
    }

    /// Takes a placed image back to waiting on its load.
    fn withdraw(&mut self, key: &ImageKey) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        entry.requeue();
        let result: ImageResult<H> = Err(Error::page_reflowed(key.clone()));
        for subscriber in &entry.pending {
            subscriber.notify(&result);
        }
        self.waiting.push(key.clone());
    }
}

impl<Hd: LoadHandle> LoadTable<Hd> {
    /// Makes sure a usable load exists for `path` and returns its status.
    ///
    /// A handle that failed, or succeeded without an image, is released and
    /// replaced by a fresh load. A new slot starts with one user; an existing
    /// one gains a user if `add_user` is set.
    fn acquire<L>(
        &mut self,
        loader: &mut L,
        path: &Arc<str>,
        mode: LoadMode,
        add_user: bool,
        stats: &mut AtlasStats,
    ) -> LoadStatus
    where
        L: AssetLoader<Handle = Hd> + ?Sized,
    {
        if let Some(slot) = self.slots.get_mut(&**path) {
            if is_stale(&slot.handle) {
                debug!("reloading `{path}`");
                stats.loads_issued += 1;
                let stale = core::mem::replace(&mut slot.handle, loader.load(path, mode));
                stale.release();
            }
            if add_user {
                slot.users += 1;
            }
            return slot.handle.status();
        }

        debug!("loading `{path}` ({mode:?})");
        stats.loads_issued += 1;
        let handle = loader.load(path, mode);
        let status = handle.status();
        self.slots.insert(path.clone(), LoadSlot { handle, users: 1 });
        status
    }

    /// Adds a user to the load for `path`, if there is one.
    fn join(&mut self, path: &str) -> bool {
        match self.slots.get_mut(path) {
            Some(slot) => {
                slot.users += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one user of the load for `path`, releasing the handle with the
    /// last one.
    fn release_user(&mut self, path: &str) {
        let Some(slot) = self.slots.get_mut(path) else {
            return;
        };
        slot.users = slot.users.saturating_sub(1);
        if slot.users > 0 {
            return;
        }
        if let Some(slot) = self.slots.remove(path) {
            debug!("releasing load of `{path}`");
            slot.handle.release();
        }
    }

    fn completion(&self, path: &str) -> Completion<'_, Hd::Image> {
        let Some(slot) = self.slots.get(path) else {
            return Completion::Unloaded;
        };
        match slot.handle.status() {
            LoadStatus::Processing => Completion::Processing,
            LoadStatus::Failed => Completion::Failed,
            LoadStatus::Succeed => slot
                .handle
                .image()
                .map_or(Completion::Missing, Completion::Loaded),
        }
    }
}

fn is_stale<Hd: LoadHandle>(handle: &Hd) -> bool {
    match handle.status() {
        LoadStatus::Processing => false,
        LoadStatus::Failed => true,
        LoadStatus::Succeed => handle.image().is_none(),
    }
}

impl<L, S> Debug for DynamicAtlasCache<L, S>
where
    L: AssetLoader,
    S: SurfaceAllocator,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DynamicAtlasCache")
            .field("group", &self.pages.group)
            .field("config", &self.pages.config)
            .field("pages", &self.pages.pages)
            .field("entries", &self.table.entries.len())
            .field("sticky", &self.pages.sticky.len())
            .field("waiting", &self.table.waiting.len())
            .field("loads", &self.loads.slots.len())
            .field("pool", &self.pool.borrow().len())
            .field("stats", &self.pages.stats)
            .finish()
    }
}
