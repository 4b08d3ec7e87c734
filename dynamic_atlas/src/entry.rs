// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-key cache bookkeeping, result delivery and the entry pool.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};
use smallvec::SmallVec;

use crate::error::Error;
use crate::region::{PackedRect, UvRect};

/// Outcome delivered to a [`Subscriber`].
pub type ImageResult<H> = Result<AtlasSprite<H>, Error>;

/// Where a cached image can be sampled from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasSprite<H> {
    /// Surface of the page holding the image.
    pub surface: H,
    /// Pixel allocation on that page.
    pub rect: PackedRect,
    /// Sample rectangle in page-normalized coordinates, inset by half a texel.
    pub uv: UvRect,
}

impl<H> AtlasSprite<H> {
    /// Index of the page holding the image.
    #[inline]
    pub fn page_index(&self) -> u32 {
        self.rect.page_index
    }
}

/// A result callback registered with a request.
///
/// Cloning shares the callback. Two subscribers are equal iff they share the
/// same callback, which is how a release finds the subscription it undoes.
pub struct Subscriber<H>(Rc<dyn Fn(&ImageResult<H>)>);

impl<H> Subscriber<H> {
    /// Wraps `callback`.
    pub fn new(callback: impl Fn(&ImageResult<H>) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    /// Invokes the callback.
    #[inline]
    pub fn notify(&self, result: &ImageResult<H>) {
        (self.0)(result);
    }
}

impl<H> Clone for Subscriber<H> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<H> PartialEq for Subscriber<H> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<H> Eq for Subscriber<H> {}

impl<H> Debug for Subscriber<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Subscriber")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Lifecycle state of a live cache entry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum EntryState {
    /// No load in flight and no placement; the last load failed.
    #[default]
    Unrequested,
    /// Waiting for the asset loader.
    Loading,
    /// Drawn into a page.
    Ready {
        /// Pixel allocation.
        rect: PackedRect,
        /// Sample rectangle handed to subscribers.
        uv: UvRect,
    },
}

pub(crate) type SubscriberList<H> = SmallVec<[Subscriber<H>; 2]>;

/// Bookkeeping for one key with a positive reference count.
pub(crate) struct CacheEntry<H> {
    pub(crate) ref_count: u32,
    pub(crate) state: EntryState,
    /// Whether this entry counts as a user of the shared load for its path.
    pub(crate) holds_load: bool,
    /// Waiting for the next successful placement.
    pub(crate) pending: SubscriberList<H>,
    /// Already answered; notified again when the placement changes.
    pub(crate) replay: SubscriberList<H>,
}

impl<H> CacheEntry<H> {
    fn new() -> Self {
        Self {
            ref_count: 0,
            state: EntryState::Unrequested,
            holds_load: false,
            pending: SmallVec::new(),
            replay: SmallVec::new(),
        }
    }

    fn reset(&mut self) {
        self.ref_count = 0;
        self.state = EntryState::Unrequested;
        self.holds_load = false;
        self.pending.clear();
        self.replay.clear();
    }

    /// Removes the last subscription equal to `subscriber` from both lists.
    pub(crate) fn unsubscribe(&mut self, subscriber: &Subscriber<H>) {
        for list in [&mut self.pending, &mut self.replay] {
            if let Some(pos) = list.iter().rposition(|s| s == subscriber) {
                list.remove(pos);
            }
        }
    }

    /// Answered subscribers become pending again.
    pub(crate) fn requeue(&mut self) {
        let replay = core::mem::take(&mut self.replay);
        self.pending.extend(replay);
        self.state = EntryState::Loading;
    }

    /// Pending subscribers become answered.
    pub(crate) fn settle_pending(&mut self) {
        let pending = core::mem::take(&mut self.pending);
        self.replay.extend(pending);
    }
}

impl<H> Debug for CacheEntry<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("ref_count", &self.ref_count)
            .field("state", &self.state)
            .field("holds_load", &self.holds_load)
            .field("pending", &self.pending.len())
            .field("replay", &self.replay.len())
            .finish()
    }
}

/// Recycled [`CacheEntry`] values, kept to avoid allocation churn.
pub(crate) struct EntryPool<H> {
    free: Vec<CacheEntry<H>>,
}

impl<H> EntryPool<H> {
    pub(crate) fn new() -> Self {
        Self { free: Vec::new() }
    }

    /// Pops a recycled entry or builds a new one.
    pub(crate) fn acquire(&mut self) -> CacheEntry<H> {
        self.free.pop().unwrap_or_else(CacheEntry::new)
    }

    /// Resets `entry` and keeps it for reuse. Subscriber list capacity is
    /// retained.
    pub(crate) fn recycle(&mut self, mut entry: CacheEntry<H>) {
        entry.reset();
        self.free.push(entry);
    }

    pub(crate) fn len(&self) -> usize {
        self.free.len()
    }
}

impl<H> Debug for EntryPool<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EntryPool")
            .field("free", &self.free.len())
            .finish()
    }
}
