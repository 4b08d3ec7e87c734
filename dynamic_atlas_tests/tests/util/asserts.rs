// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Various helper functions to assert truths during testing.

use dynamic_atlas::{EntryState, PixelRect, RectanglePacker};

use super::TestCache;

/// Assert that no two padded allocations of `packer` overlap, that they stay
/// on the page and that none of them overlaps a free region.
pub(crate) fn assert_no_overlap(packer: &RectanglePacker) {
    let page = PixelRect::new(0, 0, packer.width(), packer.height());
    let boxes: Vec<_> = packer
        .allocations()
        .map(|(key, rect, _)| {
            (
                key.clone(),
                rect.padded(packer.padding(), packer.width(), packer.height()),
            )
        })
        .collect();
    for (i, (key_a, a)) in boxes.iter().enumerate() {
        assert!(page.contains(a), "{key_a} at {a:?} leaves the page");
        for (key_b, b) in &boxes[i + 1..] {
            assert!(
                !a.intersects(b),
                "{key_a} at {a:?} overlaps {key_b} at {b:?} on page {}",
                packer.page_index()
            );
        }
        for free in packer.free_regions() {
            assert!(
                !a.intersects(free),
                "{key_a} at {a:?} overlaps free region {free:?}"
            );
        }
    }
}

/// Assert the cache-wide invariants: no overlap on any page, and every ready
/// entry is backed by its page's packer and by a matching sticky slot.
pub(crate) fn assert_cache_consistent(cache: &TestCache) {
    for page in cache.pages() {
        assert_eq!(page.packer().width(), cache.page_dimension());
        assert_eq!(page.packer().page_index(), page.index());
        assert_no_overlap(page.packer());
    }
    for live in cache.live_keys() {
        assert!(live.ref_count > 0, "{} is live with no requests", live.key);
        if let EntryState::Ready { rect, .. } = live.state {
            let page = &cache.pages()[rect.page_index as usize];
            assert_eq!(
                page.packer().lookup(&live.key),
                Some(rect),
                "{} is not where its entry says",
                live.key
            );
            assert!(page.packer().is_used(&live.key), "{} is not marked used", live.key);
            assert_eq!(
                cache.sticky_rect(live.key.path(), live.key.is_gray()),
                Some(rect),
                "{} has no matching sticky slot",
                live.key
            );
        }
    }
}
