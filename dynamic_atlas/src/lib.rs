// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic Atlas packs many independently loaded images into a few shared,
//! fixed-size atlas pages at runtime, so that UI elements drawing different
//! images can still batch into few draw calls.
//!
//! The crate provides:
//! - [`RectanglePacker`]: the per-page bin packer
//! - [`DynamicAtlasCache`]: the per-key request/release protocol with
//!   reference counting, callback fan-out, sticky slots, page reflow and growth
//! - [`AtlasGroupRegistry`]: one cache per page size class, sharing a pool of
//!   recycled cache entries
//!
//! Loading, surface allocation and blitting are supplied by the host through
//! the [`AssetLoader`], [`SurfaceAllocator`] and [`Blitter`] traits.
//!
//! ## Features
//!
//! - `std` (enabled by default): Enables `std` support in the logging facade.
//! - `pixmap` (enabled by default): A CPU reference backend storing pages in
//!   Vello [`Pixmap`](vello_common::pixmap::Pixmap)s.
//! - `png`: Lets the CPU backend dump atlas pages to PNG files.

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod backend;
mod cache;
mod entry;
mod error;
mod key;
mod packer;
mod page;
mod region;
mod registry;

pub mod renderers;

pub use backend::{
    AssetLoader, Blitter, LoadHandle, LoadMode, LoadStatus, SourceImage, SurfaceAllocator,
};
pub use cache::{AtlasStats, DynamicAtlasCache, LiveKey};
pub use entry::{AtlasSprite, EntryState, ImageResult, Subscriber};
pub use error::{Error, ErrorKind};
pub use key::{ImageKey, ImageKeyRef};
pub use packer::RectanglePacker;
pub use page::{AtlasConfig, AtlasGroup, AtlasPage, DEFAULT_INITIAL_PAGES, DEFAULT_PADDING};
pub use region::{DrawTarget, PackedRect, PixelRect, UvRect};
pub use registry::AtlasGroupRegistry;
