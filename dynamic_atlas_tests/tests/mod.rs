// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate contains the integration test suite for `dynamic_atlas`.
//!
//! - The `util` module contains the mock backend (a scriptable loader and a
//!   recording blitter), a test environment bundling them with a cache, and
//!   shared assertions.
//! - We do not use the default Rust test harness, but instead use this `mod.rs` file as the
//!   entry point to run all other tests, so that the utilities are shared.
//! - Put the "topic" of a test at the start of its name (`reflow_...`,
//!   `cache_...`), matching the module it lives in.

#![allow(missing_docs, reason = "we don't need docs for testing")]
#![allow(clippy::cast_possible_truncation, reason = "not critical for testing")]

mod pixmap;
mod util;
