// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations of the loader, surface and blit traits.

#[cfg(feature = "pixmap")]
pub mod pixmap;
