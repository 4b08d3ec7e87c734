// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image cache key.

use alloc::sync::Arc;
use core::fmt;

/// Unique identifier for a cached image.
///
/// Grayscale and colour variants of the same source are distinct keys: the
/// grayscale transform is baked into the page pixels when the image is drawn,
/// so the two variants cannot share an allocation.
///
/// Displays as the source path, prefixed with `#` for the grayscale variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey {
    path: Arc<str>,
    gray: bool,
}

impl ImageKey {
    /// Creates a key for `path`.
    pub fn new(path: impl Into<Arc<str>>, gray: bool) -> Self {
        Self {
            path: path.into(),
            gray,
        }
    }

    /// The source path of the image.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The source path, shared.
    #[inline]
    pub(crate) fn shared_path(&self) -> &Arc<str> {
        &self.path
    }

    /// Whether this is the grayscale variant.
    #[inline]
    pub fn is_gray(&self) -> bool {
        self.gray
    }

    /// Borrowed form of this key.
    #[inline]
    pub fn as_key_ref(&self) -> ImageKeyRef<'_> {
        ImageKeyRef::new(&self.path, self.gray)
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_key_ref(), f)
    }
}

/// Borrowed lookup key, so that requests for an already cached image do not
/// allocate.
///
/// Hashes identically to the equivalent [`ImageKey`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageKeyRef<'a> {
    path: &'a str,
    gray: bool,
}

impl<'a> ImageKeyRef<'a> {
    /// Creates a borrowed key for `path`.
    #[inline]
    pub fn new(path: &'a str, gray: bool) -> Self {
        Self { path, gray }
    }

    /// The source path of the image.
    #[inline]
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Whether this is the grayscale variant.
    #[inline]
    pub fn is_gray(&self) -> bool {
        self.gray
    }
}

impl hashbrown::Equivalent<ImageKey> for ImageKeyRef<'_> {
    fn equivalent(&self, other: &ImageKey) -> bool {
        self.gray == other.gray && self.path == &*other.path
    }
}

impl From<ImageKeyRef<'_>> for ImageKey {
    fn from(key: ImageKeyRef<'_>) -> Self {
        Self::new(key.path, key.gray)
    }
}

impl fmt::Display for ImageKeyRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gray {
            write!(f, "#{}", self.path)
        } else {
            f.write_str(self.path)
        }
    }
}
