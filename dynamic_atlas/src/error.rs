// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::key::ImageKey;

/// Why an image request could not produce a sprite.
///
/// Carries a non-exhaustive [`ErrorKind`] plus the key and sizes involved,
/// when they are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The non-exhaustive category describing this error.
    kind: ErrorKind,

    /// The image the request was for.
    key: Option<ImageKey>,

    /// Source image size, for size-related failures.
    image_size: Option<(u32, u32)>,

    /// Page dimension of the cache, for size-related failures.
    page_size: Option<u16>,
}

impl Error {
    /// The machine-readable category for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The image the failed request was for.
    pub fn key(&self) -> Option<&ImageKey> {
        self.key.as_ref()
    }

    /// Source image size, for [`EmptyImage`](ErrorKind::EmptyImage) and
    /// [`ImageTooLarge`](ErrorKind::ImageTooLarge).
    pub fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }

    /// Page dimension of the cache, for
    /// [`ImageTooLarge`](ErrorKind::ImageTooLarge).
    pub fn page_size(&self) -> Option<u16> {
        self.page_size
    }

    fn new(kind: ErrorKind, key: Option<ImageKey>) -> Self {
        Self {
            kind,
            key,
            image_size: None,
            page_size: None,
        }
    }

    pub(crate) fn empty_path() -> Self {
        Self::new(ErrorKind::EmptyPath, None)
    }

    pub(crate) fn load_failed(key: ImageKey) -> Self {
        Self::new(ErrorKind::LoadFailed, Some(key))
    }

    pub(crate) fn missing_asset(key: ImageKey) -> Self {
        Self::new(ErrorKind::MissingAsset, Some(key))
    }

    pub(crate) fn empty_image(key: ImageKey, width: u32, height: u32) -> Self {
        Self {
            image_size: Some((width, height)),
            ..Self::new(ErrorKind::EmptyImage, Some(key))
        }
    }

    pub(crate) fn image_too_large(key: ImageKey, width: u32, height: u32, page: u16) -> Self {
        Self {
            image_size: Some((width, height)),
            page_size: Some(page),
            ..Self::new(ErrorKind::ImageTooLarge, Some(key))
        }
    }

    pub(crate) fn page_reflowed(key: ImageKey) -> Self {
        Self::new(ErrorKind::PageReflowed, Some(key))
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ErrorKind::EmptyPath => f.write_str("image requested with an empty path"),
            ErrorKind::LoadFailed => write!(f, "failed to load {}", KeyDisplay(&self.key)),
            ErrorKind::MissingAsset => write!(
                f,
                "load of {} succeeded without an image",
                KeyDisplay(&self.key)
            ),
            ErrorKind::EmptyImage => {
                let (w, h) = self.image_size.unwrap_or_default();
                write!(f, "{} is empty ({w}x{h})", KeyDisplay(&self.key))
            }
            ErrorKind::ImageTooLarge => {
                let (w, h) = self.image_size.unwrap_or_default();
                write!(
                    f,
                    "{} ({w}x{h}) does not fit a {} pixel atlas page",
                    KeyDisplay(&self.key),
                    self.page_size.unwrap_or_default()
                )
            }
            ErrorKind::PageReflowed => write!(
                f,
                "{} was evicted by a page reflow while still loading",
                KeyDisplay(&self.key)
            ),
        }
    }
}

impl core::error::Error for Error {}

struct KeyDisplay<'a>(&'a Option<ImageKey>);

impl core::fmt::Display for KeyDisplay<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(key) => write!(f, "`{key}`"),
            None => f.write_str("image"),
        }
    }
}

/// The non-exhaustive category of an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The request had an empty path.
    EmptyPath,

    /// The loader reported [`Failed`](crate::LoadStatus::Failed).
    LoadFailed,

    /// The loader reported success but returned no image.
    MissingAsset,

    /// The loaded image has zero width or height.
    EmptyImage,

    /// The loaded image is larger than a page of this cache.
    ImageTooLarge,

    /// The image was still loading when its page was reflowed. The request
    /// stays pending and will be answered again once the load completes.
    PageReflowed,
}
