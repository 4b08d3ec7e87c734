// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions and types shared across tests.

mod asserts;
mod backend;
mod env;

pub(crate) use asserts::{assert_cache_consistent, assert_no_overlap};
pub(crate) use backend::{MockLoader, RecordingSurfaces};
pub(crate) use env::{Lcg, Recorder, TestCache, TestEnv};
