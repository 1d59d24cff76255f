// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Archive module - object storage backends and the artifact archiver.

mod archiver;
pub mod fs;
pub mod s3;
mod traits;

pub use archiver::*;
pub use fs::FsObjectStore;
pub use s3::{S3Config, S3ObjectStore};
pub use traits::*;
