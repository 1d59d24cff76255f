// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Compiler module - document compilation backends.

pub mod latex;
mod traits;

pub use latex::{LatexCompiler, LatexCompilerConfig};
pub use traits::*;
