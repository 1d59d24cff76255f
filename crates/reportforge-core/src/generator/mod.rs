// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Source generator module - LaTeX document generation.

pub mod openai;
mod backend;
mod source;

pub use backend::*;
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use source::*;
