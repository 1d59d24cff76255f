// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reportforge Server - HTTP API for report generation
//!
//! Exposes the report pipeline of `reportforge-core` over HTTP:
//! - `POST /reports/generate` runs the pipeline synchronously
//! - `GET /reports/{report_id}` returns the report record
//! - `GET /reports/download/{report_id}` returns the compiled PDF in one body
//! - `GET /healthz` reports liveness
//!
//! Configuration comes from environment variables, see [`config::Config`].

#![deny(missing_docs)]

/// HTTP routes and handlers.
pub mod api;

/// Configuration loading from environment variables.
pub mod config;

/// HTTP error responses.
pub mod error;

/// Service wiring and the server loop.
pub mod server;

pub use api::{AppState, router};
pub use config::Config;
pub use error::ApiError;
pub use server::{StartupError, build_service, serve};
