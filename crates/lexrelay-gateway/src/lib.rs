// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated HTTP surface for the Lexrelay service.
//!
//! Exposes the delivery queue, QA pipeline, knowledge search, and WeCom
//! callback over a bearer-protected axum REST API. `/health` is public
//! for liveness probes.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState};
