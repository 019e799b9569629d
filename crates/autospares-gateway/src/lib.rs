// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP and WebSocket API for the AutoSpares storefront.
//!
//! Routes:
//! - `POST /v1/sessions`, `POST /v1/chat`
//! - `GET|PUT /v1/cart`, `POST /v1/orders` (require `x-session-token`)
//! - `POST /v1/mpesa/stk-push`, `POST /v1/mpesa/callback`, `GET /v1/payments/{id}`
//! - `POST /v1/invoices/send`
//! - `GET /ws?token=...` for cart push
//! - `GET /health`

pub mod error;
pub mod handlers;
pub mod server;
pub mod session;
pub mod ws;

pub use error::{ApiError, ErrorResponse};
pub use server::{AppState, router, serve, start_server};
pub use session::SESSION_HEADER;
