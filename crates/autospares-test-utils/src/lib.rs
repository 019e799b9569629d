// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for AutoSpares integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without Gemini, Daraja or SMTP.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted LLM responses, records every request
//! - [`MockPaymentGateway`] - accepts (or rejects) STK pushes
//! - [`MockMailer`] - captures invoices instead of sending them
//! - [`TestHarness`] - temp SQLite plus every service wired together

pub mod harness;
pub mod mock_mailer;
pub mod mock_payment;
pub mod mock_provider;
pub mod storage;

pub use harness::TestHarness;
pub use mock_mailer::MockMailer;
pub use mock_payment::MockPaymentGateway;
pub use mock_provider::MockProvider;
