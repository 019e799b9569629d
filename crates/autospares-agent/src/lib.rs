// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shopping assistant engine for the AutoSpares backend.
//!
//! - [`session`] binds requests to chat sessions and mints tokens
//! - [`cart`] mirrors client carts and fans changes out through [`events`]
//! - [`checkout`] applies shipping/VAT rules and places orders
//! - [`payments`] drives M-Pesa STK pushes and reconciles callbacks
//! - [`tools`] exposes all of the above to the model
//! - [`engine`] runs the two-pass function-calling chat loop

pub mod cart;
pub mod checkout;
pub mod engine;
pub mod events;
pub mod history;
pub mod payments;
pub mod session;
pub mod tools;

pub use cart::CartService;
pub use checkout::{CheckoutTotals, OrderService, PlacedOrder, compute_totals};
pub use engine::{APOLOGY, ChatEngine, ChatReply, ChatRequest};
pub use events::CartEvents;
pub use history::ToolResult;
pub use payments::{CallbackOutcome, InitiatedPayment, PaymentService, PaymentView};
pub use session::{ResolvedSession, SessionResolver};
pub use tools::{Tool, ToolContext, ToolOutput, ToolRegistry, ToolServices};
