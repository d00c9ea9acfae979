//! Telegram bot layer: dispatcher, handlers, keyboards.
//!
//! Everything here is glue between the transport (teloxide) and the core
//! crates: game rules, the session tracker, the store and the message
//! catalog. Handlers receive a shared [`context::BotContext`] through the
//! dispatcher's dependency injection — no global state.

pub mod commands;
pub mod context;
pub mod dispatcher;
pub mod handlers;
pub mod keyboards;

pub use {commands::Command, context::BotContext, dispatcher::run};
