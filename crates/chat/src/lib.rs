//! Messaging-channel seam for the cartbot ordering engine.
//!
//! This crate is the boundary between a chat transport (webhook, socket,
//! whatever carries the storefront's messages) and the engine in
//! `cartbot-core`:
//! - **Events** (`events`) - decoded inbound message envelopes
//! - **Router** (`router`) - per-turn decision: reset, menu reply, or order
//! - **Runner** (`runner`) - transport pump with reconnect policy
//!
//! The real transport integration stays outside this repository; everything
//! here talks to a [`runner::MessageTransport`] trait, and the bundled
//! implementation is a no-op used for wiring and tests.

pub mod events;
pub mod router;
pub mod runner;
