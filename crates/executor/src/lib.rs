//! # Trade Execution Engine
//!
//! Turns typed signals into exchange calls. The engine owns one piece of
//! state: a per-instrument minimum-order-quantity cache, loaded once at
//! startup and read-only afterwards, from which all quantity rounding is
//! derived.
//!
//! ## Architectural Principles
//!
//! - **Gateway Abstraction:** the engine talks to `Arc<dyn ExchangeApi>`, so
//!   the live Bybit client and test doubles are interchangeable.
//! - **Fail closed, per signal:** any lookup or exchange error aborts the
//!   current signal only and is returned to the safety boundary; the engine
//!   never retries and never panics.
//!
//! ## Public API
//!
//! - `TradeExecutor`: the execution engine.
//! - `round_quantity`: the shared exchange-precision rounding rule.
//! - `ExecutorError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;

// Re-export the key components to provide a clean, public-facing API.
pub use engine::{round_quantity, TradeExecutor};
pub use error::ExecutorError;
