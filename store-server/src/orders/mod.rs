//! Order reservation module
//!
//! The order/inventory lifecycle for this store:
//!
//! - **engine**: [`ReservationEngine`], the only writer of order status and
//!   credential pools (checkout, pay, cancel, sweep)
//! - **sweeper**: [`ExpirySweeper`], the periodic task that cancels expired
//!   pending orders and returns their units
//!
//! # Lifecycle
//!
//! ```text
//! checkout ──> pending ──pay──────> completed (units disclosed)
//!                 │
//!                 └──sweep/cancel─> cancelled (units back in pool)
//! ```
//!
//! `completed` and `cancelled` are terminal. Exactly one of pay and sweep
//! wins a race on the same order; the loser observes a non-pending status.

pub mod engine;
pub mod error;
pub mod sweeper;

pub use engine::{CartLine, ReservationEngine};
pub use error::{EngineError, EngineResult};
pub use sweeper::ExpirySweeper;

#[cfg(test)]
mod tests;
