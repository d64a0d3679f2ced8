//! Application layer containing the transaction orchestration.
//!
//! `TransactionCoordinator` is the entry point: it validates, builds the
//! payload, picks live or test, talks to the gateway through the transport
//! port and drives the strong-authentication state machine.

pub mod classifier;
pub mod coordinator;
pub mod payload;
pub mod transaction_log;
