//! Domain layer: value types, the strong-authentication state machine and the
//! ports the application layer talks through.

pub mod address;
pub mod amount;
pub mod browser;
pub mod card;
pub mod gateway;
pub mod ports;
pub mod reference;
pub mod response;
pub mod strong_auth;
pub mod transaction;
