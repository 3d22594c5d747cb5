//! Operation adapters: one module per protocol capability.
//!
//! Every adapter is a pure function of `(&AgentContext, typed request)` to
//! `(typed result | OpError)` with exactly one logical external side effect.
//! Request structs reject unknown fields and validate before any network
//! call; adapters keep no state between invocations.

pub mod balance;
pub mod burn;
pub mod deploy;
pub mod faucet;
pub mod launch;
pub mod lend;
pub mod pool;
pub mod price;
pub mod stake;
pub mod tps;
pub mod trade;
pub mod transfer;
