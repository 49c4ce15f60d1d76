//! Project lifecycle management for the marketplace.
//!
//! A project moves through a fixed status machine driven by two writers: the
//! application and acceptance workflow, invoked by employers and freelancers,
//! and the reconciliation job, which re-evaluates every open project against
//! the clock. The module follows hexagonal architecture:
//!
//! - Domain types and the transition rule table in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
