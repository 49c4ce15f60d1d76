//! Hireloop: project lifecycle reconciliation for a freelance marketplace.
//!
//! This crate owns the lifecycle of marketplace projects: the time-driven
//! status state machine, the application workflow between employers and
//! freelancers, and the periodic reconciliation job that moves projects
//! forward as their schedule boundaries pass.
//!
//! # Architecture
//!
//! Hireloop follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage, payments and locking
//! - **Adapters**: Concrete implementations of ports (`PostgreSQL`, in-memory)
//!
//! # Modules
//!
//! - [`config`]: Engine tunables loaded from the environment
//! - [`project`]: Project lifecycle domain, workflow service and
//!   reconciliation job

pub mod config;
pub mod project;
