//! Step definitions for project lifecycle scenarios.

pub mod then;
