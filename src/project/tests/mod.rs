//! Unit tests for project lifecycle management.

mod support;
