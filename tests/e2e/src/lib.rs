//! End-to-end test support for the knowledge-base workspace.

pub mod harness;
