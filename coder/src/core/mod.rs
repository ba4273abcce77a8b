//! Deterministic, pure logic shared by the assistant.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod command;
pub mod directive;
pub mod error;
pub mod parser;
pub mod path;
pub mod preview;
pub mod selection;
