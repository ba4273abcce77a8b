//! Terminal coding assistant driven by directives embedded in model replies.
//!
//! A reply is free text in which three line markers request side effects:
//! `FILE: <path>` (followed by the file body), `DIR: <path>` and
//! `CMD: <command>`. Everything else is narration for the user. The crate
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (directive parsing, path
//!   containment, context file selection). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem store, processes,
//!   configuration, model backend). Behind traits so tests can substitute fakes.
//!
//! Orchestration modules ([`project`], [`context`], [`interpret`], [`repl`])
//! coordinate core logic with I/O to implement the interactive assistant.

pub mod context;
pub mod core;
pub mod exit_codes;
pub mod interpret;
pub mod io;
pub mod logging;
pub mod project;
pub mod repl;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
