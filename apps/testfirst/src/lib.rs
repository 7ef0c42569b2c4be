//! # testfirst
//!
//! Command-line surface of the test-first mining pipeline. The binary in
//! `main.rs` only installs logging and dispatches to [`cli::execute`].

pub mod cli;
