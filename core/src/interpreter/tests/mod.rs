//! Tests for the interpreter
//!
//! Organized by feature area

mod helpers;

mod error_tests;
mod interceptor_tests;
