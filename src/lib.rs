// ABOUTME: Library root for jedi-bridge — re-exports all modules for integration testing.
// ABOUTME: The binary entry point is in main.rs, which uses this crate as a library.

pub mod app;
pub mod config;
pub mod protocol;
pub mod provider;
pub mod session;
