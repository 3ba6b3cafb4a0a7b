//! keyword-scout: keyword stats and bid estimates from the Naver Search Ad API
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod api;
pub mod config;
pub mod engine;
pub mod sanitize;
pub mod storage;
pub mod types;
