//! Core of the test executor.
//!
//! Turns test cases (or project files that declare them) into child processes,
//! classifies how each process ended and pushes the outcome to a recorder. A
//! run can be canceled from another thread while it is in flight.

pub mod api;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod model;
pub mod recorder;
pub mod runner;
