//! Concrete test frameworks and the factory that wires them from config.

pub mod factory;
pub mod frameworks;
