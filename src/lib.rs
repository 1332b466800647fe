//! Arbor library exports for testing

pub mod core;
pub mod surface;
pub mod tui;

#[cfg(test)]
pub mod test_support;
