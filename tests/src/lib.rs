//! End-to-end tests for schema loading and resolution

mod driver;
mod types;
mod uses;
#[cfg(test)]
mod utils;
