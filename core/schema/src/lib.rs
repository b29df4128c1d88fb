#![warn(clippy::pedantic)]
//! Statement trees for YANG modules.
//!
//! A [`Schema`](schema::Schema) owns every statement of every loaded module in
//! one [`Arena`](arena::Arena), the [`Registry`](registry::Registry) of modules
//! with their prefix tables, and the typed [`Annotations`](annotations::Annotations)
//! that resolution passes attach to statements.
pub mod annotations;
pub mod arena;
pub mod cardinality;
pub mod errors;
pub mod findings;
pub mod keyword;
pub mod registry;
pub mod schema;
pub mod statement;

pub use schema::Schema;
