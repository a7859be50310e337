//! Core types and trait definitions for the hirebot tenant store.
//!
//! No HTTP or database dependencies live here. Every row it describes
//! belongs to exactly one [`company::Company`], and every store operation
//! that touches tenant data takes an explicit [`tenant::Tenant`].

pub mod change;
pub mod company;
pub mod credential;
pub mod error;
pub mod event;
pub mod kind;
pub mod resource;
pub mod store;
pub mod tenant;
pub mod validate;

pub use error::{Error, Result};
