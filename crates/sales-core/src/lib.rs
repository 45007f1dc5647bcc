//! Core types for the sales dashboard.
//!
//! Records and datasets, lenient cell coercion, number formatting, CLI
//! settings and the shared error type.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, SalesError};
