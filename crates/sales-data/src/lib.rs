//! Data layer for the sales dashboard.
//!
//! Loads spreadsheets into datasets, aggregates sales by year, month and
//! product, and answers keyword questions against a dataset.

pub mod aggregator;
pub mod loader;
pub mod query;

pub use sales_core as core;
