//! Session layer for the sales dashboard.
//!
//! Holds the dataset of one upload together with the selector state and
//! routes metrics, breakdowns and questions to the data layer.

pub mod session;

pub use sales_core as core;
pub use sales_data as data;
