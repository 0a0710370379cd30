//! File import and export.

pub mod export;
pub mod readings;
