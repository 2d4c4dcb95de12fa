//! Shared utilities for the healthcare warehouse crates.
//!
//! This crate provides Polars cell conversions and the column helpers used by
//! the ingest, cleaning and transform stages.

pub mod cells;
pub mod frame;

pub use frame::{
    cell_text, column_names, f64_column, filter_rows, has_column, i64_column, row_key,
    set_f64_column, set_i64_column, set_text_column, text_column,
};
pub use cells::{
    NULL_TOKENS, any_to_f64, any_to_i64, any_to_string, any_to_text, format_numeric, is_null_token,
    parse_f64, parse_i64,
};
