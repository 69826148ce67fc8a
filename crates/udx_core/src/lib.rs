//! User-defined load and transform stages: streaming sources, filters and
//! parsers, multi-phase partitioned transforms, and analytic functions.

pub mod analytic;
pub mod arrays;
pub mod config;
pub mod pipeline;
pub mod stream;
