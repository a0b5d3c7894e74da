//! Thin helpers over the DuckDB C API shared by the table and scalar functions.

pub mod bind_info_ffi;
pub mod scalar;
pub mod string;
