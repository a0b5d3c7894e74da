//! Shared DuckDB scalar invoke helpers.
//!
//! # Safety
//! These helpers MUST only be called from within a DuckDB scalar `invoke()` while the
//! underlying vectors are valid. A NULL input row always produces a NULL output row.

use std::error::Error;
use std::ffi::CString;

use duckdb::{
    Result,
    core::{DataChunkHandle, FlatVector, Inserter, LogicalTypeId},
    vtab::arrow::WritableVector,
};
use libduckdb_sys::duckdb_string_t;

use super::string::decode_duckdb_string;

fn ensure_type(
    vec: &FlatVector,
    expected: LogicalTypeId,
    label: &str,
) -> Result<(), Box<dyn Error>> {
    let actual = vec.logical_type().id();
    if actual != expected {
        return Err(format!(
            "scalar helper type mismatch: {label} expected {expected:?}, got {actual:?}"
        )
        .into());
    }
    Ok(())
}

/// Invoke a unary `VARCHAR -> VARCHAR` scalar; `None` from `f` writes NULL.
pub fn invoke_unary_varchar_to_varchar<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> Option<String>,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Varchar, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(*s) };
        match f(val.as_ref()) {
            Some(v) => output_vec.insert(i, CString::new(v.replace('\0', " "))?),
            None => output_vec.set_null(i),
        }
    }

    Ok(())
}

/// Invoke a unary `VARCHAR -> UBIGINT` scalar; `None` from `f` writes NULL.
pub fn invoke_unary_varchar_to_u64_nullable<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> Option<u64>,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::UBigint, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(*s) };
        match f(val.as_ref()) {
            Some(v) => output_vec.as_mut_slice::<u64>()[i] = v,
            None => output_vec.set_null(i),
        }
    }

    Ok(())
}
