//! Scalar functions over a single raw play descriptor.

use duckdb::{
    Result,
    core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId},
    vscalar::{ScalarFunctionSignature, VScalar},
    vtab::arrow::WritableVector,
};
use std::error::Error;

use crate::aggregate::derive_play;
use crate::ext::scalar::{invoke_unary_varchar_to_u64_nullable, invoke_unary_varchar_to_varchar};
use crate::json::{derived_play_to_json, play_error_to_json};

fn varchar_signature(output: LogicalTypeId) -> Vec<ScalarFunctionSignature> {
    vec![ScalarFunctionSignature::exact(
        vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)],
        LogicalTypeHandle::from(output),
    )]
}

fn play_json(raw: &str) -> String {
    match derive_play(raw) {
        Ok(play) => derived_play_to_json(raw, &play),
        Err(err) => play_error_to_json(raw, &err),
    }
}

fn basic_play(raw: &str) -> Option<String> {
    derive_play(raw).ok()?.basic_play_desc
}

fn full_play(raw: &str) -> Option<String> {
    derive_play(raw).ok()?.full_play_desc
}

fn outs_on_play(raw: &str) -> Option<u64> {
    derive_play(raw).ok().map(|play| play.outs_on_play() as u64)
}

fn runs_scored(raw: &str) -> Option<u64> {
    derive_play(raw).ok().map(|play| play.runs_scored() as u64)
}

pub struct RetrosheetPlayJsonScalar;

impl VScalar for RetrosheetPlayJsonScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, |raw| Some(play_json(raw)))
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_signature(LogicalTypeId::Varchar)
    }
}

pub struct RetrosheetBasicPlayScalar;

impl VScalar for RetrosheetBasicPlayScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, basic_play)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_signature(LogicalTypeId::Varchar)
    }
}

pub struct RetrosheetFullPlayScalar;

impl VScalar for RetrosheetFullPlayScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, full_play)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_signature(LogicalTypeId::Varchar)
    }
}

pub struct RetrosheetOutsOnPlayScalar;

impl VScalar for RetrosheetOutsOnPlayScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_u64_nullable(input, output, outs_on_play)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_signature(LogicalTypeId::UBigint)
    }
}

pub struct RetrosheetRunsScoredScalar;

impl VScalar for RetrosheetRunsScoredScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_u64_nullable(input, output, runs_scored)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        varchar_signature(LogicalTypeId::UBigint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_json_on_success_and_error() {
        let json = play_json("S9.2-H");
        assert!(json.contains(r#""basic_play":"Hit - Single""#));
        assert!(json.contains(r#""runs_scored":1"#));

        let json = play_json("46(1");
        assert!(json.contains(r#""raw":"46(1""#));
        assert!(json.contains(r#""error":"Syntax error"#));
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(basic_play("64(1)3/GDP").as_deref(), Some("Double Play"));
        assert_eq!(full_play("K+WP.B-1").as_deref(), Some("Strikeout - Wild Pitch"));
        assert_eq!(basic_play("46(1"), None);
        assert_eq!(full_play(""), None);
    }

    #[test]
    fn test_counts() {
        assert_eq!(outs_on_play("5(2)4(1)3/GTP"), Some(3));
        assert_eq!(outs_on_play("S8.2XH(E5)"), Some(0));
        assert_eq!(runs_scored("HR/F78.2-H;1-H"), Some(3));
        assert_eq!(runs_scored("46)1("), None);
    }
}
