pub mod aggregate;
pub mod assemble;
pub mod classify;
pub mod error;
pub mod events;
pub mod game;
pub mod grammar;
pub mod split;
pub mod types;

mod ext;
mod games_table;
mod json;
mod log;
mod plays_table;
mod reader;
mod scalars;

use duckdb::{Connection, Result};
use duckdb_ext_macros::duckdb_extension;
use games_table::ReadRetrosheetGamesVTab;
use plays_table::ReadRetrosheetVTab;
use scalars::{
    RetrosheetBasicPlayScalar, RetrosheetFullPlayScalar, RetrosheetOutsOnPlayScalar,
    RetrosheetPlayJsonScalar, RetrosheetRunsScoredScalar,
};
use std::error::Error;

#[duckdb_extension(name = "retrosheet", api_version = "v1.0.0")]
pub unsafe fn extension_entrypoint(con: Connection) -> Result<(), Box<dyn Error>> {
    // Table functions
    con.register_table_function::<ReadRetrosheetVTab>("read_retrosheet")?;
    con.register_table_function::<ReadRetrosheetGamesVTab>("read_retrosheet_games")?;

    // Scalar functions
    con.register_scalar_function::<RetrosheetPlayJsonScalar>("retrosheet_play_json")?;
    con.register_scalar_function::<RetrosheetBasicPlayScalar>("retrosheet_basic_play")?;
    con.register_scalar_function::<RetrosheetFullPlayScalar>("retrosheet_full_play")?;
    con.register_scalar_function::<RetrosheetOutsOnPlayScalar>("retrosheet_outs_on_play")?;
    con.register_scalar_function::<RetrosheetRunsScoredScalar>("retrosheet_runs_scored")?;

    Ok(())
}
