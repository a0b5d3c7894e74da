//! `read_retrosheet_games(path, compression := ...)`: one row per game.

use crate::error::ErrorAccumulator;
use crate::events::{EventReaderState, GameOutcome};
use crate::json::{data_to_json, info_to_json, starters_to_json, substitutions_to_json};
use crate::reader::{
    ChunkWriter, ColumnDef, ColumnType, EventBindData, EventInitData, ReadNextGameOutcome,
    TableColumn, acquire_reader, park_reader, read_next_game, to_uinteger,
};
use crate::types::ParsedGame;
use chrono::NaiveDate;
use duckdb::{
    core::{DataChunkHandle, LogicalTypeHandle},
    vtab::{BindInfo, InitInfo, TableFunctionInfo, VTab},
};
use libduckdb_sys::duckdb_date;
use std::error::Error;
use std::sync::LazyLock;

static EPOCH: LazyLock<NaiveDate> =
    LazyLock::new(|| NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date"));

const GAME_DATE_FORMAT: &str = "%Y/%m/%d";
const READ_RETROSHEET_GAMES_COLUMN_COUNT: usize = 11;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum GameColumn {
    GameId = 0,
    GameDate = 1,
    VisitingTeam = 2,
    HomeTeam = 3,
    Info = 4,
    Starters = 5,
    Substitutions = 6,
    Data = 7,
    PlayCount = 8,
    ParseError = 9,
    Source = 10,
}

impl TableColumn for GameColumn {
    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        READ_RETROSHEET_GAMES_COLUMNS[self.index()].name
    }
}

const READ_RETROSHEET_GAMES_COLUMNS: [ColumnDef; READ_RETROSHEET_GAMES_COLUMN_COUNT] = [
    ColumnDef {
        name: "game_id",
        logical_type: ColumnType::Varchar,
    },
    ColumnDef {
        name: "game_date",
        logical_type: ColumnType::Date,
    },
    ColumnDef {
        name: "visiting_team",
        logical_type: ColumnType::Varchar,
    },
    ColumnDef {
        name: "home_team",
        logical_type: ColumnType::Varchar,
    },
    ColumnDef {
        name: "info",
        logical_type: ColumnType::Varchar,
    },
    ColumnDef {
        name: "starters",
        logical_type: ColumnType::Varchar,
    },
    ColumnDef {
        name: "substitutions",
        logical_type: ColumnType::Varchar,
    },
    ColumnDef {
        name: "data",
        logical_type: ColumnType::Varchar,
    },
    ColumnDef {
        name: "play_count",
        logical_type: ColumnType::UInteger,
    },
    ColumnDef {
        name: "parse_error",
        logical_type: ColumnType::Varchar,
    },
    ColumnDef {
        name: "source",
        logical_type: ColumnType::Varchar,
    },
];

/// Parses an `info,date` value (`YYYY/MM/DD`) into a DuckDB date.
///
/// An absent or blank value is NULL without an error.
fn parse_game_date(value: Option<&str>, parse_error: &mut ErrorAccumulator) -> Option<duckdb_date> {
    let s = value.map(str::trim).filter(|s| !s.is_empty())?;
    let label = "game_date";

    let date = match NaiveDate::parse_from_str(s, GAME_DATE_FORMAT) {
        Ok(date) => date,
        Err(e) => {
            parse_error.push(&format!("Conversion error: {label}='{s}' (chrono: {e})"));
            return None;
        }
    };

    let days_i64 = date.signed_duration_since(*EPOCH).num_days();
    match i32::try_from(days_i64) {
        Ok(days) => Some(duckdb_date { days }),
        Err(_) => {
            parse_error.push(&format!(
                "Conversion error: {label}='{s}' (chrono: input is out of range)"
            ));
            None
        }
    }
}

/// Everything written for one game row.
#[derive(Default)]
struct GameRowValues {
    game_id: Option<String>,
    game_date: Option<duckdb_date>,
    visiting_team: Option<String>,
    home_team: Option<String>,
    info: Option<String>,
    starters: Option<String>,
    substitutions: Option<String>,
    data: Option<String>,
    play_count: Option<u32>,
    parse_error: ErrorAccumulator,
}

impl GameRowValues {
    fn from_game(game: &ParsedGame) -> Self {
        let mut parse_error = ErrorAccumulator::default();
        for warning in &game.warnings {
            parse_error.push(warning);
        }
        let game_date = parse_game_date(game.info_value("date"), &mut parse_error);

        let failed_plays = game.plays.iter().filter(|p| p.derived.is_err()).count();
        if failed_plays > 0 {
            parse_error.push(&format!("{failed_plays} play(s) failed to parse"));
        }

        Self {
            game_id: Some(game.id.clone()),
            game_date,
            visiting_team: game.info_value("visteam").map(str::to_string),
            home_team: game.info_value("hometeam").map(str::to_string),
            info: Some(info_to_json(&game.info)),
            starters: Some(starters_to_json(&game.starters)),
            substitutions: Some(substitutions_to_json(&game.substitutions)),
            data: Some(data_to_json(&game.data)),
            play_count: Some(to_uinteger(game.plays.len())),
            parse_error,
        }
    }

    fn from_outcome(outcome: &GameOutcome) -> Self {
        match outcome {
            GameOutcome::Parsed(game) => Self::from_game(game),
            GameOutcome::Failed(message) => {
                let mut row = Self::default();
                row.parse_error.push(message);
                row
            }
        }
    }
}

fn write_game_row(
    writer: &mut ChunkWriter<'_>,
    row: GameRowValues,
    source: &str,
) -> Result<(), Box<dyn Error>> {
    let mut parse_error = row.parse_error;

    writer.write_optional_varchar(GameColumn::GameId, row.game_id.as_deref(), &mut parse_error)?;
    writer.write_optional_date(GameColumn::GameDate, row.game_date);
    writer.write_optional_varchar(
        GameColumn::VisitingTeam,
        row.visiting_team.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_varchar(
        GameColumn::HomeTeam,
        row.home_team.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_varchar(GameColumn::Info, row.info.as_deref(), &mut parse_error)?;
    writer.write_optional_varchar(
        GameColumn::Starters,
        row.starters.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_varchar(
        GameColumn::Substitutions,
        row.substitutions.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_varchar(GameColumn::Data, row.data.as_deref(), &mut parse_error)?;
    writer.write_optional_uinteger(GameColumn::PlayCount, row.play_count);
    writer.write_optional_varchar(GameColumn::Source, Some(source), &mut parse_error)?;
    writer.write_parse_error(GameColumn::ParseError, parse_error)?;

    writer.finish_row();
    Ok(())
}

pub struct ReadRetrosheetGamesVTab;

impl VTab for ReadRetrosheetGamesVTab {
    type InitData = EventInitData;
    type BindData = EventBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        EventBindData::bind(bind, &READ_RETROSHEET_GAMES_COLUMNS)
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn Error>> {
        Ok(EventInitData::new())
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn Error>> {
        let init_data = func.get_init_data();
        let bind_data = func.get_bind_data();
        let mut chunk_writer = ChunkWriter::new(output);
        let mut current_reader_state: Option<EventReaderState> = None;

        while !chunk_writer.is_full() {
            if current_reader_state.is_none() {
                current_reader_state = acquire_reader(init_data, bind_data)?;
                if current_reader_state.is_none() {
                    break;
                }
            }

            if let Some(mut reader) = current_reader_state.take() {
                let source_path = &bind_data.paths[reader.path_idx];
                match read_next_game(&mut reader, source_path) {
                    ReadNextGameOutcome::GameReady => {
                        if let Some(outcome) = reader.current_game.take() {
                            let row = GameRowValues::from_outcome(&outcome);
                            write_game_row(&mut chunk_writer, row, &bind_data.source(&reader))?;
                        }
                        current_reader_state = Some(reader);
                    }
                    ReadNextGameOutcome::ReaderFinished => {}
                }
            }
        }

        park_reader(init_data, current_reader_state)?;
        chunk_writer.set_output_len();
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        crate::reader::parameters()
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        crate::reader::named_parameters()
    }
}
