//! `read_retrosheet(path, compression := ...)`: one row per play.

use crate::assemble::{PlayRow, play_row};
use crate::error::ErrorAccumulator;
use crate::events::{EventReaderState, GameOutcome};
use crate::json::{advances_to_json, players_out_to_json};
use crate::reader::{
    ChunkWriter, ColumnDef, ColumnType, EventBindData, EventInitData, ReadNextGameOutcome,
    TableColumn, acquire_reader, park_reader, read_next_game, to_uinteger,
};
use duckdb::{
    core::{DataChunkHandle, LogicalTypeHandle},
    vtab::{BindInfo, InitInfo, TableFunctionInfo, VTab},
};
use std::error::Error;

const READ_RETROSHEET_COLUMN_COUNT: usize = 17;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PlayColumn {
    GameId = 0,
    PlayNum = 1,
    Inning = 2,
    Team = 3,
    PlayerId = 4,
    Count = 5,
    PitchSequence = 6,
    Play = 7,
    Comment = 8,
    BasicPlay = 9,
    FullPlay = 10,
    PlayersOut = 11,
    OutsOnPlay = 12,
    Advances = 13,
    RunsScored = 14,
    ParseError = 15,
    Source = 16,
}

impl TableColumn for PlayColumn {
    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        READ_RETROSHEET_COLUMNS[self.index()].name
    }
}

const fn column(name: &'static str, logical_type: ColumnType) -> ColumnDef {
    ColumnDef { name, logical_type }
}

const READ_RETROSHEET_COLUMNS: [ColumnDef; READ_RETROSHEET_COLUMN_COUNT] = [
    column("game_id", ColumnType::Varchar),
    column("play_num", ColumnType::UInteger),
    column("inning", ColumnType::UInteger),
    column("team", ColumnType::UInteger),
    column("player_id", ColumnType::Varchar),
    column("count", ColumnType::Varchar),
    column("pitch_sequence", ColumnType::Varchar),
    column("play", ColumnType::Varchar),
    column("comment", ColumnType::Varchar),
    column("basic_play", ColumnType::Varchar),
    column("full_play", ColumnType::Varchar),
    column("players_out", ColumnType::Varchar),
    column("outs_on_play", ColumnType::UInteger),
    column("advances", ColumnType::Varchar),
    column("runs_scored", ColumnType::UInteger),
    column("parse_error", ColumnType::Varchar),
    column("source", ColumnType::Varchar),
];

/// Everything written for one play row, computed outside the chunk writer.
#[derive(Debug, Default, PartialEq)]
struct PlayRowValues {
    game_id: Option<String>,
    play_num: Option<u32>,
    inning: Option<u32>,
    team: Option<u32>,
    player_id: Option<String>,
    count: Option<String>,
    pitch_sequence: Option<String>,
    play: Option<String>,
    comment: Option<String>,
    basic_play: Option<String>,
    full_play: Option<String>,
    players_out: Option<String>,
    outs_on_play: Option<u32>,
    advances: Option<String>,
    runs_scored: Option<u32>,
    parse_errors: Vec<String>,
}

impl PlayRowValues {
    fn from_play(play: &PlayRow<'_>) -> Self {
        let record = play.record;
        let mut row = Self {
            game_id: Some(play.key.game_id.to_string()),
            play_num: Some(to_uinteger(play.key.play_num)),
            inning: record.inning,
            team: record.team,
            player_id: Some(record.player_id.clone()),
            count: Some(record.count.clone()),
            pitch_sequence: Some(record.pitch_sequence.clone()),
            play: Some(record.play.clone()),
            comment: record.comment.clone(),
            ..Self::default()
        };

        match &record.derived {
            Ok(derived) => {
                row.basic_play = derived.basic_play_desc.clone();
                row.full_play = derived.full_play_desc.clone();
                row.players_out = Some(players_out_to_json(derived.players_out));
                row.outs_on_play = Some(to_uinteger(derived.outs_on_play()));
                row.advances = Some(advances_to_json(&derived.advances));
                row.runs_scored = Some(to_uinteger(derived.runs_scored()));
                row.parse_errors.extend(derived.anomalies.iter().cloned());
            }
            Err(err) => row.parse_errors.push(err.to_string()),
        }
        row
    }

    fn from_failure(message: &str) -> Self {
        Self {
            parse_errors: vec![message.to_string()],
            ..Self::default()
        }
    }
}

fn write_play_row(
    writer: &mut ChunkWriter<'_>,
    row: &PlayRowValues,
    source: &str,
) -> Result<(), Box<dyn Error>> {
    let mut parse_error = ErrorAccumulator::default();
    for message in &row.parse_errors {
        parse_error.push(message);
    }

    writer.write_optional_varchar(PlayColumn::GameId, row.game_id.as_deref(), &mut parse_error)?;
    writer.write_optional_uinteger(PlayColumn::PlayNum, row.play_num);
    writer.write_optional_uinteger(PlayColumn::Inning, row.inning);
    writer.write_optional_uinteger(PlayColumn::Team, row.team);
    writer.write_optional_varchar(
        PlayColumn::PlayerId,
        row.player_id.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_varchar(PlayColumn::Count, row.count.as_deref(), &mut parse_error)?;
    writer.write_optional_varchar(
        PlayColumn::PitchSequence,
        row.pitch_sequence.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_varchar(PlayColumn::Play, row.play.as_deref(), &mut parse_error)?;
    writer.write_optional_varchar(PlayColumn::Comment, row.comment.as_deref(), &mut parse_error)?;
    writer.write_optional_varchar(
        PlayColumn::BasicPlay,
        row.basic_play.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_varchar(
        PlayColumn::FullPlay,
        row.full_play.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_varchar(
        PlayColumn::PlayersOut,
        row.players_out.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_uinteger(PlayColumn::OutsOnPlay, row.outs_on_play);
    writer.write_optional_varchar(
        PlayColumn::Advances,
        row.advances.as_deref(),
        &mut parse_error,
    )?;
    writer.write_optional_uinteger(PlayColumn::RunsScored, row.runs_scored);
    writer.write_optional_varchar(PlayColumn::Source, Some(source), &mut parse_error)?;
    writer.write_parse_error(PlayColumn::ParseError, parse_error)?;

    writer.finish_row();
    Ok(())
}

/// Next row of the reader's current game, advancing its play cursor.
///
/// `None` means the current game is exhausted.
fn next_row(reader: &mut EventReaderState) -> Option<PlayRowValues> {
    match reader.current_game.as_ref()? {
        GameOutcome::Parsed(game) => {
            let play = play_row(game, reader.next_play)?;
            reader.next_play += 1;
            Some(PlayRowValues::from_play(&play))
        }
        GameOutcome::Failed(message) => {
            let row = PlayRowValues::from_failure(message);
            reader.current_game = None;
            Some(row)
        }
    }
}

pub struct ReadRetrosheetVTab;

impl VTab for ReadRetrosheetVTab {
    type InitData = EventInitData;
    type BindData = EventBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn Error>> {
        EventBindData::bind(bind, &READ_RETROSHEET_COLUMNS)
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
                if let Some(row) = next_row(&mut reader) {
                    write_play_row(&mut chunk_writer, &row, &bind_data.source(&reader))?;
                    current_reader_state = Some(reader);
                    continue;
                }

                let source_path = &bind_data.paths[reader.path_idx];
                match read_next_game(&mut reader, source_path) {
                    ReadNextGameOutcome::GameReady => current_reader_state = Some(reader),
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
