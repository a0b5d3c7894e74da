//! Machinery shared by the event-file table functions: path expansion,
//! decompression, the reader pool and chunk writing.

use crate::error::ErrorAccumulator;
use crate::events::{EventInput, EventReaderState, GameOutcome, SharedState};
use crate::ext::bind_info_ffi::{NamedParameterVarchar, get_named_parameter_varchar};
use crate::game::format_game;
use crate::log;
use crate::types::{ParsedGame, PlayCategory};
use duckdb::{
    core::{DataChunkHandle, Inserter, LogicalTypeHandle, LogicalTypeId},
    vtab::BindInfo,
};
use libduckdb_sys::duckdb_date;
use std::borrow::Cow;
use std::error::Error;
use std::ffi::CString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use zstd::stream::read::Decoder as ZstdDecoder;

pub const PATH_PATTERN_PARAM_INDEX: u64 = 0;
pub const ROWS_PER_CHUNK: usize = 2048;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColumnType {
    Varchar,
    UInteger,
    Date,
}

impl ColumnType {
    pub fn to_handle(self) -> LogicalTypeHandle {
        match self {
            Self::Varchar => LogicalTypeHandle::from(LogicalTypeId::Varchar),
            Self::UInteger => LogicalTypeHandle::from(LogicalTypeId::UInteger),
            Self::Date => LogicalTypeHandle::from(LogicalTypeId::Date),
        }
    }
}

pub struct ColumnDef {
    pub name: &'static str,
    pub logical_type: ColumnType,
}

/// A column of one of the table functions' result sets.
pub trait TableColumn: Copy {
    fn index(self) -> usize;
    fn name(self) -> &'static str;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self, Box<dyn Error>> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(format!(
                "Invalid compression value '{}'. Supported values: 'zstd' or NULL/omitted.",
                normalized
            )
            .into())
        }
    }
}

fn resolve_compression_mode(bind: &BindInfo) -> Result<CompressionMode, Box<dyn Error>> {
    match get_named_parameter_varchar(bind, "compression")? {
        NamedParameterVarchar::Missing | NamedParameterVarchar::Null => Ok(CompressionMode::Plain),
        NamedParameterVarchar::Value(raw) if raw.trim().eq_ignore_ascii_case("null") => {
            Ok(CompressionMode::Plain)
        }
        NamedParameterVarchar::Value(raw) => CompressionMode::parse(&raw),
    }
}

/// A single path, or every match of a glob when `pattern` has `*` or `?`.
pub fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if pattern.contains('*') || pattern.contains('?') {
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();
        Ok(paths)
    } else {
        Ok(vec![PathBuf::from(pattern)])
    }
}

fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<EventInput, String> {
    let file =
        File::open(path).map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as EventInput)
            .map_err(|e| {
                format!(
                    "Failed to initialize zstd decoder for '{}': {}",
                    path.display(),
                    e
                )
            }),
    }
}

#[repr(C)]
pub struct EventBindData {
    pub paths: Vec<PathBuf>,
    pub compression: CompressionMode,
}

impl EventBindData {
    /// Reads the path and `compression` arguments and declares `columns`.
    pub fn bind(bind: &BindInfo, columns: &[ColumnDef]) -> Result<Self, Box<dyn Error>> {
        let pattern = bind.get_parameter(PATH_PATTERN_PARAM_INDEX).to_string();
        let compression = resolve_compression_mode(bind)?;
        let paths = expand_paths(&pattern)?;

        for column in columns {
            bind.add_result_column(column.name, column.logical_type.to_handle());
        }

        Ok(Self { paths, compression })
    }

    pub fn source(&self, reader: &EventReaderState) -> String {
        self.paths[reader.path_idx].display().to_string()
    }
}

#[repr(C)]
pub struct EventInitData {
    pub state: Mutex<SharedState>,
}

impl EventInitData {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SharedState {
                next_path_idx: 0,
                available_readers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SharedState>, Box<dyn Error>> {
        self.state
            .lock()
            .map_err(|_| "event reader state lock poisoned".into())
    }
}

impl Default for EventInitData {
    fn default() -> Self {
        Self::new()
    }
}

/// A parked reader if one exists, else a reader on the next unopened path.
///
/// With several paths an unopenable file is logged and skipped; a single
/// path fails the query.
pub fn acquire_reader(
    init_data: &EventInitData,
    bind_data: &EventBindData,
) -> Result<Option<EventReaderState>, Box<dyn Error>> {
    loop {
        let path_idx = {
            let mut state = init_data.lock()?;

            if let Some(reader) = state.available_readers.pop() {
                return Ok(Some(reader));
            }

            if state.next_path_idx < bind_data.paths.len() {
                let path_idx = state.next_path_idx;
                state.next_path_idx += 1;
                path_idx
            } else {
                return Ok(None);
            }
        };

        let path = &bind_data.paths[path_idx];
        match open_input_stream(path, bind_data.compression) {
            Ok(input_stream) => {
                return Ok(Some(EventReaderState::new(input_stream, path_idx)));
            }
            Err(err_msg) => {
                if bind_data.paths.len() == 1 {
                    return Err(err_msg.into());
                }

                log::warn(&err_msg);
            }
        }
    }
}

/// Returns an unfinished reader to the pool.
pub fn park_reader(
    init_data: &EventInitData,
    reader: Option<EventReaderState>,
) -> Result<(), Box<dyn Error>> {
    if let Some(reader) = reader {
        init_data.lock()?.available_readers.push(reader);
    }
    Ok(())
}

pub enum ReadNextGameOutcome {
    GameReady,
    ReaderFinished,
}

/// Counts the data-quality anomalies of a parsed game; `None` when it has none.
fn anomaly_summary(game: &ParsedGame, source_path: &Path) -> Option<String> {
    let derived = game.plays.iter().filter_map(|p| p.derived.as_ref().ok());
    let (anomalies, unclassified) = derived.fold((0, 0), |(anomalies, unclassified), play| {
        let n = play
            .categories
            .iter()
            .filter(|c| **c == PlayCategory::Unclassified)
            .count();
        (anomalies + play.anomalies.len(), unclassified + n)
    });
    if anomalies == 0 {
        return None;
    }
    Some(format!(
        "Play anomalies: file='{}'; game_id={}; anomalies={}; unclassified={}",
        source_path.display(),
        game.id,
        anomalies,
        unclassified
    ))
}

/// Reads and ingests the next game into `reader.current_game`.
pub fn read_next_game(reader: &mut EventReaderState, source_path: &Path) -> ReadNextGameOutcome {
    let game_index = reader.next_game_index;
    reader.next_play = 0;

    match reader.events.next_game() {
        Ok(Some(lines)) => {
            reader.next_game_index += 1;
            let outcome = match format_game(&lines) {
                Ok(game) => {
                    if let Some(summary) = anomaly_summary(&game, source_path) {
                        log::warn(&summary);
                    }
                    GameOutcome::Parsed(game)
                }
                Err(err) => {
                    let error_msg = format!(
                        "Parser-stage error: stage=format_game; file='{}'; game_index={}; error={}",
                        source_path.display(),
                        game_index,
                        err
                    );
                    log::warn(&error_msg);
                    GameOutcome::Failed(error_msg)
                }
            };
            reader.current_game = Some(outcome);
            ReadNextGameOutcome::GameReady
        }
        Ok(None) => {
            reader.current_game = None;
            ReadNextGameOutcome::ReaderFinished
        }
        Err(err) => {
            let error_msg = format!(
                "Read error: file='{}'; game_index={}; error={}",
                source_path.display(),
                game_index,
                err
            );
            log::error(&error_msg);
            reader.current_game = Some(GameOutcome::Failed(error_msg));
            ReadNextGameOutcome::GameReady
        }
    }
}

pub fn sanitize_for_cstring<'a>(
    value: &'a str,
    field_name: &str,
    parse_error: &mut ErrorAccumulator,
) -> Cow<'a, str> {
    if value.contains('\0') {
        parse_error.push(&format!("Sanitized interior NUL in {}", field_name));
        Cow::Owned(value.replace('\0', " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn sanitize_for_cstring_silent(value: &str) -> Cow<'_, str> {
    if value.contains('\0') {
        Cow::Owned(value.replace('\0', " "))
    } else {
        Cow::Borrowed(value)
    }
}

/// Fills one output chunk row by row.
pub struct ChunkWriter<'a> {
    output: &'a mut DataChunkHandle,
    row_count: usize,
}

impl<'a> ChunkWriter<'a> {
    pub fn new(output: &'a mut DataChunkHandle) -> Self {
        Self {
            output,
            row_count: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.row_count >= ROWS_PER_CHUNK
    }

    pub fn finish_row(&mut self) {
        self.row_count += 1;
    }

    pub fn set_output_len(&mut self) {
        self.output.set_len(self.row_count);
    }

    pub fn write_optional_varchar<C: TableColumn>(
        &mut self,
        column: C,
        value: Option<&str>,
        parse_error: &mut ErrorAccumulator,
    ) -> Result<(), Box<dyn Error>> {
        let row_idx = self.row_count;
        let mut vector = self.output.flat_vector(column.index());
        if let Some(value) = value {
            let sanitized = sanitize_for_cstring(value, column.name(), parse_error);
            vector.insert(row_idx, CString::new(sanitized.as_ref())?);
        } else {
            vector.set_null(row_idx);
        }
        Ok(())
    }

    pub fn write_optional_uinteger<C: TableColumn>(&mut self, column: C, value: Option<u32>) {
        let row_idx = self.row_count;
        let mut vector = self.output.flat_vector(column.index());
        if let Some(value) = value {
            vector.as_mut_slice::<u32>()[row_idx] = value;
        } else {
            vector.set_null(row_idx);
        }
    }

    pub fn write_optional_date<C: TableColumn>(&mut self, column: C, value: Option<duckdb_date>) {
        let row_idx = self.row_count;
        let mut vector = self.output.flat_vector(column.index());
        if let Some(value) = value {
            vector.as_mut_slice::<duckdb_date>()[row_idx] = value;
        } else {
            vector.set_null(row_idx);
        }
    }

    /// Writes the accumulated diagnostics, or NULL when there are none.
    pub fn write_parse_error<C: TableColumn>(
        &mut self,
        column: C,
        mut parse_error: ErrorAccumulator,
    ) -> Result<(), Box<dyn Error>> {
        let row_idx = self.row_count;
        let mut vector = self.output.flat_vector(column.index());
        match parse_error.take() {
            Some(message) => {
                let message = sanitize_for_cstring_silent(&message);
                vector.insert(row_idx, CString::new(message.as_ref())?);
            }
            None => vector.set_null(row_idx),
        }
        Ok(())
    }
}

/// Clamps a count into a `UINTEGER` column.
pub fn to_uinteger(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

pub fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
    Some(vec![(
        "compression".to_string(),
        LogicalTypeHandle::from(LogicalTypeId::Varchar),
    )])
}

pub fn parameters() -> Option<Vec<LogicalTypeHandle>> {
    Some(vec![
        LogicalTypeHandle::from(LogicalTypeId::Varchar), // path pattern (required)
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_over(text: &str) -> EventReaderState {
        EventReaderState::new(Box::new(Cursor::new(text.as_bytes().to_vec())), 0)
    }

    #[test]
    fn test_rows_per_chunk_constant_matches_contract() {
        assert_eq!(ROWS_PER_CHUNK, 2048);
    }

    #[test]
    fn test_parse_compression_mode_zstd_case_insensitive() {
        assert_eq!(CompressionMode::parse("zstd").unwrap(), CompressionMode::Zstd);
        assert_eq!(CompressionMode::parse(" ZsTd ").unwrap(), CompressionMode::Zstd);
    }

    #[test]
    fn test_parse_compression_mode_rejects_other_values() {
        let err = CompressionMode::parse("gzip").unwrap_err().to_string();
        assert!(err.contains("Invalid compression value 'gzip'"));

        let err = CompressionMode::parse("   ").unwrap_err().to_string();
        assert!(err.contains("Invalid compression value ''"));
    }

    #[test]
    fn test_expand_single_path_is_not_globbed() {
        let paths = expand_paths("2019ANA.EVA").unwrap();
        assert_eq!(paths, vec![PathBuf::from("2019ANA.EVA")]);
    }

    #[test]
    fn test_expand_glob_without_matches_is_empty() {
        let paths = expand_paths("/nonexistent-retrosheet-dir/*.EV?").unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn test_open_missing_file_reports_path() {
        let err = open_input_stream(Path::new("/nonexistent/2019BOS.EVA"), CompressionMode::Plain)
            .err()
            .unwrap();
        assert!(err.contains("Failed to open file '/nonexistent/2019BOS.EVA'"));
    }

    #[test]
    fn test_sanitize_for_cstring_preserves_clean_values() {
        let mut parse_error = ErrorAccumulator::default();
        let sanitized = sanitize_for_cstring("Brandon Drury", "player_id", &mut parse_error);
        assert_eq!(sanitized.as_ref(), "Brandon Drury");
        assert!(parse_error.is_empty());
    }

    #[test]
    fn test_sanitize_for_cstring_replaces_interior_nul_and_records_error() {
        let mut parse_error = ErrorAccumulator::default();
        let sanitized = sanitize_for_cstring("S9\0.2-H", "play", &mut parse_error);
        assert_eq!(sanitized.as_ref(), "S9 .2-H");

        let message = parse_error.take().expect("expected parse_error message");
        assert!(message.contains("Sanitized interior NUL in play"));
    }

    #[test]
    fn test_read_next_game_ingests_each_group() {
        let mut reader = reader_over("id,A\nplay,1,0,a,00,,S8\nid,B\nplay,1,0,b,00,,K\n");
        let source = Path::new("test.EVA");

        assert!(matches!(
            read_next_game(&mut reader, source),
            ReadNextGameOutcome::GameReady
        ));
        assert!(matches!(
            &reader.current_game,
            Some(GameOutcome::Parsed(game)) if game.id == "A"
        ));
        assert_eq!(reader.next_game_index, 2);

        assert!(matches!(
            read_next_game(&mut reader, source),
            ReadNextGameOutcome::GameReady
        ));
        assert!(matches!(
            read_next_game(&mut reader, source),
            ReadNextGameOutcome::ReaderFinished
        ));
        assert!(reader.current_game.is_none());
    }

    #[test]
    fn test_read_next_game_reports_failed_ingestion() {
        let mut reader = reader_over("version,2\nid,A\nplay,1,0,a,00,,S8\n");
        read_next_game(&mut reader, Path::new("bad.EVA"));
        match &reader.current_game {
            Some(GameOutcome::Failed(msg)) => {
                assert!(msg.contains("stage=format_game"));
                assert!(msg.contains("file='bad.EVA'"));
                assert!(msg.contains("game_index=1"));
            }
            other => panic!("expected failed game, got {other:?}"),
        }

        read_next_game(&mut reader, Path::new("bad.EVA"));
        assert!(matches!(reader.current_game, Some(GameOutcome::Parsed(_))));
    }

    #[test]
    fn test_anomaly_summary_counts_unclassified() {
        let lines = [
            "id,BOS201904090",
            "play,1,0,brans001,00,,ZZ",
            "play,1,0,smitj001,00,,S8.2-3;2-H",
            "play,1,0,jonea001,00,,K",
        ];
        let game = format_game(&lines).unwrap();
        let summary = anomaly_summary(&game, Path::new("2019BOS.EVA")).unwrap();
        assert_eq!(
            summary,
            "Play anomalies: file='2019BOS.EVA'; game_id=BOS201904090; anomalies=2; unclassified=1"
        );

        let clean = format_game(&["id,BOS201904090", "play,1,0,jonea001,00,,K"]).unwrap();
        assert!(anomaly_summary(&clean, Path::new("2019BOS.EVA")).is_none());
    }

    #[test]
    fn test_read_next_game_resets_play_cursor() {
        let mut reader = reader_over("id,A\nplay,1,0,a,00,,S8\n");
        reader.next_play = 7;
        read_next_game(&mut reader, Path::new("t.EVA"));
        assert_eq!(reader.next_play, 0);
    }

    #[test]
    fn test_init_data_starts_empty() {
        let init_data = EventInitData::new();
        let state = init_data.state.lock().unwrap();
        assert_eq!(state.next_path_idx, 0);
        assert!(state.available_readers.is_empty());
    }

    #[test]
    fn test_acquire_reader_skips_unopenable_files_when_several() {
        let init_data = EventInitData::new();
        let bind_data = EventBindData {
            paths: vec![
                PathBuf::from("/nonexistent/a.EVA"),
                PathBuf::from("/nonexistent/b.EVA"),
            ],
            compression: CompressionMode::Plain,
        };
        assert!(acquire_reader(&init_data, &bind_data).unwrap().is_none());
    }

    #[test]
    fn test_acquire_reader_fails_for_single_unopenable_file() {
        let init_data = EventInitData::new();
        let bind_data = EventBindData {
            paths: vec![PathBuf::from("/nonexistent/a.EVA")],
            compression: CompressionMode::Zstd,
        };
        assert!(acquire_reader(&init_data, &bind_data).is_err());
    }

    #[test]
    fn test_parked_reader_is_reused_first() {
        let init_data = EventInitData::new();
        let bind_data = EventBindData {
            paths: Vec::new(),
            compression: CompressionMode::Plain,
        };
        park_reader(&init_data, Some(reader_over("id,A\n"))).unwrap();
        let reader = acquire_reader(&init_data, &bind_data).unwrap();
        assert!(reader.is_some());
        assert!(acquire_reader(&init_data, &bind_data).unwrap().is_none());
    }

    #[test]
    fn test_to_uinteger_clamps() {
        assert_eq!(to_uinteger(12), 12);
        assert_eq!(to_uinteger(usize::MAX), u32::MAX);
    }
}
