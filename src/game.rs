//! Line-to-record ingestion of one game's Retrosheet event records.

use crate::aggregate::derive_play;
use crate::error::RetrosheetError;
use crate::types::{DataEntry, LineupEntry, ParsedGame, PlayRecord, SubEntry};

const PLAY_FIELDS: usize = 7;
const LINEUP_FIELDS: usize = 6;
const DATA_FIELDS: usize = 4;

fn fields(line: &str, n: usize) -> Vec<&str> {
    line.splitn(n, ',').collect()
}

fn unquote(s: &str) -> String {
    s.trim().trim_matches('"').to_string()
}

fn parse_lineup(line: &str) -> Option<LineupEntry> {
    let f = fields(line, LINEUP_FIELDS);
    if f.len() < LINEUP_FIELDS {
        return None;
    }
    Some(LineupEntry {
        player_id: f[1].trim().to_string(),
        player_name: unquote(f[2]),
        team: f[3].trim().to_string(),
        batting_pos: f[4].trim().to_string(),
        fielding_pos: f[5].trim().to_string(),
    })
}

fn parse_play_record(line: &str) -> PlayRecord {
    let f = fields(line, PLAY_FIELDS);
    let field = |i: usize| f.get(i).map(|s| s.trim().to_string()).unwrap_or_default();

    let derived = if f.len() < PLAY_FIELDS {
        Err(RetrosheetError::MalformedRecord {
            line: line.to_string(),
            expected_fields: PLAY_FIELDS,
        })
    } else {
        derive_play(f[6])
    };

    PlayRecord {
        inning: f.get(1).and_then(|s| s.trim().parse().ok()),
        team: f.get(2).and_then(|s| s.trim().parse().ok()),
        player_id: field(3),
        count: field(4),
        pitch_sequence: field(5),
        play: field(6),
        comment: None,
        derived,
    }
}

fn comment_text(line: &str) -> &str {
    line.split_once(',')
        .map_or("", |(_, rest)| rest)
        .trim()
        .trim_matches('"')
        .trim_matches(['$', ' '])
}

/// Scan state threaded through a game's records.
struct GameFold {
    game: ParsedGame,
    last_play: Option<usize>,
}

impl GameFold {
    fn apply(mut self, line: &str) -> Self {
        let kind = line.split(',').next().unwrap_or_default().trim();
        match kind {
            "info" => {
                let f = fields(line, 3);
                let key = f.get(1).map(|s| s.trim().to_string()).unwrap_or_default();
                let value = f.get(2).map(|s| unquote(s)).unwrap_or_default();
                self.game.info.push((key, value));
            }
            "start" => match parse_lineup(line) {
                Some(entry) => self.game.starters.push(entry),
                None => self.malformed(line, LINEUP_FIELDS),
            },
            "sub" => match parse_lineup(line) {
                Some(player) => self.game.substitutions.push(SubEntry {
                    player,
                    after_play: self.last_play,
                }),
                None => self.malformed(line, LINEUP_FIELDS),
            },
            "play" => {
                self.game.plays.push(parse_play_record(line));
                self.last_play = Some(self.game.plays.len() - 1);
            }
            "com" => {
                let text = comment_text(line);
                if let Some(idx) = self.last_play
                    && !text.is_empty()
                {
                    let play = &mut self.game.plays[idx];
                    play.comment = Some(match play.comment.take() {
                        Some(existing) => format!("{existing} {text}"),
                        None => text.to_string(),
                    });
                }
            }
            "data" => {
                let f = fields(line, DATA_FIELDS);
                if f.len() < DATA_FIELDS {
                    self.malformed(line, DATA_FIELDS);
                } else {
                    self.game.data.push(DataEntry {
                        kind: f[1].trim().to_string(),
                        player_id: f[2].trim().to_string(),
                        value: f[3].trim().to_string(),
                    });
                }
            }
            _ => {}
        }
        self
    }

    fn malformed(&mut self, line: &str, expected_fields: usize) {
        let err = RetrosheetError::MalformedRecord {
            line: line.to_string(),
            expected_fields,
        };
        self.game.warnings.push(err.to_string());
    }
}

/// Builds a [`ParsedGame`] from one game's lines, deriving every play.
///
/// The first non-blank line must be `id,<gameId>`. Malformed plays are kept
/// with their error so the rest of the game is still processed.
pub fn format_game<S: AsRef<str>>(lines: &[S]) -> Result<ParsedGame, RetrosheetError> {
    let mut records = lines
        .iter()
        .map(|line| line.as_ref().trim_end_matches(['\r', '\n']))
        .filter(|line| !line.trim().is_empty());

    let first = records.next().unwrap_or_default();
    let id = match first.split_once(',') {
        Some(("id", id)) if !id.trim().is_empty() => id.trim().to_string(),
        _ => {
            return Err(RetrosheetError::MissingGameId {
                line: first.to_string(),
            });
        }
    };

    let start = GameFold {
        game: ParsedGame {
            id,
            ..ParsedGame::default()
        },
        last_play: None,
    };
    Ok(records.fold(start, GameFold::apply).game)
}
