use crate::types::{ParsedGame, PlayRecord};

/// Identifies one play across a season of games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayKey<'a> {
    pub game_id: &'a str,
    pub play_num: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayRow<'a> {
    pub key: PlayKey<'a>,
    pub record: &'a PlayRecord,
}

fn row<'a>(game: &'a ParsedGame, play_num: usize, record: &'a PlayRecord) -> PlayRow<'a> {
    PlayRow {
        key: PlayKey {
            game_id: &game.id,
            play_num,
        },
        record,
    }
}

/// The plays of one game in recorded order, numbered from zero.
pub fn game_rows(game: &ParsedGame) -> impl Iterator<Item = PlayRow<'_>> {
    game.plays
        .iter()
        .enumerate()
        .map(|(play_num, record)| row(game, play_num, record))
}

/// The row for `play_num`, without walking the plays before it.
pub fn play_row(game: &ParsedGame, play_num: usize) -> Option<PlayRow<'_>> {
    game.plays
        .get(play_num)
        .map(|record| row(game, play_num, record))
}

/// Concatenates the play tables of several games, keeping each game's numbering.
pub fn combine_games(games: &[ParsedGame]) -> Vec<PlayRow<'_>> {
    games.iter().flat_map(game_rows).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::format_game;

    fn game(id: &str, plays: &[&str]) -> ParsedGame {
        let mut lines = vec![format!("id,{id}")];
        lines.extend(
            plays
                .iter()
                .map(|play| format!("play,1,0,batter01,00,,{play}")),
        );
        format_game(&lines).unwrap()
    }

    #[test]
    fn test_game_rows_number_plays_in_order() {
        let g = game("NYA201904010", &["S8", "K", "HR"]);
        let rows: Vec<_> = game_rows(&g).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[2].key,
            PlayKey {
                game_id: "NYA201904010",
                play_num: 2
            }
        );
        assert_eq!(rows[1].record.play, "K");
    }

    #[test]
    fn test_combine_games_is_ordered_union() {
        let games = [game("A", &["S8", "K"]), game("B", &["W"])];
        let rows = combine_games(&games);
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.key.game_id, r.key.play_num))
            .collect();
        assert_eq!(keys, vec![("A", 0), ("A", 1), ("B", 0)]);
    }

    #[test]
    fn test_keys_are_unique_across_games() {
        let games = [game("A", &["S8", "K"]), game("B", &["S8", "K"])];
        let rows = combine_games(&games);
        let mut keys: Vec<_> = rows.iter().map(|r| r.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), rows.len());
    }

    #[test]
    fn test_game_without_plays_has_no_rows() {
        let g = game("EMPTY", &[]);
        assert_eq!(game_rows(&g).count(), 0);
        assert!(combine_games(&[]).is_empty());
    }

    #[test]
    fn test_play_row_matches_game_rows() {
        let game = game("BOS201904090", &["S9", "K", "W"]);
        for (play_num, expected) in game_rows(&game).enumerate() {
            assert_eq!(play_row(&game, play_num), Some(expected));
        }
        assert_eq!(play_row(&game, 3), None);
    }
}
