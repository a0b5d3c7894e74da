use crate::error::RetrosheetError;
use crate::split::{PLAY_SEPARATORS, split_respecting_parens};
use crate::types::PlaySegment;

/// Splits a play descriptor into event, modifiers and advances.
///
/// `S9/L9S.2-H;1-3` parses to event `S9`, modifiers `["L9S"]` and advances
/// `["2-H", "1-3"]`.
pub fn parse_play(play: &str) -> Result<PlaySegment<'_>, RetrosheetError> {
    let play = play.trim();
    let parts = split_respecting_parens(play, PLAY_SEPARATORS)?;

    let event = parts.first().copied().unwrap_or_default();
    if event.is_empty() {
        return Err(RetrosheetError::EmptyEvent {
            input: play.to_string(),
        });
    }

    let tail = &parts[1..];
    let (modifiers, advances) = match tail.split_last() {
        Some((&last, mods)) if last.starts_with('.') => {
            let advances = last
                .trim_matches('.')
                .split(';')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .collect();
            (mods, advances)
        }
        _ => (tail, Vec::new()),
    };

    let modifiers = modifiers
        .iter()
        .map(|&m| m.strip_prefix('/').unwrap_or(m))
        .collect();

    Ok(PlaySegment {
        event,
        modifiers,
        advances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_with_advance() {
        let seg = parse_play("S9.2-H").unwrap();
        assert_eq!(seg.event, "S9");
        assert!(seg.modifiers.is_empty());
        assert_eq!(seg.advances, vec!["2-H"]);
    }

    #[test]
    fn test_parse_modifiers_and_advances() {
        let seg = parse_play("64(1)3/GDP/G6.2-3").unwrap();
        assert_eq!(seg.event, "64(1)3");
        assert_eq!(seg.modifiers, vec!["GDP", "G6"]);
        assert_eq!(seg.advances, vec!["2-3"]);
    }

    #[test]
    fn test_parse_modifiers_without_advances() {
        let seg = parse_play("8/F78").unwrap();
        assert_eq!(seg.event, "8");
        assert_eq!(seg.modifiers, vec!["F78"]);
        assert!(seg.advances.is_empty());
    }

    #[test]
    fn test_parse_advances_with_parameters() {
        let seg = parse_play("D7/L7LD.3-H(UR);1XH(762)").unwrap();
        assert_eq!(seg.advances, vec!["3-H(UR)", "1XH(762)"]);
    }

    #[test]
    fn test_parse_trims_and_drops_empty_advance_tokens() {
        let seg = parse_play("  WP.3-H;  ").unwrap();
        assert_eq!(seg.event, "WP");
        assert_eq!(seg.advances, vec!["3-H"]);
    }

    #[test]
    fn test_parse_event_only() {
        let seg = parse_play("NP").unwrap();
        assert_eq!(seg.event, "NP");
        assert!(seg.modifiers.is_empty());
        assert!(seg.advances.is_empty());
    }

    #[test]
    fn test_parse_rejects_unbalanced_brackets() {
        assert!(matches!(
            parse_play("46(1"),
            Err(RetrosheetError::UnbalancedBrackets { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_empty_play() {
        assert!(matches!(
            parse_play("   "),
            Err(RetrosheetError::EmptyEvent { .. })
        ));
    }
}
