//! Bracket-aware splitting of play descriptors.
//!
//! Retrosheet descriptors nest fielding detail in parentheses (`46(1)(E6)63`,
//! `BXH(E5/TH)`), so separators inside brackets must never split.

use crate::error::RetrosheetError;
use smallvec::SmallVec;

/// Separators between an event, its modifiers and its advance clause.
pub const PLAY_SEPARATORS: &[char] = &['/', '.'];

/// Separator between the parts of a compound event such as `K+SB2`.
pub const COMPOUND_SEPARATORS: &[char] = &['+'];

pub type EventParts<'a> = SmallVec<[&'a str; 4]>;

fn unbalanced(input: &str) -> RetrosheetError {
    RetrosheetError::UnbalancedBrackets {
        input: input.to_string(),
    }
}

/// Splits `s` at depth-0 separators.
///
/// One separator is stripped from each end first. Every segment after the
/// first keeps its leading separator, so the segments concatenate back to the
/// stripped input.
pub fn split_respecting_parens<'a>(
    s: &'a str,
    separators: &[char],
) -> Result<Vec<&'a str>, RetrosheetError> {
    let mut body = s;
    if let Some(first) = body.chars().next()
        && separators.contains(&first)
    {
        body = &body[first.len_utf8()..];
    }
    if let Some(last) = body.chars().next_back()
        && separators.contains(&last)
    {
        body = &body[..body.len() - last.len_utf8()];
    }

    let mut depth: i32 = 0;
    let mut starts = vec![0usize];
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && separators.contains(&c) => starts.push(i),
            _ => {}
        }
        if depth < 0 {
            return Err(unbalanced(s));
        }
    }
    if depth != 0 {
        return Err(unbalanced(s));
    }

    starts.push(body.len());
    Ok(starts.windows(2).map(|w| &body[w[0]..w[1]]).collect())
}

/// Breaks a chunk after each depth-0 `)` that is not followed by `(`.
fn split_after_closed_groups(chunk: &str) -> Result<EventParts<'_>, RetrosheetError> {
    let mut depth: i32 = 0;
    let mut prev_closed = false;
    let mut parts = EventParts::new();
    let mut start = 0usize;

    for (i, c) in chunk.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if prev_closed && depth == 0 => {
                parts.push(&chunk[start..i]);
                start = i;
            }
            _ => {}
        }
        prev_closed = c == ')';
        if depth < 0 {
            return Err(unbalanced(chunk));
        }
    }
    if depth != 0 {
        return Err(unbalanced(chunk));
    }

    parts.push(&chunk[start..]);
    Ok(parts)
}

/// Splits an event into its atomic sub-events.
///
/// `46(1)(E6)63` becomes `["46(1)(E6)", "63"]` and `K+SB2` becomes `["K", "SB2"]`.
pub fn segment_event(event: &str) -> Result<EventParts<'_>, RetrosheetError> {
    let mut subevents = EventParts::new();
    for chunk in split_respecting_parens(event, COMPOUND_SEPARATORS)? {
        for part in split_after_closed_groups(chunk)? {
            subevents.push(part.trim_matches('+'));
        }
    }
    Ok(subevents)
}
