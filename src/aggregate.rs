use crate::classify::classify_subevent;
use crate::error::RetrosheetError;
use crate::grammar::parse_play;
use crate::split::segment_event;
use crate::types::{
    Advance, AdvanceMap, BaseSet, DerivedPlay, PlayCategory, PlaySegment, Subevent,
    SubeventList,
};

struct Descriptions {
    basic: Option<String>,
    full: Option<String>,
}

fn describe(subevents: &[Subevent], anomalies: &mut Vec<String>) -> Descriptions {
    let first = subevents[0].category;
    if subevents.len() == 1 {
        return Descriptions {
            basic: Some(first.label().to_string()),
            full: Some(first.label().to_string()),
        };
    }

    if first == PlayCategory::Out {
        let n_outs = subevents
            .iter()
            .filter(|s| s.category == PlayCategory::Out)
            .count();
        let label = match n_outs {
            1 => Some("Out"),
            2 => Some("Double Play"),
            3 => Some("Triple Play"),
            n => {
                anomalies.push(format!("{n} fielded outs in one play"));
                None
            }
        };
        return Descriptions {
            basic: label.map(str::to_string),
            full: label.map(str::to_string),
        };
    }

    let full = subevents
        .iter()
        .map(|s| s.category.label())
        .collect::<Vec<_>>()
        .join(" - ");
    Descriptions {
        basic: Some(first.label().to_string()),
        full: Some(full),
    }
}

/// Merges classified sub-events with the play's explicit advance tokens.
///
/// Explicit tokens are authoritative: an implicit advance is only used for a
/// base no token mentions, and a base in a `-` token or an error-annotated `X`
/// token is never counted out. Only the first token per origin base is used;
/// later ones are reported as anomalies.
pub fn aggregate_play(
    segment: &PlaySegment<'_>,
    subevents: &[Subevent],
) -> Result<DerivedPlay, RetrosheetError> {
    if subevents.is_empty() {
        return Err(RetrosheetError::EmptySubevents {
            event: segment.event.to_string(),
        });
    }

    let mut anomalies = Vec::new();
    let descriptions = describe(subevents, &mut anomalies);

    let mut explicit: Vec<Advance> = Vec::with_capacity(segment.advances.len());
    for token in &segment.advances {
        let Some(advance) = Advance::parse(token) else {
            anomalies.push(format!("unrecognized advance '{token}'"));
            continue;
        };
        match explicit.iter().find(|kept| kept.from == advance.from) {
            Some(kept) => anomalies.push(format!(
                "conflicting advances for runner on {}: kept {kept}, ignored {advance}",
                advance.from
            )),
            None => explicit.push(advance),
        }
    }

    let mut mentioned = BaseSet::new();
    let mut thrown_out = BaseSet::new();
    let mut not_out = BaseSet::new();
    let mut advances = AdvanceMap::new();

    // At most one token per origin base survives the loop above.
    for advance in &explicit {
        mentioned.insert(advance.from);
        if advance.reached() {
            not_out.insert(advance.from);
            advances.insert_first(advance.from, advance.to);
        } else {
            thrown_out.insert(advance.from);
        }
    }

    let mut players_out = BaseSet::new();
    for subevent in subevents {
        players_out = players_out.union(subevent.players_out);
        if subevent.category == PlayCategory::Unclassified {
            anomalies.push("unclassified subevent".to_string());
        }

        for implicit in &subevent.implicit_advances {
            if !mentioned.contains(implicit.from) {
                advances.insert_first(implicit.from, implicit.to);
            }
        }
    }
    let players_out = players_out.union(thrown_out).difference(not_out);

    Ok(DerivedPlay {
        basic_play_desc: descriptions.basic,
        full_play_desc: descriptions.full,
        categories: subevents.iter().map(|s| s.category).collect(),
        players_out,
        advances,
        anomalies,
    })
}

/// Runs the whole pipeline on one raw play descriptor.
pub fn derive_play(play: &str) -> Result<DerivedPlay, RetrosheetError> {
    let segment = parse_play(play)?;
    let subevents: SubeventList = segment_event(segment.event)?
        .into_iter()
        .map(classify_subevent)
        .collect();
    aggregate_play(&segment, &subevents)
}
