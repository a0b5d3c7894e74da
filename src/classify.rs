//! Ordered, first-match-wins classification of atomic sub-events.
//!
//! Rule order is significant: `^[1-9]+...$` (a clean fielded out) must be
//! tried before the fielding-error rule, `^H` before `^HP`, and `^PO[1-3]`
//! cannot see `POCS` strings because the digit class excludes `C`.

use crate::types::{Base, PlayCategory, Subevent};
use std::borrow::Cow;
use std::sync::LazyLock;

type Classifier = fn(&str) -> Subevent;

struct Rule {
    pattern: regex::Regex,
    classify: Classifier,
}

fn rule(pattern: &str, classify: Classifier) -> Rule {
    Rule {
        pattern: regex::Regex::new(pattern).expect("valid classification rule regex"),
        classify,
    }
}

static FIELDED_RUNNER_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\(([1-3B])\)").expect("valid fielded runner regex"));

static CAUGHT_STEALING_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"CS([23H])").expect("valid caught stealing regex"));

static PICKOFF_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"PO([1-3])(\([1-9]*E[1-9])?").expect("valid pickoff regex")
});

static PICKOFF_CAUGHT_STEALING_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"POCS([23H])(\([1-9]*E[1-9])?")
        .expect("valid pickoff caught stealing regex")
});

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"^[1-9]+(\([1-3B]\))?$", fielded_out),
        rule(r"^[1-9]+(\([1-3B]\))?.*E[1-9]", |_| Subevent::new(PlayCategory::Error)),
        rule(r"^FC", |_| {
            Subevent::new(PlayCategory::FieldersChoice).with_advance(Base::Batter, Base::First)
        }),
        rule(r"^C$", |_| {
            Subevent::new(PlayCategory::Interference).with_advance(Base::Batter, Base::First)
        }),
        rule(r"^NP", |_| Subevent::new(PlayCategory::NoPlay)),
        rule(r"^K", |_| Subevent::new(PlayCategory::Strikeout).with_out(Base::Batter)),
        rule(r"^H($|[^P])", |_| {
            Subevent::new(PlayCategory::HomeRun).with_advance(Base::Batter, Base::Home)
        }),
        rule(r"^HP", |_| {
            Subevent::new(PlayCategory::HitByPitch).with_advance(Base::Batter, Base::First)
        }),
        rule(r"^S[1-9]*$", |_| {
            Subevent::new(PlayCategory::Single).with_advance(Base::Batter, Base::First)
        }),
        rule(r"^D[1-9]*$", |_| {
            Subevent::new(PlayCategory::Double).with_advance(Base::Batter, Base::Second)
        }),
        rule(r"^DGR", |_| {
            Subevent::new(PlayCategory::GroundRuleDouble).with_advance(Base::Batter, Base::Second)
        }),
        rule(r"^T[1-9]*$", |_| {
            Subevent::new(PlayCategory::Triple).with_advance(Base::Batter, Base::Third)
        }),
        rule(r"^CS[23H]", caught_stealing),
        rule(r"^WP", |_| Subevent::new(PlayCategory::WildPitch)),
        rule(r"^W$", |_| Subevent::new(PlayCategory::Walk).with_advance(Base::Batter, Base::First)),
        rule(r"^I(W|$)", |_| {
            Subevent::new(PlayCategory::IntentionalWalk).with_advance(Base::Batter, Base::First)
        }),
        rule(r"^PB", |_| Subevent::new(PlayCategory::PassedBall)),
        rule(r"^SB", |_| Subevent::new(PlayCategory::StolenBase)),
        rule(r"^E[0-9]", |_| Subevent::new(PlayCategory::Error)),
        rule(r"^DI", |_| Subevent::new(PlayCategory::DefensiveIndifference)),
        rule(r"^PO[1-3]", picked_off),
        rule(r"^POCS[23H]", picked_off_caught_stealing),
        rule(r"^BK", |_| Subevent::new(PlayCategory::Balk)),
        rule(r"^OA", |_| Subevent::new(PlayCategory::OtherAdvance)),
        rule(r"^FLE", |_| Subevent::new(PlayCategory::ErrorOnFoulFly)),
    ]
});

fn base_of(m: Option<regex::Match<'_>>) -> Option<Base> {
    m?.as_str().chars().next().and_then(Base::from_char)
}

fn fielded_out(s: &str) -> Subevent {
    let runner = FIELDED_RUNNER_RE
        .captures(s)
        .and_then(|caps| base_of(caps.get(1)))
        .unwrap_or(Base::Batter);
    Subevent::new(PlayCategory::Out).with_out(runner)
}

fn caught_stealing(s: &str) -> Subevent {
    let mut subevent = Subevent::new(PlayCategory::CaughtStealing);
    for caps in CAUGHT_STEALING_RE.captures_iter(s) {
        if let Some(runner) = base_of(caps.get(1)).and_then(Base::preceding) {
            subevent.players_out.insert(runner);
        }
    }
    subevent
}

fn picked_off(s: &str) -> Subevent {
    let mut subevent = Subevent::new(PlayCategory::PickedOff);
    for caps in PICKOFF_RE.captures_iter(s) {
        if caps.get(2).is_some() {
            subevent.category = PlayCategory::PickedOffError;
        } else if let Some(runner) = base_of(caps.get(1)) {
            subevent.players_out.insert(runner);
        }
    }
    subevent
}

fn picked_off_caught_stealing(s: &str) -> Subevent {
    let mut subevent = Subevent::new(PlayCategory::PickedOffCaughtStealing);
    for caps in PICKOFF_CAUGHT_STEALING_RE.captures_iter(s) {
        if caps.get(2).is_some() {
            subevent.category = PlayCategory::PickedOffCaughtStealingError;
        } else if let Some(runner) = base_of(caps.get(1)).and_then(Base::preceding) {
            subevent.players_out.insert(runner);
        }
    }
    subevent
}

/// Drops the `!`, `?` and `#` markers scorers attach to uncertain or
/// exceptional plays.
fn strip_markers(s: &str) -> Cow<'_, str> {
    if s.contains(['!', '?', '#']) {
        Cow::Owned(s.replace(['!', '?', '#'], ""))
    } else {
        Cow::Borrowed(s)
    }
}

/// Classifies one atomic sub-event. Unknown shapes yield
/// [`PlayCategory::Unclassified`] rather than an error.
pub fn classify_subevent(s: &str) -> Subevent {
    let cleaned = strip_markers(s.trim());
    RULES
        .iter()
        .find(|rule| rule.pattern.is_match(&cleaned))
        .map(|rule| (rule.classify)(&cleaned))
        .unwrap_or_else(|| Subevent::new(PlayCategory::Unclassified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Advance, BaseSet};

    fn outs(bases: &[Base]) -> BaseSet {
        bases.iter().copied().collect()
    }

    fn assert_category(s: &str, category: PlayCategory) {
        assert_eq!(classify_subevent(s).category, category, "subevent {s}");
    }

    #[test]
    fn test_strikeout_puts_batter_out() {
        let sub = classify_subevent("K");
        assert_eq!(sub.category, PlayCategory::Strikeout);
        assert_eq!(sub.players_out, outs(&[Base::Batter]));
        assert!(sub.implicit_advances.is_empty());
    }

    #[test]
    fn test_fielded_out_defaults_to_batter() {
        let sub = classify_subevent("63");
        assert_eq!(sub.category, PlayCategory::Out);
        assert_eq!(sub.players_out, outs(&[Base::Batter]));
    }

    #[test]
    fn test_fielded_out_uses_bracketed_runner() {
        let sub = classify_subevent("64(1)");
        assert_eq!(sub.category, PlayCategory::Out);
        assert_eq!(sub.players_out, outs(&[Base::First]));

        let sub = classify_subevent("3(B)");
        assert_eq!(sub.players_out, outs(&[Base::Batter]));
    }

    #[test]
    fn test_fielding_error_is_not_an_out() {
        let sub = classify_subevent("46(1)(E6)");
        assert_eq!(sub.category, PlayCategory::Error);
        assert!(sub.players_out.is_empty());

        assert_category("E5", PlayCategory::Error);
    }

    #[test]
    fn test_implicit_batter_advances() {
        let cases = [
            ("FC5", PlayCategory::FieldersChoice, Base::First),
            ("C", PlayCategory::Interference, Base::First),
            ("HR", PlayCategory::HomeRun, Base::Home),
            ("H", PlayCategory::HomeRun, Base::Home),
            ("HP", PlayCategory::HitByPitch, Base::First),
            ("S9", PlayCategory::Single, Base::First),
            ("D7", PlayCategory::Double, Base::Second),
            ("DGR", PlayCategory::GroundRuleDouble, Base::Second),
            ("T8", PlayCategory::Triple, Base::Third),
            ("W", PlayCategory::Walk, Base::First),
            ("IW", PlayCategory::IntentionalWalk, Base::First),
            ("I", PlayCategory::IntentionalWalk, Base::First),
        ];

        for (s, category, to) in cases {
            let sub = classify_subevent(s);
            assert_eq!(sub.category, category, "subevent {s}");
            assert_eq!(
                sub.implicit_advances.as_slice(),
                &[Advance::implied(Base::Batter, to)],
                "subevent {s}"
            );
        }
    }

    #[test]
    fn test_runner_only_categories() {
        assert_category("NP", PlayCategory::NoPlay);
        assert_category("WP", PlayCategory::WildPitch);
        assert_category("PB", PlayCategory::PassedBall);
        assert_category("SB2", PlayCategory::StolenBase);
        assert_category("SBH", PlayCategory::StolenBase);
        assert_category("DI", PlayCategory::DefensiveIndifference);
        assert_category("BK", PlayCategory::Balk);
        assert_category("OA", PlayCategory::OtherAdvance);
        assert_category("FLE7", PlayCategory::ErrorOnFoulFly);
    }

    #[test]
    fn test_caught_stealing_outs_preceding_base() {
        let sub = classify_subevent("CSH(12)");
        assert_eq!(sub.category, PlayCategory::CaughtStealing);
        assert_eq!(sub.players_out, outs(&[Base::Third]));

        let sub = classify_subevent("CS2(24)");
        assert_eq!(sub.players_out, outs(&[Base::First]));
    }

    #[test]
    fn test_caught_stealing_outs_every_runner_named() {
        let sub = classify_subevent("CSH(12)CS3(25)");
        assert_eq!(sub.category, PlayCategory::CaughtStealing);
        assert_eq!(sub.players_out, outs(&[Base::Second, Base::Third]));
        assert!(sub.implicit_advances.is_empty());
    }

    #[test]
    fn test_pickoff_with_and_without_error() {
        let sub = classify_subevent("PO1(13)");
        assert_eq!(sub.category, PlayCategory::PickedOff);
        assert_eq!(sub.players_out, outs(&[Base::First]));

        let sub = classify_subevent("PO2(E4)");
        assert_eq!(sub.category, PlayCategory::PickedOffError);
        assert!(sub.players_out.is_empty());
    }

    #[test]
    fn test_pickoff_caught_stealing_with_and_without_error() {
        let sub = classify_subevent("POCS2(14)");
        assert_eq!(sub.category, PlayCategory::PickedOffCaughtStealing);
        assert_eq!(sub.players_out, outs(&[Base::First]));

        let sub = classify_subevent("POCSH(1E2)");
        assert_eq!(sub.category, PlayCategory::PickedOffCaughtStealingError);
        assert!(sub.players_out.is_empty());
    }

    #[test]
    fn test_walk_rule_requires_exact_match() {
        // WP is caught before the walk rule; "WX" matches nothing.
        assert_category("WP", PlayCategory::WildPitch);
        assert_category("WX", PlayCategory::Unclassified);
    }

    #[test]
    fn test_single_rule_requires_digits_only() {
        assert_category("S", PlayCategory::Single);
        assert_category("SB3", PlayCategory::StolenBase);
    }

    #[test]
    fn test_markers_are_ignored() {
        assert_category("S8!", PlayCategory::Single);
        assert_category("8?", PlayCategory::Out);
        assert_category("63#", PlayCategory::Out);
    }

    #[test]
    fn test_unknown_shapes_are_unclassified() {
        let sub = classify_subevent("ZZ9");
        assert_eq!(sub.category, PlayCategory::Unclassified);
        assert!(sub.players_out.is_empty());
        assert!(sub.implicit_advances.is_empty());

        assert_category("", PlayCategory::Unclassified);
    }
}
