use crate::error::RetrosheetError;
use smallvec::SmallVec;
use std::fmt;
use std::sync::LazyLock;

/// A position a runner occupies or moves to. `Batter` is the batter before
/// reaching base, `Home` means the runner scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Base {
    First,
    Second,
    Third,
    Batter,
    Home,
}

impl Base {
    pub const ALL: [Base; 5] = [
        Base::First,
        Base::Second,
        Base::Third,
        Base::Batter,
        Base::Home,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '1' => Some(Self::First),
            '2' => Some(Self::Second),
            '3' => Some(Self::Third),
            'B' => Some(Self::Batter),
            'H' => Some(Self::Home),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "1",
            Self::Second => "2",
            Self::Third => "3",
            Self::Batter => "B",
            Self::Home => "H",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }

    /// Base a runner is forced back to when caught stealing `self`.
    pub const fn preceding(self) -> Option<Self> {
        match self {
            Self::Home => Some(Self::Third),
            Self::Third => Some(Self::Second),
            Self::Second => Some(Self::First),
            _ => None,
        }
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of bases, stored as a bit mask over [`Base::ALL`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseSet(u8);

impl BaseSet {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, base: Base) {
        self.0 |= 1 << base.index();
    }

    pub const fn contains(self, base: Base) -> bool {
        self.0 & (1 << base.index()) != 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Base> {
        Base::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

impl FromIterator<Base> for BaseSet {
    fn from_iter<I: IntoIterator<Item = Base>>(iter: I) -> Self {
        let mut set = Self::new();
        for base in iter {
            set.insert(base);
        }
        set
    }
}

/// Final destination per origin base. Each runner starts from at most one base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceMap([Option<Base>; 5]);

impl AdvanceMap {
    pub const fn new() -> Self {
        Self([None; 5])
    }

    /// Records `from -> to` unless `from` already has a destination; returns the
    /// existing destination in that case.
    pub fn insert_first(&mut self, from: Base, to: Base) -> Option<Base> {
        let slot = &mut self.0[from.index()];
        match slot {
            Some(existing) => Some(*existing),
            None => {
                *slot = Some(to);
                None
            }
        }
    }

    pub fn get(&self, from: Base) -> Option<Base> {
        self.0[from.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Base, Base)> + '_ {
        Base::ALL
            .into_iter()
            .filter_map(|from| self.get(from).map(|to| (from, to)))
    }

    pub fn runs(&self) -> usize {
        self.iter().filter(|(_, to)| *to == Base::Home).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// `-`: the runner reached `to`.
    Safe,
    /// `X`: the runner was thrown out trying for `to` (unless an error saved him).
    Out,
}

/// A base transition, either written in a play's advance clause or implied by
/// the play itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub from: Base,
    pub to: Base,
    pub outcome: AdvanceOutcome,
    pub error_annotated: bool,
}

static ADVANCE_TOKEN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^([123B])([-X])([123H])(.*)$").expect("valid advance token regex")
});

static ERROR_CODE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"E[0-9]").expect("valid error code regex"));

impl Advance {
    pub const fn implied(from: Base, to: Base) -> Self {
        Self {
            from,
            to,
            outcome: AdvanceOutcome::Safe,
            error_annotated: false,
        }
    }

    /// Parses an explicit token such as `2-H`, `1X2`, `BXH(E5)` or `3-H(UR)(NR)`.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = ADVANCE_TOKEN_RE.captures(token.trim())?;
        let from = caps.get(1)?.as_str().chars().next().and_then(Base::from_char)?;
        let to = caps.get(3)?.as_str().chars().next().and_then(Base::from_char)?;
        let outcome = match caps.get(2)?.as_str() {
            "X" => AdvanceOutcome::Out,
            _ => AdvanceOutcome::Safe,
        };
        let params = caps.get(4).map_or("", |m| m.as_str());

        Some(Self {
            from,
            to,
            outcome,
            error_annotated: ERROR_CODE_RE.is_match(params),
        })
    }

    /// The runner ends the play on `to`: a safe advance, or an out attempt
    /// negated by an error.
    pub fn reached(&self) -> bool {
        match self.outcome {
            AdvanceOutcome::Safe => true,
            AdvanceOutcome::Out => self.error_annotated,
        }
    }
}

impl fmt::Display for Advance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = match self.outcome {
            AdvanceOutcome::Safe => '-',
            AdvanceOutcome::Out => 'X',
        };
        write!(f, "{}{}{}", self.from, sep, self.to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayCategory {
    Out,
    Error,
    FieldersChoice,
    Interference,
    NoPlay,
    Strikeout,
    HomeRun,
    HitByPitch,
    Single,
    Double,
    GroundRuleDouble,
    Triple,
    CaughtStealing,
    WildPitch,
    Walk,
    IntentionalWalk,
    PassedBall,
    StolenBase,
    DefensiveIndifference,
    PickedOff,
    PickedOffError,
    PickedOffCaughtStealing,
    PickedOffCaughtStealingError,
    Balk,
    OtherAdvance,
    ErrorOnFoulFly,
    Unclassified,
}

impl PlayCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Out => "Out",
            Self::Error => "Error",
            Self::FieldersChoice => "Fielder's Choice",
            Self::Interference => "Interference",
            Self::NoPlay => "No Play",
            Self::Strikeout => "Strikeout",
            Self::HomeRun => "Hit - Home Run",
            Self::HitByPitch => "Hit by Pitch",
            Self::Single => "Hit - Single",
            Self::Double => "Hit - Double",
            Self::GroundRuleDouble => "Hit - Ground Rule Double",
            Self::Triple => "Hit - Triple",
            Self::CaughtStealing => "Runner Caught Stealing",
            Self::WildPitch => "Wild Pitch",
            Self::Walk => "Walk",
            Self::IntentionalWalk => "Intentional Walk",
            Self::PassedBall => "Passed Ball",
            Self::StolenBase => "Stolen Base",
            Self::DefensiveIndifference => "Defensive Indifference",
            Self::PickedOff => "Picked Off Base",
            Self::PickedOffError => "Picked Off Base - Error",
            Self::PickedOffCaughtStealing => "Picked Off Base Caught Stealing",
            Self::PickedOffCaughtStealingError => "Picked Off Base Caught Stealing - Error",
            Self::Balk => "Balk",
            Self::OtherAdvance => "Other Baserunner Advance",
            Self::ErrorOnFoulFly => "Error on Foul Flyball",
            Self::Unclassified => "Unclassified",
        }
    }
}

impl fmt::Display for PlayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub type ImplicitAdvances = SmallVec<[Advance; 2]>;

/// One classified atomic piece of a play's event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subevent {
    pub category: PlayCategory,
    pub players_out: BaseSet,
    pub implicit_advances: ImplicitAdvances,
}

impl Subevent {
    pub fn new(category: PlayCategory) -> Self {
        Self {
            category,
            players_out: BaseSet::new(),
            implicit_advances: ImplicitAdvances::new(),
        }
    }

    pub fn with_out(mut self, base: Base) -> Self {
        self.players_out.insert(base);
        self
    }

    pub fn with_advance(mut self, from: Base, to: Base) -> Self {
        self.implicit_advances.push(Advance::implied(from, to));
        self
    }
}

pub type SubeventList = SmallVec<[Subevent; 4]>;

/// A play descriptor split into its grammatical parts, borrowing the raw string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaySegment<'a> {
    pub event: &'a str,
    pub modifiers: Vec<&'a str>,
    pub advances: Vec<&'a str>,
}

/// Everything derived from one play descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPlay {
    pub basic_play_desc: Option<String>,
    pub full_play_desc: Option<String>,
    pub categories: SmallVec<[PlayCategory; 4]>,
    pub players_out: BaseSet,
    pub advances: AdvanceMap,
    /// Data-quality signals that did not prevent the derivation.
    pub anomalies: Vec<String>,
}

impl DerivedPlay {
    pub fn outs_on_play(&self) -> usize {
        self.players_out.len()
    }

    pub fn runs_scored(&self) -> usize {
        self.advances.runs()
    }
}

/// A `play` record with its provenance and derived facts.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub inning: Option<u32>,
    pub team: Option<u32>,
    pub player_id: String,
    pub count: String,
    pub pitch_sequence: String,
    pub play: String,
    pub comment: Option<String>,
    pub derived: Result<DerivedPlay, RetrosheetError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupEntry {
    pub player_id: String,
    pub player_name: String,
    pub team: String,
    pub batting_pos: String,
    pub fielding_pos: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubEntry {
    pub player: LineupEntry,
    /// Index of the most recent play before the substitution.
    pub after_play: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntry {
    pub kind: String,
    pub player_id: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedGame {
    pub id: String,
    pub info: Vec<(String, String)>,
    pub plays: Vec<PlayRecord>,
    pub starters: Vec<LineupEntry>,
    pub substitutions: Vec<SubEntry>,
    pub data: Vec<DataEntry>,
    /// Malformed non-play records that were skipped.
    pub warnings: Vec<String>,
}

impl ParsedGame {
    /// First value recorded for an `info` key.
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_chars_round_trip() {
        for base in Base::ALL {
            assert_eq!(base.as_str().chars().next().and_then(Base::from_char), Some(base));
        }
        assert_eq!(Base::from_char('4'), None);
    }

    #[test]
    fn test_preceding_base() {
        assert_eq!(Base::Home.preceding(), Some(Base::Third));
        assert_eq!(Base::Third.preceding(), Some(Base::Second));
        assert_eq!(Base::Second.preceding(), Some(Base::First));
        assert_eq!(Base::First.preceding(), None);
    }

    #[test]
    fn test_base_set_operations() {
        let a: BaseSet = [Base::First, Base::Batter].into_iter().collect();
        let b: BaseSet = [Base::Batter].into_iter().collect();

        assert_eq!(a.len(), 2);
        assert!(a.contains(Base::First));
        assert!(!a.contains(Base::Second));
        assert_eq!(a.difference(b).iter().collect::<Vec<_>>(), vec![Base::First]);
        assert_eq!(b.union(a), a);
        assert!(BaseSet::new().is_empty());
    }

    #[test]
    fn test_advance_map_keeps_first_destination() {
        let mut map = AdvanceMap::new();
        assert_eq!(map.insert_first(Base::Second, Base::Home), None);
        assert_eq!(map.insert_first(Base::Second, Base::Third), Some(Base::Home));
        assert_eq!(map.get(Base::Second), Some(Base::Home));
        assert_eq!(map.iter().count(), 1);
        assert_eq!(map.runs(), 1);
    }

    #[test]
    fn test_parse_advance_tokens() {
        let adv = Advance::parse("2-H").unwrap();
        assert_eq!((adv.from, adv.to), (Base::Second, Base::Home));
        assert_eq!(adv.outcome, AdvanceOutcome::Safe);
        assert!(!adv.error_annotated);

        let adv = Advance::parse("1X2").unwrap();
        assert_eq!(adv.outcome, AdvanceOutcome::Out);
        assert!(!adv.reached());

        let adv = Advance::parse("BXH(E5)").unwrap();
        assert_eq!((adv.from, adv.to), (Base::Batter, Base::Home));
        assert!(adv.error_annotated);
        assert!(adv.reached());

        let adv = Advance::parse("3-H(UR)(NR)").unwrap();
        assert!(!adv.error_annotated);
        assert_eq!(adv.to_string(), "3-H");

        assert!(Advance::parse("H-1").is_none());
        assert!(Advance::parse("2").is_none());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(PlayCategory::FieldersChoice.label(), "Fielder's Choice");
        assert_eq!(PlayCategory::HomeRun.to_string(), "Hit - Home Run");
        assert_eq!(
            PlayCategory::PickedOffCaughtStealingError.label(),
            "Picked Off Base Caught Stealing - Error"
        );
    }

    #[test]
    fn test_derived_play_counts_follow_sets() {
        let mut advances = AdvanceMap::new();
        advances.insert_first(Base::Third, Base::Home);
        advances.insert_first(Base::Batter, Base::Home);
        let play = DerivedPlay {
            basic_play_desc: Some("Hit - Home Run".to_string()),
            full_play_desc: Some("Hit - Home Run".to_string()),
            categories: SmallVec::from_slice(&[PlayCategory::HomeRun]),
            players_out: BaseSet::new(),
            advances,
            anomalies: Vec::new(),
        };
        assert_eq!(play.outs_on_play(), 0);
        assert_eq!(play.runs_scored(), 2);
    }
}
