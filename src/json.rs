use crate::error::RetrosheetError;
use crate::types::{AdvanceMap, BaseSet, DataEntry, DerivedPlay, LineupEntry, SubEntry};
use serde_json::{Map, Value, json};

fn players_out_value(players_out: BaseSet) -> Value {
    players_out.iter().map(|b| Value::from(b.as_str())).collect()
}

fn advances_value(advances: &AdvanceMap) -> Value {
    let map: Map<String, Value> = advances
        .iter()
        .map(|(from, to)| (from.as_str().to_string(), Value::from(to.as_str())))
        .collect();
    Value::Object(map)
}

/// `["1","B"]`
pub fn players_out_to_json(players_out: BaseSet) -> String {
    players_out_value(players_out).to_string()
}

/// `{"2":"H","B":"1"}`, keyed by the runner's starting base.
pub fn advances_to_json(advances: &AdvanceMap) -> String {
    advances_value(advances).to_string()
}

pub fn derived_play_to_json(raw: &str, play: &DerivedPlay) -> String {
    let categories: Vec<&str> = play.categories.iter().map(|c| c.label()).collect();
    json!({
        "raw": raw,
        "basic_play": play.basic_play_desc,
        "full_play": play.full_play_desc,
        "categories": categories,
        "players_out": players_out_value(play.players_out),
        "outs_on_play": play.outs_on_play(),
        "advances": advances_value(&play.advances),
        "runs_scored": play.runs_scored(),
        "anomalies": play.anomalies,
    })
    .to_string()
}

pub fn play_error_to_json(raw: &str, err: &RetrosheetError) -> String {
    json!({ "raw": raw, "error": err.to_string() }).to_string()
}

/// `info` records as an object; the first value wins for a repeated key.
pub fn info_to_json(info: &[(String, String)]) -> String {
    let mut map = Map::new();
    for (key, value) in info {
        map.entry(key.clone())
            .or_insert_with(|| Value::from(value.as_str()));
    }
    Value::Object(map).to_string()
}

fn lineup_value(entry: &LineupEntry) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("player_id".into(), entry.player_id.as_str().into());
    map.insert("name".into(), entry.player_name.as_str().into());
    map.insert("team".into(), entry.team.as_str().into());
    map.insert("batting_pos".into(), entry.batting_pos.as_str().into());
    map.insert("fielding_pos".into(), entry.fielding_pos.as_str().into());
    map
}

pub fn starters_to_json(starters: &[LineupEntry]) -> String {
    let entries: Vec<Value> = starters
        .iter()
        .map(|s| Value::Object(lineup_value(s)))
        .collect();
    Value::Array(entries).to_string()
}

pub fn substitutions_to_json(subs: &[SubEntry]) -> String {
    let entries: Vec<Value> = subs
        .iter()
        .map(|sub| {
            let mut map = lineup_value(&sub.player);
            map.insert("after_play".into(), json!(sub.after_play));
            Value::Object(map)
        })
        .collect();
    Value::Array(entries).to_string()
}

/// `data` records such as earned runs, in file order.
pub fn data_to_json(data: &[DataEntry]) -> String {
    data.iter()
        .map(|entry| {
            json!({
                "kind": entry.kind,
                "player_id": entry.player_id,
                "value": entry.value,
            })
        })
        .collect::<Value>()
        .to_string()
}
