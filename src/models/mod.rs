//! Data models for the scoreboard

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 2;

/// Separator between model id and step id in note keys
pub const NOTE_KEY_SEPARATOR: &str = "__";

/// Storage namespace. Each mode has its own document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Gpu,
    Cpu,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Gpu, Mode::Cpu];

    /// Exactly "cpu" selects cpu, anything else (including nothing) is gpu
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw {
            Some("cpu") => Mode::Cpu,
            _ => Mode::Gpu,
        }
    }

    /// Same rule applied to a JSON body field: only the string "cpu" counts
    pub fn from_value(raw: Option<&Value>) -> Self {
        Self::resolve(raw.and_then(Value::as_str))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Gpu => "gpu",
            Mode::Cpu => "cpu",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Mode::Gpu => "data-gpu.json",
            Mode::Cpu => "data-cpu.json",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Mode::Gpu => 0,
            Mode::Cpu => 1,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoreboard document for one mode
///
/// `scores` and `notes` are typed; anything else the template carries
/// (model lists, step labels, titles) is kept verbatim in `extra`.
/// Both typed fields load leniently so files with `null` or non-integer
/// scores, or non-string notes, still open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// model id -> step id -> score in [0, 2]
    #[serde(default, deserialize_with = "lenient_scores")]
    pub scores: BTreeMap<String, BTreeMap<String, u8>>,
    /// "<model>__<step>" -> free text
    #[serde(default, deserialize_with = "lenient_notes")]
    pub notes: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn set_score(&mut self, model: &str, step: &str, score: i64) -> u8 {
        let clamped = clamp_score(score);
        self.scores
            .entry(model.to_string())
            .or_default()
            .insert(step.to_string(), clamped);
        clamped
    }

    pub fn set_note(&mut self, model: &str, step: &str, text: String) {
        self.notes.insert(note_key(model, step), text);
    }

    /// Drop one model's scores and every note keyed under it
    pub fn reset_model(&mut self, model: &str) {
        self.scores.remove(model);
        let prefix = format!("{}{}", model, NOTE_KEY_SEPARATOR);
        self.notes.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn reset_all(&mut self) {
        self.scores.clear();
        self.notes.clear();
    }

    /// JSON view returned by the data endpoint, with the resolved mode injected
    pub fn tagged(&self, mode: Mode) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("mode".to_string(), Value::String(mode.as_str().to_string()));
        }
        Ok(value)
    }
}

/// Scores that parse are clamped; `null` and other unparseable leaves are dropped.
/// A non-object `scores` (including `null`) reads as empty.
fn lenient_scores<'de, D>(deserializer: D) -> Result<BTreeMap<String, BTreeMap<String, u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(models) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    let scores = models
        .into_iter()
        .filter_map(|(model, steps)| match steps {
            Value::Object(steps) => {
                let steps = steps
                    .into_iter()
                    .filter_map(|(step, raw)| parse_score(&raw).map(|s| (step, clamp_score(s))))
                    .collect();
                Some((model, steps))
            }
            _ => None,
        })
        .collect();
    Ok(scores)
}

/// Non-string notes keep their JSON text, `null` becomes ""
fn lenient_notes<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(notes) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(notes
        .into_iter()
        .map(|(key, raw)| (key, note_text(Some(&raw))))
        .collect())
}

pub fn clamp_score(score: i64) -> u8 {
    score.clamp(MIN_SCORE, MAX_SCORE) as u8
}

pub fn note_key(model: &str, step: &str) -> String {
    format!("{}{}{}", model, NOTE_KEY_SEPARATOR, step)
}

/// Integer-prefix parse of a submitted score.
///
/// Numbers truncate toward zero. Strings skip leading whitespace, take an
/// optional sign and then as many digits as are present ("3 stars" -> 3).
/// A "0x" prefix switches to hex digits ("0x1F" -> 31).
/// Anything that yields no digits is `None`.
pub fn parse_score(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => leading_integer(s),
        _ => None,
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let trimmed = s.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (radix, digits) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Too many digits for i64 still clamps to the top of the range
    let magnitude = i64::from_str_radix(&digits[..end], radix).unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Render a model or step id as a map key. Objects, arrays and null are unusable.
pub fn key_fragment(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Note text as stored: absent or null becomes "", non-strings keep their JSON text
pub fn note_text(raw: Option<&Value>) -> String {
    match raw {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
