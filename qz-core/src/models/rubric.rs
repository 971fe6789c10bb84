use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// One criterion of the grading rubric.
///
/// The set is fixed and ordered; [`RubricKey::ALL`] lists the criteria in the
/// order they are presented to the grader. The serialized names are a stable
/// contract with every client that reads score records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RubricKey {
    /// Variable declaration
    Declaration,
    /// Use of a loop
    Loop,
    /// Use of a conditional
    Conditional,
    /// Writing to the console
    ConsoleOut,
    /// Returning a value
    Return,
    /// Invoking a function
    Invocation,
    /// The overall grade; setting it backfills ungraded criteria
    Overall,
}

impl RubricKey {
    /// Every rubric criterion, in presentation order.
    pub const ALL: [RubricKey; 7] = [
        RubricKey::Declaration,
        RubricKey::Loop,
        RubricKey::Conditional,
        RubricKey::ConsoleOut,
        RubricKey::Return,
        RubricKey::Invocation,
        RubricKey::Overall,
    ];

    /// The wire name of the criterion.
    pub fn as_str(self) -> &'static str {
        match self {
            RubricKey::Declaration => "declaration",
            RubricKey::Loop => "loop",
            RubricKey::Conditional => "conditional",
            RubricKey::ConsoleOut => "consoleOut",
            RubricKey::Return => "return",
            RubricKey::Invocation => "invocation",
            RubricKey::Overall => "overall",
        }
    }

    /// A human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            RubricKey::Declaration => "Declaration",
            RubricKey::Loop => "Loop",
            RubricKey::Conditional => "Conditional",
            RubricKey::ConsoleOut => "Console Out",
            RubricKey::Return => "Return",
            RubricKey::Invocation => "Invocation",
            RubricKey::Overall => "Overall",
        }
    }
}

impl Display for RubricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RubricKey {
    type Err = RubricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RubricKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RubricError::UnknownKey(s.to_owned()))
    }
}

/// The ordinal scale a rubric criterion is graded on.
///
/// On the wire the scale is `"" | "1" | "2" | "3"`, where the empty string
/// means the criterion has not been graded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawScoreValue", into = "RawScoreValue")]
pub enum ScoreValue {
    /// Not graded yet
    #[default]
    Unset,
    /// 1
    Unprepared,
    /// 2
    Emerging,
    /// 3
    Proficient,
}

impl ScoreValue {
    /// The wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreValue::Unset => "",
            ScoreValue::Unprepared => "1",
            ScoreValue::Emerging => "2",
            ScoreValue::Proficient => "3",
        }
    }

    /// A human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            ScoreValue::Unset => "-",
            ScoreValue::Unprepared => "Unprepared",
            ScoreValue::Emerging => "Emerging",
            ScoreValue::Proficient => "Proficient",
        }
    }

    /// Whether the criterion carries a grade.
    pub fn is_set(self) -> bool {
        self != ScoreValue::Unset
    }
}

impl Display for ScoreValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScoreValue {
    type Err = RubricError;

    /// Accepts the wire values as well as the labels (case-insensitively).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = match s.trim() {
            "" | "-" => ScoreValue::Unset,
            "1" => ScoreValue::Unprepared,
            "2" => ScoreValue::Emerging,
            "3" => ScoreValue::Proficient,
            other if other.eq_ignore_ascii_case("unprepared") => ScoreValue::Unprepared,
            other if other.eq_ignore_ascii_case("emerging") => ScoreValue::Emerging,
            other if other.eq_ignore_ascii_case("proficient") => ScoreValue::Proficient,
            other => return Err(RubricError::InvalidValue(other.to_owned())),
        };
        Ok(value)
    }
}

/// Older clients wrote scores as bare numbers, so both forms are read.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RawScoreValue {
    /// `"" | "1" | "2" | "3"`
    Text(String),
    /// `1 | 2 | 3`
    Number(u8),
}

impl TryFrom<RawScoreValue> for ScoreValue {
    type Error = RubricError;

    fn try_from(value: RawScoreValue) -> Result<Self, Self::Error> {
        match value {
            RawScoreValue::Text(text) => text.parse(),
            RawScoreValue::Number(number) => number.to_string().parse(),
        }
    }
}

impl From<ScoreValue> for RawScoreValue {
    fn from(value: ScoreValue) -> Self {
        RawScoreValue::Text(value.as_str().to_owned())
    }
}

/// The ways a rubric name or grade can fail to parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RubricError {
    /// The name is not one of the rubric criteria
    #[error("unknown rubric field `{0}`")]
    UnknownKey(String),
    /// The value is not on the grading scale
    #[error("invalid score `{0}`, expected one of \"\", 1, 2, 3")]
    InvalidValue(String),
}

/// The grades recorded for a submission, keyed by criterion.
///
/// Only graded criteria are stored; [`ScoreMap::get`] reports a missing
/// criterion as [`ScoreValue::Unset`]. Insertion order is preserved so that
/// repeated serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMap(indexmap::IndexMap<RubricKey, ScoreValue, rustc_hash::FxBuildHasher>);

impl ScoreMap {
    /// The grade for `key`, or `Unset` if none was recorded.
    pub fn get(&self, key: RubricKey) -> ScoreValue {
        self.0.get(&key).copied().unwrap_or_default()
    }

    /// Record a grade; recording `Unset` forgets the criterion.
    pub fn set(&mut self, key: RubricKey, value: ScoreValue) {
        if value.is_set() {
            self.0.insert(key, value);
        } else {
            self.0.shift_remove(&key);
        }
    }

    /// Number of graded criteria.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing has been graded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every criterion with its grade, in rubric order, including `Unset` ones.
    pub fn rubric(&self) -> impl Iterator<Item = (RubricKey, ScoreValue)> + '_ {
        RubricKey::ALL.into_iter().map(|key| (key, self.get(key)))
    }
}

impl FromIterator<(RubricKey, ScoreValue)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (RubricKey, ScoreValue)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (key, value) in iter {
            map.set(key, value);
        }
        map
    }
}
