//! The feedback record produced by a model and rendered by [`crate::report`].
//!
//! Field names follow the JSON shape the model is asked to produce (see
//! [`crate::prompts::AI_RESPONSE_FORMAT`]). Reading is lenient: any JSON
//! value becomes a [`Feedback`]. Missing categories read as empty, missing
//! scores as [`Score::MISSING`], and unknown tip labels are kept as
//! [`TipKind::Other`]. Nothing is corrected on the way in; the report layer
//! flags what falls outside the requested shape.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A score as the model reported it.
///
/// The prompt asks for an integer in `0..=100`. Fractional and out-of-range
/// values are kept as given; a missing or non-numeric score is `MISSING`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Score(Option<f64>);

impl Score {
    pub const MAX: f64 = 100.0;
    pub const MISSING: Score = Score(None);

    pub fn new(value: impl Into<f64>) -> Self {
        let value = value.into();
        Self(value.is_finite().then_some(value))
    }

    pub fn value(self) -> Option<f64> {
        self.0
    }

    pub fn is_missing(&self) -> bool {
        self.0.is_none()
    }

    /// Present and within `0..=100`.
    pub fn in_range(self) -> bool {
        matches!(self.0, Some(v) if (0.0..=Self::MAX).contains(&v))
    }

    fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => n.as_f64().map_or(Self::MISSING, Self::new),
            Some(Value::String(s)) => s.trim().parse::<f64>().map_or(Self::MISSING, Self::new),
            _ => Self::MISSING,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => fmt::Display::fmt(&v, f),
            None => f.pad("--"),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            // Integral scores stay integers in the stored record.
            Some(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => s.serialize_i64(v as i64),
            Some(v) => s.serialize_f64(v),
            None => s.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Score::from_json(Some(&value)))
    }
}

/// Whether a tip praises something or asks for a change.
///
/// Labels match case-insensitively; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipKind {
    Good,
    Improve,
    Other(String),
}

impl TipKind {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "good" | "positive" | "strength" => TipKind::Good,
            "improve" | "improvement" | "negative" => TipKind::Improve,
            _ => TipKind::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TipKind::Good => "good",
            TipKind::Improve => "improve",
            TipKind::Other(label) => label,
        }
    }

    fn from_json(value: Option<&Value>) -> Self {
        TipKind::parse(&text(value))
    }
}

impl Serialize for TipKind {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TipKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(TipKind::from_json(Some(&value)))
    }
}

/// A tip in the ATS section: title only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtsTip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
}

/// A tip with a short title and a longer explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AtsSection {
    #[serde(skip_serializing_if = "Score::is_missing")]
    pub score: Score,
    pub tips: Vec<AtsTip>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Section {
    #[serde(skip_serializing_if = "Score::is_missing")]
    pub score: Score,
    pub tips: Vec<Tip>,
}

/// Scored critique of one resume.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(skip_serializing_if = "Score::is_missing")]
    pub overall_score: Score,
    #[serde(rename = "ATS")]
    pub ats: AtsSection,
    pub tone_and_style: Section,
    pub content: Section,
    pub structure: Section,
    pub skills: Section,
}

/// String contents, or the JSON text of a non-string value.
fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn tips(section: Option<&Value>) -> &[Value] {
    section
        .and_then(|s| s.get("tips"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

impl AtsSection {
    fn from_json(value: Option<&Value>) -> Self {
        Self {
            score: Score::from_json(value.and_then(|v| v.get("score"))),
            tips: tips(value)
                .iter()
                .map(|t| AtsTip {
                    kind: TipKind::from_json(t.get("type")),
                    tip: text(t.get("tip")),
                })
                .collect(),
        }
    }
}

impl Section {
    fn from_json(value: Option<&Value>) -> Self {
        Self {
            score: Score::from_json(value.and_then(|v| v.get("score"))),
            tips: tips(value)
                .iter()
                .map(|t| Tip {
                    kind: TipKind::from_json(t.get("type")),
                    tip: text(t.get("tip")),
                    explanation: text(t.get("explanation")),
                })
                .collect(),
        }
    }
}

impl Feedback {
    /// Read a parsed model reply. Never fails; see the module docs.
    pub fn from_json(value: &Value) -> Self {
        Self {
            overall_score: Score::from_json(value.get("overallScore")),
            ats: AtsSection::from_json(value.get("ATS")),
            tone_and_style: Section::from_json(value.get("toneAndStyle")),
            content: Section::from_json(value.get("content")),
            structure: Section::from_json(value.get("structure")),
            skills: Section::from_json(value.get("skills")),
        }
    }
}

impl<'de> Deserialize<'de> for Feedback {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Feedback::from_json(&value))
    }
}

/// The four explained categories, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    ToneAndStyle,
    Content,
    Structure,
    Skills,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::ToneAndStyle,
        Category::Content,
        Category::Structure,
        Category::Skills,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Category::ToneAndStyle => "Tone & Style",
            Category::Content => "Content",
            Category::Structure => "Structure",
            Category::Skills => "Skills",
        }
    }
}

impl Feedback {
    pub fn section(&self, category: Category) -> &Section {
        match category {
            Category::ToneAndStyle => &self.tone_and_style,
            Category::Content => &self.content,
            Category::Structure => &self.structure,
            Category::Skills => &self.skills,
        }
    }

    /// Every score with the JSON field it came from.
    pub fn scores(&self) -> [(&'static str, Score); 6] {
        [
            ("overallScore", self.overall_score),
            ("ATS", self.ats.score),
            ("toneAndStyle", self.tone_and_style.score),
            ("content", self.content.score),
            ("structure", self.structure.score),
            ("skills", self.skills.score),
        ]
    }

    /// Number of tips marked for improvement across every category.
    pub fn improvement_count(&self) -> usize {
        let ats = self
            .ats
            .tips
            .iter()
            .filter(|t| t.kind == TipKind::Improve)
            .count();
        let rest: usize = Category::ALL
            .iter()
            .map(|c| {
                self.section(*c)
                    .tips
                    .iter()
                    .filter(|t| t.kind == TipKind::Improve)
                    .count()
            })
            .sum();
        ats + rest
    }
}
