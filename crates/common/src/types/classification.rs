use serde::{Deserialize, Serialize};

/// Position on the political spectrum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leaning {
    Left,
    Center,
    Right,
}

impl Leaning {
    /// Classifier class ids: 0 = Left, 2 = Right, anything else = Center.
    pub fn from_class_id(class_id: i64) -> Self {
        match class_id {
            0 => Self::Left,
            2 => Self::Right,
            _ => Self::Center,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Center => "Center",
            Self::Right => "Right",
        }
    }
}

impl std::fmt::Display for Leaning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sentence the classifier flagged as biased, with its raw confidence in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawEvidence {
    pub text: String,
    pub raw_confidence: f64,
}

/// Output of the external classification service for one document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub predicted_class_id: i64,
    /// Indexed [Left, Center, Right]. May be short; missing entries read as 0.
    pub probabilities: Vec<f64>,
    /// Ranked most-biased first.
    pub evidence: Vec<RawEvidence>,
}

impl ClassificationResult {
    pub fn probability(&self, leaning: Leaning) -> f64 {
        let index = match leaning {
            Leaning::Left => 0,
            Leaning::Center => 1,
            Leaning::Right => 2,
        };
        self.probabilities.get(index).copied().unwrap_or(0.0)
    }
}
