//! Tone calibration — maps the operator's `--tone` choice to an instruction line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Default,
    Casual,
    Formal,
}

impl Tone {
    pub fn instruction(&self) -> &'static str {
        match self {
            Tone::Casual => {
                "Tone: conversational and warm, like talking to a friend who's also in medicine."
            }
            Tone::Formal => {
                "Tone: polished and professional, suitable for academic and clinical networking."
            }
            Tone::Default => {
                "Tone: natural middle ground, professional but not stiff, personal but not too casual."
            }
        }
    }

    /// Parses a tone name, falling back to `Default` for anything unrecognised.
    pub fn parse_lenient(s: &str) -> (Tone, bool) {
        match s.parse() {
            Ok(tone) => (tone, true),
            Err(_) => (Tone::Default, false),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tone::Default => "default",
            Tone::Casual => "casual",
            Tone::Formal => "formal",
        })
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "" => Ok(Tone::Default),
            "casual" => Ok(Tone::Casual),
            "formal" => Ok(Tone::Formal),
            other => Err(format!("unknown tone '{other}'")),
        }
    }
}
