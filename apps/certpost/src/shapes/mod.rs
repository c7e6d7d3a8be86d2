//! Post shapes — the fixed rotation of structural templates a post can follow.
//!
//! A shape is persisted by its slug and shown to the model by its display name.

pub mod history;
pub mod selector;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the five structural templates for a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shape {
    InsightContextDetailCta,
    QuestionStoryAnswerTakeaway,
    ContrastDetailReflection,
    SceneZoomLesson,
    FactConnectionForward,
}

impl Shape {
    /// Every shape in rotation order. Selection tie-breaks on this order.
    pub const ALL: [Shape; 5] = [
        Shape::InsightContextDetailCta,
        Shape::QuestionStoryAnswerTakeaway,
        Shape::ContrastDetailReflection,
        Shape::SceneZoomLesson,
        Shape::FactConnectionForward,
    ];

    /// Stable token written to the history file.
    pub fn slug(&self) -> &'static str {
        match self {
            Shape::InsightContextDetailCta => "insight-context-detail-cta",
            Shape::QuestionStoryAnswerTakeaway => "question-story-answer-takeaway",
            Shape::ContrastDetailReflection => "contrast-detail-reflection",
            Shape::SceneZoomLesson => "scene-zoom-lesson",
            Shape::FactConnectionForward => "fact-connection-forward",
        }
    }

    /// Human-readable name used in prompts and echoed back by the model.
    pub fn display_name(&self) -> &'static str {
        match self {
            Shape::InsightContextDetailCta => "Insight → Context → Detail → CTA",
            Shape::QuestionStoryAnswerTakeaway => "Question → Story → Answer → Takeaway",
            Shape::ContrastDetailReflection => "Contrast → Detail → Reflection",
            Shape::SceneZoomLesson => "Scene → Zoom in → Wider lesson",
            Shape::FactConnectionForward => "Fact → Personal connection → Forward-looking",
        }
    }

    /// One-line guidance describing how the shape unfolds.
    pub fn guidance(&self) -> &'static str {
        match self {
            Shape::InsightContextDetailCta => {
                "lead with what you learned, give context, add a detail, close with engagement"
            }
            Shape::QuestionStoryAnswerTakeaway => {
                "open with a question, tell the story, answer it, leave a takeaway"
            }
            Shape::ContrastDetailReflection => {
                "\"I thought X, but actually Y\", flesh it out, reflect on what changed"
            }
            Shape::SceneZoomLesson => {
                "start with a moment or scene, zoom into the specifics, pull out the wider point"
            }
            Shape::FactConnectionForward => {
                "lead with something concrete from the certificate, connect it to your journey, look ahead"
            }
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shape: {0:?}")]
pub struct UnknownShape(pub String);

impl FromStr for Shape {
    type Err = UnknownShape;

    /// Accepts the slug or the display name, case-insensitively.
    /// ASCII arrows (`->`) are accepted in place of `→`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().replace("->", "→").to_lowercase();
        Shape::ALL
            .into_iter()
            .find(|shape| {
                shape.slug() == needle || shape.display_name().to_lowercase() == needle
            })
            .ok_or_else(|| UnknownShape(s.trim().to_string()))
    }
}
