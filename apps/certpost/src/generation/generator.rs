//! Post Generator — turns one certificate into post text plus sorting metadata.
//!
//! The model is a black box behind the `PostGenerator` trait. `LlmPostGenerator`
//! is the real backend; tests swap in fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::generation::prompts::{
    CONTEXT_BANK_HEADING, NOTES_ABSENT, NOTES_PRESENT_TEMPLATE, POST_PROMPT_TEMPLATE,
    POST_SYSTEM_TEMPLATE, SHAPE_LINE_TEMPLATE,
};
use crate::generation::tone::Tone;
use crate::llm_client::prompts::{BANNED_PATTERNS, SPECIFICITY_INSTRUCTION, TENSE_INSTRUCTION};
use crate::llm_client::{strip_json_fences, Attachment, LlmClient};
use crate::shapes::Shape;

/// How many trailing lines are searched for the metadata JSON.
const METADATA_SEARCH_LINES: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Where a finished post is filed under `done/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Clinical,
    CoursesAndWorkshops,
    ResearchAndAudits,
    VolunteeringAndLeadership,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Clinical,
        Category::CoursesAndWorkshops,
        Category::ResearchAndAudits,
        Category::VolunteeringAndLeadership,
        Category::Other,
    ];

    /// Directory name under `done/`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Clinical => "clinical",
            Category::CoursesAndWorkshops => "courses-and-workshops",
            Category::ResearchAndAudits => "research-and-audits",
            Category::VolunteeringAndLeadership => "volunteering-and-leadership",
            Category::Other => "other",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Category::Clinical => {
                "hands-on clinical skills, certifications (BLS, ACLS), clinical placements"
            }
            Category::CoursesAndWorkshops => {
                "lectures, talks, conferences, webinars, workshops, courses, hackathons: anything attended to learn"
            }
            Category::ResearchAndAudits => {
                "research projects, clinical audits, posters, publications"
            }
            Category::VolunteeringAndLeadership => {
                "volunteering, society roles, outreach, mentoring, teaching: anything where time was given"
            }
            Category::Other => "doesn't fit the above",
        }
    }

    /// Unknown names map to `Other`.
    pub fn from_name(name: &str) -> Category {
        let name = name.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.dir_name() == name)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    /// Same spelling as the serialized form in `meta.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    fn from_name(name: &str) -> Confidence {
        match name.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "low" => Confidence::Low,
            _ => Confidence::Medium,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata the model appends after the post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMetadata {
    pub category: Category,
    pub short_name: String,
    pub confidence: Confidence,
    pub flag_reason: String,
    /// The shape the model says it used, verbatim. Informational only.
    pub shape_used: Option<String>,
}

/// Raw form of the trailing JSON line; every field optional.
#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    category: Option<String>,
    short_name: Option<String>,
    confidence: Option<String>,
    flag_reason: Option<String>,
    shape_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPost {
    pub text: String,
    pub metadata: PostMetadata,
}

/// Everything the generator needs for one certificate.
#[derive(Debug, Clone)]
pub struct PostRequest<'a> {
    pub filename: &'a str,
    /// Fallback for `short_name` when the model gives none.
    pub file_stem: &'a str,
    pub attachment: &'a Attachment,
    pub notes: Option<&'a str>,
    pub tone: Tone,
    pub shape: Shape,
    /// Rendered context-bank section; empty when there is none.
    pub event_context: &'a str,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The post generator trait. Implement this to swap backends without touching
/// the pipeline.
#[async_trait]
pub trait PostGenerator: Send + Sync {
    async fn generate(&self, request: &PostRequest<'_>) -> Result<GeneratedPost, AppError>;
}

/// Claude-backed generator. One LLM call per certificate.
pub struct LlmPostGenerator(pub LlmClient);

#[async_trait]
impl PostGenerator for LlmPostGenerator {
    async fn generate(&self, request: &PostRequest<'_>) -> Result<GeneratedPost, AppError> {
        let system = build_system_prompt(request.event_context);
        let prompt = build_post_prompt(request);

        let raw = self
            .0
            .call_text(&prompt, &system, Some(request.attachment))
            .await
            .map_err(|e| AppError::Llm(format!("Post generation failed: {e}")))?;

        debug!("Model returned {} chars", raw.len());
        Ok(parse_response(&raw, request.file_stem))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt building
// ────────────────────────────────────────────────────────────────────────────

pub fn build_system_prompt(event_context: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("- \"{}\": {}", c.dir_name(), c.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let context_bank = if event_context.trim().is_empty() {
        String::new()
    } else {
        format!("{CONTEXT_BANK_HEADING}\n{event_context}")
    };

    POST_SYSTEM_TEMPLATE
        .replace("{specificity_instruction}", SPECIFICITY_INSTRUCTION)
        .replace("{tense_instruction}", TENSE_INSTRUCTION)
        .replace("{banned_patterns}", BANNED_PATTERNS)
        .replace("{categories}", &categories)
        .replace("{context_bank}", &context_bank)
}

pub fn build_post_prompt(request: &PostRequest<'_>) -> String {
    let shape_line = SHAPE_LINE_TEMPLATE
        .replace("{shape}", request.shape.display_name())
        .replace("{guidance}", request.shape.guidance());

    let notes_section = match request.notes {
        Some(notes) if !notes.trim().is_empty() => {
            NOTES_PRESENT_TEMPLATE.replace("{notes}", notes.trim())
        }
        _ => NOTES_ABSENT.to_string(),
    };

    POST_PROMPT_TEMPLATE
        .replace("{filename}", request.filename)
        .replace("{tone_line}", request.tone.instruction())
        .replace("{shape_line}", &shape_line)
        .replace("{notes_section}", &notes_section)
}

// ────────────────────────────────────────────────────────────────────────────
// Response parsing
// ────────────────────────────────────────────────────────────────────────────

/// Splits the model output into post text and metadata.
///
/// The metadata is a JSON object on one of the last few lines. When it is absent or
/// unparseable the whole output is the post and defaults apply.
pub fn parse_response(raw: &str, file_stem: &str) -> GeneratedPost {
    let raw = raw.trim();
    let lines: Vec<&str> = raw.lines().collect();

    let found = lines
        .iter()
        .enumerate()
        .rev()
        .take(METADATA_SEARCH_LINES)
        .find_map(|(i, line)| {
            let candidate = strip_json_fences(line).trim_matches('`').trim();
            if !(candidate.starts_with('{') && candidate.ends_with('}')) {
                return None;
            }
            serde_json::from_str::<RawMetadata>(candidate)
                .ok()
                .map(|meta| (i, meta))
        });

    let (text, raw_meta) = match found {
        Some((i, meta)) => (lines[..i].join("\n").trim().to_string(), meta),
        None => {
            warn!("No metadata line found in model output, using defaults");
            (raw.to_string(), RawMetadata::default())
        }
    };

    let short_name = raw_meta
        .short_name
        .as_deref()
        .map(sanitize_short_name)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_short_name(file_stem));

    GeneratedPost {
        text,
        metadata: PostMetadata {
            category: raw_meta
                .category
                .as_deref()
                .map(Category::from_name)
                .unwrap_or_default(),
            short_name,
            confidence: raw_meta
                .confidence
                .as_deref()
                .map(Confidence::from_name)
                .unwrap_or_default(),
            flag_reason: raw_meta.flag_reason.unwrap_or_default(),
            shape_used: raw_meta.shape_used.filter(|s| !s.trim().is_empty()),
        },
    }
}

/// Lowercase kebab-case restricted to `[a-z0-9-]`, safe as a single path component.
pub fn sanitize_short_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

fn fallback_short_name(file_stem: &str) -> String {
    let name = sanitize_short_name(file_stem);
    if name.is_empty() {
        "certificate".to_string()
    } else {
        name
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
