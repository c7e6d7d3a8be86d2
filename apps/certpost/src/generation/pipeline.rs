//! Certificate pipeline — orchestrates one certificate from inbox to `done/`.
//!
//! Flow: read notes → classify event → look up context → select shape →
//!       generate post → file post and move inputs → append shape and save history.
//!
//! Nothing is written until generation succeeds, so a failed certificate leaves the
//! inbox and the shape history exactly as they were.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::classifier::ClassifyInput;
use crate::errors::AppError;
use crate::generation::generator::{Confidence, GeneratedPost, PostRequest};
use crate::generation::tone::Tone;
use crate::inbox::{self, FilingRequest};
use crate::llm_client::Attachment;
use crate::shapes::selector::select_next_shape;
use crate::shapes::Shape;
use crate::state::AppState;

/// Target post length in characters. Outside it is a warning, never an error.
pub const TARGET_CHARS: std::ops::RangeInclusive<usize> = 800..=1300;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Written as `meta.json` beside each post.
#[derive(Debug, Clone, Serialize)]
pub struct PostRecord<'a> {
    pub source_file: &'a str,
    pub generated_at: DateTime<Utc>,
    pub shape: Shape,
    pub shape_reported: Option<&'a str>,
    pub event_type: Option<&'a str>,
    pub tone: Tone,
    pub category: &'a str,
    pub confidence: Confidence,
    pub flag_reason: &'a str,
    pub char_count: usize,
}

/// Result of one successfully processed certificate.
#[derive(Debug, Clone)]
pub struct CertOutcome {
    pub file: String,
    pub post: GeneratedPost,
    pub shape: Shape,
    pub dest_dir: PathBuf,
    pub post_path: PathBuf,
}

impl CertOutcome {
    pub fn char_count(&self) -> usize {
        self.post.text.chars().count()
    }

    pub fn is_low_confidence(&self) -> bool {
        self.post.metadata.confidence == Confidence::Low
    }
}

/// A certificate that could not be processed.
#[derive(Debug)]
pub struct CertFailure {
    pub file: String,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub succeeded: Vec<CertOutcome>,
    pub failed: Vec<CertFailure>,
}

impl RunReport {
    pub fn low_confidence(&self) -> impl Iterator<Item = &CertOutcome> + '_ {
        self.succeeded.iter().filter(|o| o.is_low_confidence())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Processes a single certificate.
///
/// `extra_notes` is used when the certificate has no notes file of its own.
pub async fn process_cert(
    state: &AppState,
    cert: &Path,
    tone: Tone,
    extra_notes: Option<String>,
) -> Result<CertOutcome, AppError> {
    let filename = cert
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::Validation(format!("{} has no file name", cert.display())))?;
    let file_stem = cert
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.clone());

    // Step 1: notes
    let notes = inbox::read_notes(cert).or(extra_notes.filter(|n| !n.trim().is_empty()));

    // Step 2: certificate bytes
    let media_type = inbox::attachment_media_type(cert)?;
    let bytes = tokio::fs::read(cert).await?;
    let attachment = Attachment::from_bytes(&bytes, media_type);

    // Step 3: context lookup
    let event_type = state
        .classifier
        .classify(
            ClassifyInput {
                file_stem: &file_stem,
                notes: notes.as_deref(),
            },
            &state.context_bank,
        )
        .await;
    let event_context = match event_type.as_deref() {
        Some(key) => state.context_bank.render_entry(key),
        None => state.context_bank.render_all(),
    };

    // Step 4: shape selection
    let mut history = state.shape_store.load();
    let shape = select_next_shape(&history);
    info!(
        "{filename}: shape={} event_type={} notes={}",
        shape.slug(),
        event_type.as_deref().unwrap_or("-"),
        notes.as_ref().map_or(0, |n| n.len())
    );

    // Step 5: generation
    let post = state
        .generator
        .generate(&PostRequest {
            filename: &filename,
            file_stem: &file_stem,
            attachment: &attachment,
            notes: notes.as_deref(),
            tone,
            shape,
            event_context: &event_context,
        })
        .await?;

    if post.text.trim().is_empty() {
        return Err(AppError::Llm(format!("Model returned an empty post for {filename}")));
    }
    check_post(&filename, &post, shape);

    // Step 6: file the post and move the inputs
    let char_count = post.text.chars().count();
    let record = PostRecord {
        source_file: &filename,
        generated_at: Utc::now(),
        shape,
        shape_reported: post.metadata.shape_used.as_deref(),
        event_type: event_type.as_deref(),
        tone,
        category: post.metadata.category.dir_name(),
        confidence: post.metadata.confidence,
        flag_reason: &post.metadata.flag_reason,
        char_count,
    };
    let record_json = serde_json::to_string_pretty(&record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize post record: {e}")))?;

    let filed = inbox::file_post(
        &state.paths.done,
        &FilingRequest {
            cert,
            category_dir: post.metadata.category.dir_name(),
            short_name: &post.metadata.short_name,
            post_text: &post.text,
            record_json: &record_json,
        },
    )?;

    // Step 7: record the shape. The post is already filed, so a failed save only warns.
    history.append(shape);
    if let Err(e) = state.shape_store.save(&history) {
        error!("{filename}: post filed but shape history not saved: {e}");
    }

    info!(
        "{filename}: filed to {} ({char_count} chars)",
        filed.dest_dir.display()
    );

    Ok(CertOutcome {
        file: filename,
        post,
        shape,
        dest_dir: filed.dest_dir,
        post_path: filed.post_path,
    })
}

/// Processes certificates one at a time. A failure is recorded and the run continues.
///
/// `ask_notes` is consulted for certificates with no notes file; return `None` to skip.
pub async fn run_batch<F, Fut>(
    state: &AppState,
    certs: &[PathBuf],
    tone: Tone,
    mut ask_notes: F,
) -> RunReport
where
    F: FnMut(&Path) -> Fut,
    Fut: std::future::Future<Output = Option<String>>,
{
    let mut report = RunReport::default();

    for cert in certs {
        let file = cert
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| cert.display().to_string());

        let extra_notes = if inbox::read_notes(cert).is_none() {
            ask_notes(cert).await
        } else {
            None
        };

        match process_cert(state, cert, tone, extra_notes).await {
            Ok(outcome) => report.succeeded.push(outcome),
            Err(e) => {
                error!("{file}: {e}");
                report.failed.push(CertFailure { file, error: e });
            }
        }
    }

    report
}

/// Soft checks on a generated post. Warnings only.
fn check_post(filename: &str, post: &GeneratedPost, shape: Shape) {
    let chars = post.text.chars().count();
    if !TARGET_CHARS.contains(&chars) {
        warn!(
            "{filename}: post is {chars} chars, outside the {}-{} target",
            TARGET_CHARS.start(),
            TARGET_CHARS.end()
        );
    }

    if let Some(reported) = post.metadata.shape_used.as_deref() {
        match reported.parse::<Shape>() {
            Ok(s) if s == shape => {}
            _ => warn!(
                "{filename}: model reported shape {reported:?}, requested {:?}",
                shape.display_name()
            ),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::config::Paths;
    use crate::context::bank::ContextBank;
    use crate::context::classifier::KeywordEventClassifier;
    use crate::generation::generator::{parse_response, PostGenerator};
    use crate::shapes::history::{FileShapeStore, MemoryShapeStore, ShapeHistory, ShapeStore};

    /// Records each request and replies with a canned response or an error.
    struct FakeGenerator {
        reply: Result<String, String>,
        seen: Mutex<Vec<(Shape, String, Option<String>)>>,
        /// Deleted while the post is being generated.
        remove_during: Option<PathBuf>,
    }

    impl FakeGenerator {
        fn ok(body: &str) -> Self {
            Self {
                reply: Ok(body.to_string()),
                seen: Mutex::new(Vec::new()),
                remove_during: None,
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("connection reset by peer".to_string()),
                seen: Mutex::new(Vec::new()),
                remove_during: None,
            }
        }
    }

    #[async_trait]
    impl PostGenerator for FakeGenerator {
        async fn generate(&self, request: &PostRequest<'_>) -> Result<GeneratedPost, AppError> {
            if let Some(path) = &self.remove_during {
                fs::remove_file(path).unwrap();
            }
            self.seen.lock().unwrap().push((
                request.shape,
                request.event_context.to_string(),
                request.notes.map(str::to_string),
            ));
            match &self.reply {
                Ok(body) => Ok(parse_response(body, request.file_stem)),
                Err(msg) => Err(AppError::Llm(msg.clone())),
            }
        }
    }

    const BANK: &str = r#"{"event_types": {
        "lecture": {"description": "A talk.", "typical_experiences": ["Taking notes"], "safe_framing": []},
        "volunteering": {"description": "Giving time.", "typical_experiences": [], "safe_framing": []}
    }}"#;

    fn reply(category: &str, short_name: &str, confidence: &str) -> String {
        format!(
            "{}\n{{\"category\": \"{category}\", \"short_name\": \"{short_name}\", \"confidence\": \"{confidence}\", \"flag_reason\": \"thin\"}}",
            "x".repeat(900)
        )
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        paths: Paths,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        fs::create_dir_all(&paths.inbox).unwrap();
        fs::create_dir_all(&paths.done).unwrap();
        Fixture { _dir: dir, paths }
    }

    fn state(paths: &Paths, generator: Arc<FakeGenerator>) -> AppState {
        AppState {
            paths: paths.clone(),
            generator,
            classifier: Arc::new(KeywordEventClassifier),
            shape_store: Arc::new(FileShapeStore::new(&paths.shape_state)),
            context_bank: Arc::new(ContextBank::from_json(BANK).unwrap()),
        }
    }

    fn add_cert(paths: &Paths, name: &str) -> PathBuf {
        let path = paths.inbox.join(name);
        fs::write(&path, b"%PDF-1.7 test").unwrap();
        path
    }

    fn no_notes(_: &Path) -> std::future::Ready<Option<String>> {
        std::future::ready(None)
    }

    #[tokio::test]
    async fn test_llm_failure_leaves_history_and_inbox_untouched() {
        let fx = fixture();
        let store = FileShapeStore::new(&fx.paths.shape_state);
        store
            .save(&ShapeHistory::from_shapes([
                Shape::InsightContextDetailCta,
                Shape::SceneZoomLesson,
            ]))
            .unwrap();
        let before = fs::read(&fx.paths.shape_state).unwrap();

        let cert = add_cert(&fx.paths, "lecture-haem.pdf");
        fs::write(fx.paths.inbox.join("lecture-haem.notes.txt"), "notes").unwrap();
        let state = state(&fx.paths, Arc::new(FakeGenerator::failing()));

        let err = process_cert(&state, &cert, Tone::Default, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(fs::read(&fx.paths.shape_state).unwrap(), before);
        assert!(cert.exists(), "certificate must stay in the inbox");
        assert!(fx.paths.inbox.join("lecture-haem.notes.txt").exists());
        assert_eq!(fs::read_dir(&fx.paths.done).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_on_cold_start_creates_no_history_file() {
        let fx = fixture();
        let cert = add_cert(&fx.paths, "a.pdf");
        let state = state(&fx.paths, Arc::new(FakeGenerator::failing()));

        assert!(process_cert(&state, &cert, Tone::Default, None).await.is_err());
        assert!(!fx.paths.shape_state.exists());
    }

    #[tokio::test]
    async fn test_filing_failure_leaves_history_untouched() {
        let fx = fixture();
        let store = FileShapeStore::new(&fx.paths.shape_state);
        store
            .save(&ShapeHistory::from_shapes([Shape::InsightContextDetailCta]))
            .unwrap();
        let before = fs::read(&fx.paths.shape_state).unwrap();

        let cert = add_cert(&fx.paths, "acls.pdf");
        let mut generator = FakeGenerator::ok(&reply("clinical", "acls", "high"));
        generator.remove_during = Some(cert.clone());
        let state = state(&fx.paths, Arc::new(generator));

        let err = process_cert(&state, &cert, Tone::Default, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(fs::read(&fx.paths.shape_state).unwrap(), before);
        assert!(!fx.paths.done.join("clinical").join("acls").exists());
    }

    #[tokio::test]
    async fn test_heic_certificate_fails_without_calling_the_model() {
        let fx = fixture();
        let cert = fx.paths.inbox.join("photo.heic");
        fs::write(&cert, b"heic bytes").unwrap();
        let generator = Arc::new(FakeGenerator::ok(&reply("other", "p", "high")));
        let state = state(&fx.paths, generator.clone());

        let err = process_cert(&state, &cert, Tone::Default, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(generator.seen.lock().unwrap().is_empty());
        assert!(cert.exists());
        assert!(!fx.paths.shape_state.exists());
    }

    #[tokio::test]
    async fn test_success_files_post_and_records_shape() {
        let fx = fixture();
        let cert = add_cert(&fx.paths, "bls.pdf");
        let generator = Arc::new(FakeGenerator::ok(&reply("clinical", "bls-course", "high")));
        let state = state(&fx.paths, generator.clone());

        let outcome = process_cert(&state, &cert, Tone::Formal, None)
            .await
            .unwrap();

        assert_eq!(outcome.shape, Shape::InsightContextDetailCta);
        assert_eq!(
            outcome.dest_dir,
            fx.paths.done.join("clinical").join("bls-course")
        );
        assert!(!cert.exists());
        assert!(outcome.dest_dir.join("bls.pdf").exists());
        assert_eq!(fs::read_to_string(&outcome.post_path).unwrap(), "x".repeat(900));

        let record: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(outcome.dest_dir.join(inbox::RECORD_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(record["shape"], "insight-context-detail-cta");
        assert_eq!(record["tone"], "formal");
        assert_eq!(record["char_count"], 900);

        assert_eq!(
            fs::read_to_string(&fx.paths.shape_state).unwrap(),
            "insight-context-detail-cta\n"
        );
    }

    #[tokio::test]
    async fn test_selects_the_shape_missing_from_recent_history() {
        let fx = fixture();
        let cert = add_cert(&fx.paths, "audit.pdf");
        let store = Arc::new(MemoryShapeStore::new(ShapeHistory::from_shapes([
            Shape::QuestionStoryAnswerTakeaway,
            Shape::InsightContextDetailCta,
            Shape::FactConnectionForward,
            Shape::SceneZoomLesson,
        ])));
        let generator = Arc::new(FakeGenerator::ok(&reply("research-and-audits", "audit", "high")));
        let mut state = state(&fx.paths, generator.clone());
        state.shape_store = store.clone();

        let outcome = process_cert(&state, &cert, Tone::Default, None)
            .await
            .unwrap();

        assert_eq!(outcome.shape, Shape::ContrastDetailReflection);
        assert_eq!(generator.seen.lock().unwrap()[0].0, Shape::ContrastDetailReflection);
        let history = store.load();
        assert_eq!(history.last(), Some(Shape::ContrastDetailReflection));
        assert!(!history.contains(Shape::QuestionStoryAnswerTakeaway));
    }

    #[tokio::test]
    async fn test_classified_event_narrows_context() {
        let fx = fixture();
        let cert = add_cert(&fx.paths, "haem-lecture.pdf");
        let generator = Arc::new(FakeGenerator::ok(&reply("courses-and-workshops", "haem", "high")));
        let state = state(&fx.paths, generator.clone());

        process_cert(&state, &cert, Tone::Default, None).await.unwrap();

        let seen = generator.seen.lock().unwrap();
        let (_, context, _) = &seen[0];
        assert!(context.contains("### Lecture"));
        assert!(!context.contains("### Volunteering"));
    }

    #[tokio::test]
    async fn test_unclassified_event_gets_whole_bank() {
        let fx = fixture();
        let cert = add_cert(&fx.paths, "cert-0042.pdf");
        let generator = Arc::new(FakeGenerator::ok(&reply("other", "misc", "medium")));
        let state = state(&fx.paths, generator.clone());

        process_cert(&state, &cert, Tone::Default, None).await.unwrap();

        let seen = generator.seen.lock().unwrap();
        let (_, context, _) = &seen[0];
        assert!(context.contains("### Lecture"));
        assert!(context.contains("### Volunteering"));
    }

    #[tokio::test]
    async fn test_batch_rotates_shapes_across_certificates() {
        let fx = fixture();
        let certs: Vec<_> = (0..6)
            .map(|i| add_cert(&fx.paths, &format!("cert-{i}.pdf")))
            .collect();
        let generator = Arc::new(FakeGenerator::ok(&reply("other", "post", "medium")));
        let state = state(&fx.paths, generator.clone());

        let report = run_batch(&state, &certs, Tone::Default, no_notes).await;

        assert_eq!(report.succeeded.len(), 6);
        assert!(report.failed.is_empty());
        let shapes: Vec<_> = report.succeeded.iter().map(|o| o.shape).collect();
        assert_eq!(&shapes[..5], &Shape::ALL[..]);
        assert_eq!(shapes[5], Shape::ALL[0]);

        let history = FileShapeStore::new(&fx.paths.shape_state).load();
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_batch_continues_after_failure_and_reports_it() {
        let fx = fixture();
        let good = add_cert(&fx.paths, "good.pdf");
        let state_ok = state(&fx.paths, Arc::new(FakeGenerator::ok(&reply("other", "g", "low"))));
        let missing = fx.paths.inbox.join("vanished.pdf");

        let report = run_batch(&state_ok, &[missing, good], Tone::Default, no_notes).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].file, "vanished.pdf");
        assert!(matches!(report.failed[0].error, AppError::Io(_)));
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.low_confidence().count(), 1);
    }

    #[tokio::test]
    async fn test_prompted_notes_used_only_without_notes_file() {
        let fx = fixture();
        let with_file = add_cert(&fx.paths, "a.pdf");
        fs::write(fx.paths.inbox.join("a.notes.txt"), "from file").unwrap();
        let without_file = add_cert(&fx.paths, "b.pdf");
        let generator = Arc::new(FakeGenerator::ok(&reply("other", "p", "medium")));
        let state = state(&fx.paths, generator.clone());

        let asked = Arc::new(Mutex::new(Vec::new()));
        let asked_in = asked.clone();
        run_batch(&state, &[with_file, without_file], Tone::Default, move |cert: &Path| {
            asked_in
                .lock()
                .unwrap()
                .push(cert.file_name().unwrap().to_string_lossy().into_owned());
            async { Some("typed in".to_string()) }
        })
        .await;

        assert_eq!(*asked.lock().unwrap(), vec!["b.pdf".to_string()]);
        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0].2.as_deref(), Some("from file"));
        assert_eq!(seen[1].2.as_deref(), Some("typed in"));
    }
}
