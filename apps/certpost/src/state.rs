use std::sync::Arc;

use crate::config::Paths;
use crate::context::bank::ContextBank;
use crate::context::classifier::EventClassifier;
use crate::generation::generator::PostGenerator;
use crate::shapes::history::ShapeStore;

/// Everything a run needs, injected once at startup and passed by reference.
#[derive(Clone)]
pub struct AppState {
    pub paths: Paths,
    /// Pluggable post generator. Default: LlmPostGenerator.
    pub generator: Arc<dyn PostGenerator>,
    /// Pluggable event classifier. Default: KeywordEventClassifier.
    pub classifier: Arc<dyn EventClassifier>,
    /// Shape history. Default: FileShapeStore at `last_shape.txt`.
    pub shape_store: Arc<dyn ShapeStore>,
    pub context_bank: Arc<ContextBank>,
}
