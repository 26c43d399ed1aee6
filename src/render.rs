//! Artifact rendering
//!
//! Maps a selected tool kind to its loading placeholder and, once the tool
//! has run, to the final artifact built from the tool's result payload.
//! The set of enabled kinds and the field-presentation table are injected
//! at construction.

mod artifact;
mod fields;
mod views;

pub use artifact::{
    Artifact, ArtifactKind, CarouselView, ComparisonRow, ComparisonView, FieldRow, ProductCard,
    ProductDetailView, TilesView,
};
pub use fields::FieldPresentation;
pub use views::DEFAULT_CAROUSEL_TITLE;

use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Why no artifact could be selected for a model proposal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("No renderer registered for tool '{0}'")]
    UnknownTool(String),
    #[error("Model proposed no tool calls")]
    NoToolCalls,
}

/// Registry of enabled artifact kinds
#[derive(Debug, Clone)]
pub struct ToolRenderers {
    enabled: Vec<ArtifactKind>,
    fields: Arc<FieldPresentation>,
}

impl ToolRenderers {
    /// All kinds enabled
    pub fn new(fields: FieldPresentation) -> Self {
        Self::with_kinds(ArtifactKind::ALL.to_vec(), fields)
    }

    pub fn with_kinds(enabled: Vec<ArtifactKind>, fields: FieldPresentation) -> Self {
        Self {
            enabled,
            fields: Arc::new(fields),
        }
    }

    pub fn fields(&self) -> &FieldPresentation {
        &self.fields
    }

    pub fn resolve(&self, tool_name: &str) -> Result<ArtifactKind, SelectionError> {
        ArtifactKind::from_tool_name(tool_name)
            .filter(|kind| self.enabled.contains(kind))
            .ok_or_else(|| SelectionError::UnknownTool(tool_name.to_string()))
    }

    pub fn loading(&self, kind: ArtifactKind) -> Artifact {
        Artifact::Loading { kind }
    }

    /// Final artifact for a tool result. Tool-reported failures and
    /// non-object results render as an inline error.
    pub fn finalize(&self, kind: ArtifactKind, result: &Value) -> Artifact {
        if let Some(message) = result.get("error").and_then(Value::as_str) {
            return Artifact::error(kind.error_title(), message);
        }
        if !result.is_object() {
            return Artifact::error(kind.error_title(), "The tool returned no data");
        }

        let fields = self.fields.as_ref();
        match kind {
            ArtifactKind::ProductDetails => Artifact::ProductDetail(views::detail(result, fields)),
            ArtifactKind::ProductComparison => {
                Artifact::ProductComparison(views::comparison(result, fields))
            }
            ArtifactKind::ProductTiles => Artifact::ProductTiles(views::tiles(result, fields)),
            ArtifactKind::ProductCarousel => Artifact::ProductCarousel(views::carousel(result, fields)),
        }
    }

    /// Idle view over catalog products, shown before any turn produced an
    /// artifact
    pub fn default_carousel(&self, products: &[Value]) -> Artifact {
        let result = json!({
            "title": DEFAULT_CAROUSEL_TITLE,
            "products": products,
        });
        Artifact::ProductCarousel(views::carousel(&result, &self.fields))
    }
}

impl Default for ToolRenderers {
    fn default() -> Self {
        Self::new(FieldPresentation::default())
    }
}
