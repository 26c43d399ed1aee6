//! Renderable artifacts and their view models

use serde::Serialize;
use std::collections::BTreeMap;

/// Every supported artifact kind. Closed: tool names outside this set are
/// a selection error, never a silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    ProductDetails,
    ProductComparison,
    ProductTiles,
    ProductCarousel,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::ProductDetails,
        ArtifactKind::ProductComparison,
        ArtifactKind::ProductTiles,
        ArtifactKind::ProductCarousel,
    ];

    /// Tool name as proposed by the pipeline
    pub fn name(self) -> &'static str {
        match self {
            ArtifactKind::ProductDetails => "product-details",
            ArtifactKind::ProductComparison => "product-comparison",
            ArtifactKind::ProductTiles => "product-tiles",
            ArtifactKind::ProductCarousel => "product-carousel",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Title of the inline error shown when this kind's tool fails
    pub fn error_title(self) -> &'static str {
        match self {
            ArtifactKind::ProductDetails => "Error Loading Product Details",
            ArtifactKind::ProductComparison => "Error Loading Product Comparison",
            ArtifactKind::ProductTiles | ArtifactKind::ProductCarousel => "Error Loading Products",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A rendered unit of rich output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Artifact {
    /// Placeholder while the selected tool runs
    Loading { kind: ArtifactKind },
    ProductDetail(ProductDetailView),
    ProductComparison(ComparisonView),
    ProductTiles(TilesView),
    ProductCarousel(CarouselView),
    Error { title: String, message: String },
}

impl Artifact {
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Artifact::Error {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Artifact::Loading { .. })
    }
}

/// Summary of one product as shown on cards and headers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductCard {
    pub id: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub marketing_link: Option<String>,
    pub badges: Vec<String>,
}

/// One labelled, formatted field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRow {
    pub key: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetailView {
    pub product: ProductCard,
    pub fields: Vec<FieldRow>,
    pub description: Option<String>,
    pub marketing_content: Option<String>,
}

/// One comparison row; either side may lack the field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub key: String,
    pub label: String,
    pub first: Option<String>,
    pub second: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub first: ProductCard,
    pub second: ProductCard,
    pub rows: Vec<ComparisonRow>,
    /// Absolute numeric differences, e.g. `price_difference`
    pub highlights: BTreeMap<String, f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilesView {
    pub title: String,
    pub description: Option<String>,
    pub products: Vec<ProductCard>,
    /// Set when some requested products were not found
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarouselView {
    pub title: String,
    pub description: Option<String>,
    pub products: Vec<ProductCard>,
}
