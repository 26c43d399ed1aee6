//! Product catalog and image retrieval
//!
//! Catalogs live under `<data_dir>/<type>/catalog.csv`, one product per row
//! with a header line naming the columns; images under
//! `<data_dir>/<type>/images/<id>.jpg`. Products are opaque records of
//! string fields: only `product_id` is read here.

use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Public route images are served from
pub const IMAGE_ROUTE: &str = "/api/product-images";

const CATALOG_FILE: &str = "catalog.csv";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Invalid path segment: {0:?}")]
    InvalidPathSegment(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Clone)]
pub struct Catalog {
    data_dir: PathBuf,
}

/// A single file or directory name; no separators, no parent references
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains(['/', '\\', '\0'])
}

fn check_segment(segment: &str) -> CatalogResult<&str> {
    if is_valid_segment(segment) {
        Ok(segment)
    } else {
        Err(CatalogError::InvalidPathSegment(segment.to_string()))
    }
}

impl Catalog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn category_dir(&self, product_type: &str) -> CatalogResult<PathBuf> {
        Ok(self.data_dir.join(check_segment(product_type)?))
    }

    fn image_path(&self, product_type: &str, product_id: &str) -> CatalogResult<PathBuf> {
        let file = format!("{}.jpg", check_segment(product_id)?);
        Ok(self.category_dir(product_type)?.join("images").join(file))
    }

    /// All products of a category, each annotated with `has_image` and,
    /// when an image exists, `image_url`
    pub async fn products(&self, product_type: &str) -> CatalogResult<Vec<Value>> {
        let path = self.category_dir(product_type)?.join(CATALOG_FILE);
        let raw = tokio::fs::read(&path).await.map_err(|source| CatalogError::Io {
            path: path.clone(),
            source,
        })?;
        let records = parse_rows(&raw).map_err(|e| CatalogError::Parse {
            path,
            message: e.to_string(),
        })?;

        let mut products = Vec::with_capacity(records.len());
        for record in records {
            products.push(Value::Object(self.annotate(product_type, record).await));
        }
        Ok(products)
    }

    async fn annotate(&self, product_type: &str, mut record: Map<String, Value>) -> Map<String, Value> {
        let id = record
            .get("product_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let has_image = match id.as_deref().map(|id| self.image_path(product_type, id)) {
            Some(Ok(path)) => tokio::fs::metadata(&path)
                .await
                .is_ok_and(|meta| meta.is_file()),
            _ => false,
        };

        record.insert("has_image".to_string(), Value::Bool(has_image));
        let image_url = match (has_image, id) {
            (true, Some(id)) => Value::String(format!("{IMAGE_ROUTE}/{product_type}/{id}")),
            _ => Value::Null,
        };
        record.insert("image_url".to_string(), image_url);
        record
    }

    /// Raw JPEG bytes, or `None` when the product has no image
    pub async fn image(&self, product_type: &str, product_id: &str) -> CatalogResult<Option<Vec<u8>>> {
        let path = self.image_path(product_type, product_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CatalogError::Io { path, source }),
        }
    }
}

/// Rows keyed by the header line. Short rows keep only the columns they
/// have.
fn parse_rows(raw: &[u8]) -> Result<Vec<Map<String, Value>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(raw);
    let headers = reader.headers()?.clone();
    reader
        .records()
        .map(|row| {
            let row = row?;
            Ok(headers
                .iter()
                .zip(row.iter())
                .map(|(column, value)| (column.to_string(), Value::String(value.to_string())))
                .collect())
        })
        .collect()
}
