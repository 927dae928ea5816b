//! Records produced by the extraction pipeline
//!
//! These mirror the JSON payloads served by the document API. Only the
//! fields the viewer needs are modelled; unknown fields are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// A titled block of text located on one page
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bbox_x0: Option<f64>,
    #[serde(default)]
    pub bbox_y0: Option<f64>,
    #[serde(default)]
    pub bbox_x1: Option<f64>,
    #[serde(default)]
    pub bbox_y1: Option<f64>,
}

impl Section {
    /// Heading shown in the side panel
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(untitled section)"
        } else {
            &self.title
        }
    }

    /// One-based page reference; a missing page reads as the first page
    #[must_use]
    pub fn page_reference(&self) -> String {
        format!("Refer: Page-{}", self.page.unwrap_or(0) + 1)
    }
}

/// Evidence for one extracted field value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: i64,
    pub model_name: String,
    pub record_id: i64,
    pub field_name: String,
    /// Zero-based page index; negative values come from unlocated fields
    pub page: i64,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl Citation {
    /// `p3 • [10,20]→[30,40]`
    #[must_use]
    pub fn display_label(&self) -> String {
        format!(
            "p{} • [{:.0},{:.0}]→[{:.0},{:.0}]",
            self.page.saturating_add(1),
            self.x0,
            self.y0,
            self.x1,
            self.y1
        )
    }
}

/// Property summary shown above the section list
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub unit_count: Option<i64>,
    #[serde(default)]
    pub cap_rate: Option<f64>,
    #[serde(default)]
    pub sqft: Option<i64>,
    #[serde(default)]
    pub source_document: Option<i64>,
}

impl Property {
    /// `12 Main St • Austin, TX 78701 • 5400 SF`
    #[must_use]
    pub fn summary_line(&self) -> String {
        let mut line = self.address.clone().unwrap_or_default();
        if let Some(city) = self.city.as_deref().filter(|c| !c.is_empty()) {
            line.push_str(&format!(
                " • {city}, {} {}",
                self.state.as_deref().unwrap_or_default(),
                self.zipcode.as_deref().unwrap_or_default()
            ));
        }
        if let Some(sqft) = self.sqft.filter(|s| *s != 0) {
            line.push_str(&format!(" • {sqft} SF"));
        }
        line.trim().to_string()
    }
}

/// An uploaded document with its extracted sections
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    /// File location as served by the API, absolute or relative
    pub file: String,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub pages: Option<i64>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub property: Option<Property>,
}

/// Load a document record from a JSON file
pub fn load_document_record(path: &Path) -> Result<DocumentRecord> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading record {}", path.display()))?;
    let record: DocumentRecord = serde_json::from_str(&content)
        .with_context(|| format!("parsing record {}", path.display()))?;
    debug!(
        "Loaded document record {} with {} sections",
        record.id,
        record.sections.len()
    );
    Ok(record)
}

/// Load a citation list from a JSON file.
///
/// Accepts a bare array or a paginated `{ "results": [...] }` envelope.
pub fn load_citations(path: &Path) -> Result<Vec<Citation>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Payload {
        List(Vec<Citation>),
        Page { results: Vec<Citation> },
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("reading citations {}", path.display()))?;
    let payload: Payload = serde_json::from_str(&content)
        .with_context(|| format!("parsing citations {}", path.display()))?;
    Ok(match payload {
        Payload::List(list) | Payload::Page { results: list } => list,
    })
}

/// Turn the API's `file` field into a fetchable location.
///
/// Absolute URLs pass through. Relative paths are resolved against the
/// origin of `api_base` (the API root with its trailing `/api` removed).
#[must_use]
pub fn normalize_doc_url(file_field: &str, api_base: &str) -> String {
    if file_field.contains("://") {
        return file_field.to_string();
    }
    let trimmed = api_base.trim_end_matches('/');
    let origin = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    if file_field.starts_with('/') {
        format!("{origin}{file_field}")
    } else {
        format!("{origin}/{file_field}")
    }
}

/// Resolve a document location to a local path.
///
/// Plain paths and `file://` URLs are accepted; remote URLs are not
/// fetched by the viewer.
pub fn local_document_path(location: &str) -> Result<PathBuf> {
    if let Some(path) = location.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if location.contains("://") {
        anyhow::bail!("remote document locations are not supported: {location}");
    }
    Ok(PathBuf::from(location))
}
