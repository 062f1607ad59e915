use chrono::{DateTime, Utc};
use serde::Serialize;

/// A feed document as decoded from the wire. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeed {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeed {
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub items: Vec<NormalizedItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Set when the source date was missing or unparsable and ingestion time was used.
    pub published_at_fallback: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped: usize,
    pub missing_link: usize,
}
