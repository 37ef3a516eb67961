//! Domain types for the index and lookup documents.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The identifier kind eligible for enrichment.
pub const EIN_ID_TYPE: &str = "EIN";

// ---------------------------------------------------------------------------
// Index line shapes
// ---------------------------------------------------------------------------

/// One plan named on an index line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingPlan {
    /// Human-readable plan name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    /// Identifier kind ("EIN" or otherwise).
    pub plan_id_type: String,
    /// Identifier value.
    pub plan_id: String,
}

/// A file reference found inline on an index line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// File category description (e.g. "In-Network Negotiated Rates Files").
    pub description: String,
    /// Where the file lives.
    pub location: String,
}

/// The raw shape of one marker-prefixed index line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Plans this line reports on; the first entry carries the identifier.
    pub reporting_plans: Vec<ReportingPlan>,
    /// File references listed inline on the line.
    #[serde(default)]
    pub in_network_files: Vec<FileRef>,
}

/// A parsed, enrichment-eligible record: an EIN plus its surviving files.
#[derive(Debug, Clone)]
pub struct PlanRecord {
    /// The employer identification number to look up.
    pub ein: String,
    /// Inline file references after skip-list filtering.
    pub files: Vec<FileRef>,
}

// ---------------------------------------------------------------------------
// Lookup response shapes
// ---------------------------------------------------------------------------

/// One entry in a lookup file-category collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupFile {
    /// Candidate URL.
    pub url: String,
    /// Display name carrying the region encoding.
    pub displayname: String,
}

/// A per-EIN lookup response: named file-category collections.
///
/// Unknown keys and non-collection values are kept raw and ignored; only
/// the category keys the caller asks for are decoded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupDocument {
    #[serde(flatten)]
    categories: HashMap<String, serde_json::Value>,
}

impl LookupDocument {
    /// Decode the file list under `key`, or empty if absent/mis-shaped.
    pub fn files_in(&self, key: &str) -> Vec<LookupFile> {
        self.categories
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Failure side-channel
// ---------------------------------------------------------------------------

/// An identifier or line that could not be processed.
///
/// Appended to the failure log; never blocks forward progress and is
/// consumed by nothing inside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// What failed: an EIN, or a truncated line preview.
    pub subject: String,
    /// Why it failed.
    pub reason: String,
}

impl FailureRecord {
    pub fn new(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.subject, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_entry_deserializes() {
        let line = r#"{"reporting_plans":[{"plan_name":"ACME PPO","plan_id_type":"EIN","plan_id":"112233445"}],"in_network_files":[{"description":"Dental Vision","location":"https://example.com/dv.json.gz"}]}"#;
        let entry: IndexEntry = serde_json::from_str(line).expect("deserialize");
        assert_eq!(entry.reporting_plans[0].plan_id, "112233445");
        assert_eq!(entry.in_network_files.len(), 1);
    }

    #[test]
    fn index_entry_without_files() {
        let line = r#"{"reporting_plans":[{"plan_id_type":"HIOS","plan_id":"98765"}]}"#;
        let entry: IndexEntry = serde_json::from_str(line).expect("deserialize");
        assert!(entry.in_network_files.is_empty());
        assert!(entry.reporting_plans[0].plan_name.is_none());
    }

    #[test]
    fn lookup_document_decodes_known_categories_only() {
        let body = r#"{
            "In-Network Negotiated Rates Files": [
                {"url": "https://example.com/a.json.gz", "displayname": "2023-04_NY_a"}
            ],
            "version": "1.0",
            "notes": {"free": "form"}
        }"#;
        let doc: LookupDocument = serde_json::from_str(body).expect("deserialize");
        let files = doc.files_in("In-Network Negotiated Rates Files");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].displayname, "2023-04_NY_a");
        assert!(doc.files_in("missing category").is_empty());
    }

    #[test]
    fn failure_record_display_is_tab_separated() {
        let rec = FailureRecord::new("112233445", "lookup error: HTTP 500");
        assert_eq!(rec.to_string(), "112233445\tlookup error: HTTP 500");
    }
}
