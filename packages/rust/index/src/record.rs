//! Marker filtering and line-to-record parsing.
//!
//! Each meaningful line is one element of an enormous enclosing JSON
//! array. The core never requires that array to be syntactically valid:
//! it parses each marker-prefixed line independently after stripping the
//! element separator.

use mrfscan_shared::{FileRef, IndexEntry, MrfScanError, PlanRecord, Result, EIN_ID_TYPE};

/// Structural marker identifying a meaningful index line. Everything else
/// (the array's header/footer lines) is framing noise.
pub const RECORD_MARKER: &str = "{\"reporting_plans\"";

/// Whether a framed line is a record line at all.
pub fn is_record_line(line: &str) -> bool {
    line.starts_with(RECORD_MARKER)
}

/// Parse one marker-prefixed line into a [`PlanRecord`].
///
/// Returns `Ok(None)` — not an error — when the record is ineligible for
/// enrichment: a non-EIN identifier, or no files left once skip-listed
/// descriptions (e.g. dental/vision categories) are removed.
pub fn parse_record(line: &str, skip_descriptions: &[String]) -> Result<Option<PlanRecord>> {
    // Strip exactly one trailing element separator, if present.
    let body = line.strip_suffix(',').unwrap_or(line);

    let entry: IndexEntry = serde_json::from_str(body).map_err(|e| {
        MrfScanError::malformed(format!("{e} in line starting {:?}", truncate(line, 80)))
    })?;

    let plan = entry
        .reporting_plans
        .first()
        .ok_or_else(|| MrfScanError::malformed("record has no reporting_plans"))?;

    if plan.plan_id_type != EIN_ID_TYPE {
        return Ok(None);
    }

    let files: Vec<FileRef> = entry
        .in_network_files
        .into_iter()
        .filter(|f| {
            let desc = f.description.trim();
            !skip_descriptions.iter().any(|skip| skip == desc)
        })
        .collect();

    if files.is_empty() {
        return Ok(None);
    }

    Ok(Some(PlanRecord {
        ein: plan.plan_id.clone(),
        files,
    }))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
