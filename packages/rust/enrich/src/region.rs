//! Region resolution for candidate file entries.
//!
//! The resolver is an injected collaborator: the pipeline never builds or
//! mutates a region table itself, it only asks "which region does this
//! entry encode?" once per candidate. Implementations must be safe to
//! query concurrently from every worker.

/// Maps a candidate file entry to the region code it encodes.
///
/// Returning `None` means "unresolvable", which callers treat as a
/// non-match — never an error.
pub trait RegionResolver: Send + Sync {
    fn resolve(&self, displayname: &str, url: &str) -> Option<String>;
}

/// Stateless resolver reading the region directly out of display names.
///
/// Display names carry the region as a two-letter code following the
/// month's date tag (`2023-04_NY_...`) or as a leading `NY_...` prefix.
/// The URL is consulted with the same date-tag rule as a last resort.
#[derive(Debug, Clone)]
pub struct DisplayNameResolver {
    date_tag: String,
}

impl DisplayNameResolver {
    pub fn new(date_tag: impl Into<String>) -> Self {
        Self {
            date_tag: date_tag.into(),
        }
    }

    fn code_after_tag<'a>(&self, text: &'a str) -> Option<&'a str> {
        let (_, rest) = text.split_once(&self.date_tag)?;
        two_letter_code(rest)
    }
}

impl RegionResolver for DisplayNameResolver {
    fn resolve(&self, displayname: &str, url: &str) -> Option<String> {
        self.code_after_tag(displayname)
            .or_else(|| two_letter_code(displayname))
            .or_else(|| self.code_after_tag(url))
            .map(str::to_owned)
    }
}

/// A leading `XX_` region code, if present.
fn two_letter_code(text: &str) -> Option<&str> {
    let code = text.get(..2)?;
    let separated = text.as_bytes().get(2) == Some(&b'_');
    (separated && code.bytes().all(|b| b.is_ascii_uppercase())).then_some(code)
}
