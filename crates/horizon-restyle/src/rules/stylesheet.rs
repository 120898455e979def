//! Stylesheet handles.

/// Identifies one host rule collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StyleSheetHandle {
    /// Where the stylesheet came from, if it has a URL.
    pub origin: Option<String>,
    /// False when the host denies enumeration (e.g. cross-origin).
    pub accessible: bool,
}

impl StyleSheetHandle {
    /// An accessible stylesheet loaded from `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            accessible: true,
        }
    }

    /// An accessible stylesheet without a URL (inline `<style>` and the like).
    pub fn inline() -> Self {
        Self {
            origin: None,
            accessible: true,
        }
    }

    /// A stylesheet the host refuses to enumerate.
    pub fn inaccessible(origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
            accessible: false,
        }
    }

    /// The origin, or `placeholder` when there is none.
    pub fn origin_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.origin.as_deref().unwrap_or(placeholder)
    }
}
