use std::fmt;
use std::sync::Arc;

/// Generated stylesheet text. Clones share one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssDocument(Arc<str>);

impl CssDocument {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    /// The stylesheet served when nothing better is available.
    pub fn empty() -> Self {
        Self(Arc::from(""))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when both documents share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for CssDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CssDocument {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_allocation() {
        let css = CssDocument::from("a { color: red; }".to_string());
        let copy = css.clone();
        assert!(css.ptr_eq(&copy));

        let equal = CssDocument::from("a { color: red; }".to_string());
        assert_eq!(css, equal);
        assert!(!css.ptr_eq(&equal));
    }
}
