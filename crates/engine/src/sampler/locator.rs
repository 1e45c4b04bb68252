//! Where a value lives on the rendered page

use std::fmt;

/// Element lookup strategy understood by every `Surface`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Element id, without the leading `#`
    Id(String),
    Css(String),
    /// First element whose visible text contains the string
    Text(String),
    /// `index`-th (0-based) match of a CSS selector, for dynamic lists
    Nth { css: String, index: usize },
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text(text.into())
    }

    pub fn nth(css: impl Into<String>, index: usize) -> Self {
        Locator::Nth {
            css: css.into(),
            index,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{}", id),
            Locator::Css(css) => f.write_str(css),
            Locator::Text(text) => write!(f, "text={:?}", text),
            Locator::Nth { css, index } => write!(f, "{} >> nth={}", css, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_selector_like() {
        assert_eq!(Locator::id("wallet-balance").to_string(), "#wallet-balance");
        assert_eq!(Locator::nth(".mission-card button", 2).to_string(), ".mission-card button >> nth=2");
        assert_eq!(Locator::text("Claim").to_string(), "text=\"Claim\"");
    }
}
