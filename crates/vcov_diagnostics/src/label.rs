//! Labels that annotate source spans within a diagnostic.

use serde::{Deserialize, Serialize};
use vcov_source::Span;

/// The visual style of a diagnostic label.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The main location (`^^^^`).
    Primary,
    /// Additional context (`----`).
    Secondary,
}

/// An annotated source span within a diagnostic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Label {
    /// The source span this label annotates.
    pub span: Span,
    /// The message displayed next to the underline.
    pub message: String,
    /// Whether this is a primary or secondary label.
    pub style: LabelStyle,
}

impl Label {
    /// Creates a primary label.
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    /// Creates a secondary label.
    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_style() {
        assert_eq!(Label::primary(Span::DUMMY, "here").style, LabelStyle::Primary);
        let l = Label::secondary(Span::DUMMY, "declared here");
        assert_eq!(l.style, LabelStyle::Secondary);
        assert_eq!(l.message, "declared here");
    }
}
