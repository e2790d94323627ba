//! Text annotation (sticky note) implementation

use super::annotation::{text_entry, AnnotationBase};
use crate::objects::Object;
use std::ops::Deref;

/// Icon types for text annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Icon {
    Comment,
    Key,
    /// Note icon (default)
    #[default]
    Note,
    Help,
    NewParagraph,
    Paragraph,
    Insert,
}

impl Icon {
    /// Get PDF icon name
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Icon::Comment => "Comment",
            Icon::Key => "Key",
            Icon::Note => "Note",
            Icon::Help => "Help",
            Icon::NewParagraph => "NewParagraph",
            Icon::Paragraph => "Paragraph",
            Icon::Insert => "Insert",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Icon::Comment,
            Icon::Key,
            Icon::Note,
            Icon::Help,
            Icon::NewParagraph,
            Icon::Paragraph,
            Icon::Insert,
        ]
        .into_iter()
        .find(|icon| icon.pdf_name() == name)
    }
}

/// Text annotation (sticky note)
#[derive(Debug, Clone)]
pub struct TextAnnotation {
    base: AnnotationBase,
}

impl TextAnnotation {
    pub fn from_base(base: AnnotationBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &AnnotationBase {
        &self.base
    }

    /// Icon named by `/Name`; unknown names fall back to the default.
    pub fn icon(&self) -> Icon {
        self.base
            .get("Name")
            .and_then(|n| n.as_name().and_then(Icon::from_name))
            .unwrap_or_default()
    }

    pub fn set_icon(&self, icon: Icon) {
        self.base.set("Name", Object::name(icon.pdf_name()));
    }

    /// Whether the note is initially displayed open
    pub fn is_open(&self) -> bool {
        self.base
            .get("Open")
            .and_then(|o| o.as_bool())
            .unwrap_or(false)
    }

    pub fn set_open(&self, open: bool) {
        self.base.set("Open", open);
    }

    /// Review state and its model, e.g. `("Review", "Accepted")`
    pub fn state(&self) -> Option<(String, String)> {
        let state = text_entry(self.base.get("State")?)?;
        let model = self
            .base
            .get("StateModel")
            .and_then(text_entry)
            .unwrap_or_else(|| "Marked".to_string());
        Some((model, state))
    }
}

impl Deref for TextAnnotation {
    type Target = AnnotationBase;

    fn deref(&self) -> &AnnotationBase {
        &self.base
    }
}
