//! Link annotation implementation

use super::annotation::{text_entry, AnnotationBase};
use crate::objects::{Dictionary, Object, ObjectResolver};
use std::ops::Deref;

/// Where activating a link leads
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// A URI action
    Uri(String),
    /// An explicit destination array or a named destination
    Destination(Object),
    /// Any other action dictionary
    Action(Dictionary),
}

/// Highlighting mode when the link is activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightMode {
    None,
    #[default]
    Invert,
    Outline,
    Push,
}

impl HighlightMode {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            HighlightMode::None => "N",
            HighlightMode::Invert => "I",
            HighlightMode::Outline => "O",
            HighlightMode::Push => "P",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkAnnotation {
    base: AnnotationBase,
}

impl LinkAnnotation {
    pub fn from_base(base: AnnotationBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &AnnotationBase {
        &self.base
    }

    /// The action (`/A`) if present, else the destination (`/Dest`).
    pub fn target(&self, resolver: &dyn ObjectResolver) -> Option<LinkTarget> {
        if let Some(action) = self.base.get("A") {
            let action = resolver.deref(&action).as_dict()?.clone();
            if action.get_name("S") == Some("URI") {
                if let Some(uri) = action.get("URI").cloned().and_then(text_entry) {
                    return Some(LinkTarget::Uri(uri));
                }
            }
            if action.get_name("S") == Some("GoTo") {
                if let Some(dest) = action.get("D") {
                    return Some(LinkTarget::Destination(dest.clone()));
                }
            }
            return Some(LinkTarget::Action(action));
        }
        self.base.get("Dest").map(LinkTarget::Destination)
    }

    /// Replace the target with a URI action.
    pub fn set_uri(&self, uri: &str) {
        let mut action = Dictionary::new();
        action.set("Type", Object::name("Action"));
        action.set("S", Object::name("URI"));
        action.set("URI", Object::string(uri));
        self.base.remove("Dest");
        self.base.set("A", action);
    }

    pub fn highlight_mode(&self) -> HighlightMode {
        match self.base.get("H").as_ref().and_then(Object::as_name) {
            Some("N") => HighlightMode::None,
            Some("O") => HighlightMode::Outline,
            Some("P") => HighlightMode::Push,
            _ => HighlightMode::Invert,
        }
    }

    pub fn set_highlight_mode(&self, mode: HighlightMode) {
        self.base.set("H", Object::name(mode.pdf_name()));
    }
}

impl Deref for LinkAnnotation {
    type Target = AnnotationBase;

    fn deref(&self) -> &AnnotationBase {
        &self.base
    }
}
