//! Widget annotations: the on-page part of a form field
//!
//! A widget either stands alone under a field's `/Kids` and names that
//! field as its `/Parent`, or is merged with a terminal field into one
//! dictionary that carries both annotation and field entries.

use super::annotation::AnnotationBase;
use crate::forms::Field;
use crate::objects::{Object, ObjectId, ObjectResolver};
use std::ops::Deref;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Widget {
    base: AnnotationBase,
    parent_ref: Option<ObjectId>,
    field: Option<Field>,
}

impl Widget {
    /// Build the view and resolve `/Parent` to its field. A parent that
    /// does not resolve leaves the raw reference without a field.
    pub fn from_base(resolver: &dyn ObjectResolver, base: AnnotationBase) -> Self {
        let parent_ref = base.get("Parent").and_then(|p| p.as_reference());
        let field = parent_ref
            .and_then(|id| resolver.resolve_handle(id))
            .filter(|handle| handle.borrow().as_dict().is_some())
            .map(Field::from_handle);
        if parent_ref.is_some() && field.is_none() {
            debug!("Widget {} has a dangling /Parent", base.id());
        }
        Self {
            base,
            parent_ref,
            field,
        }
    }

    pub fn base(&self) -> &AnnotationBase {
        &self.base
    }

    /// The `/Parent` reference as stored.
    pub fn parent_ref(&self) -> Option<ObjectId> {
        self.parent_ref
    }

    /// The field `/Parent` resolved to.
    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    /// Attach to `field`: sets `/Parent` and appends this widget to the
    /// field's `/Kids`.
    pub fn set_parent(&mut self, field: &Field) {
        self.base.set("Parent", Object::Reference(field.id()));
        field.push_kid(self.base.id());
        self.parent_ref = Some(field.id());
        self.field = Some(field.clone());
    }

    /// Detach from the parent field. The field's `/Kids` is left alone.
    pub fn clear_parent(&mut self) {
        self.base.remove("Parent");
        self.parent_ref = None;
        self.field = None;
    }

    /// Whether this dictionary is also a field (carries `/T` or `/FT`).
    pub fn is_merged_with_field(&self) -> bool {
        self.base.get("T").is_some() || self.base.get("FT").is_some()
    }

    /// Current appearance state (`/AS`), e.g. the on-state of a checkbox.
    pub fn appearance_state(&self) -> Option<String> {
        self.base.get("AS")?.as_name().map(str::to_string)
    }

    pub fn set_appearance_state(&self, state: &str) {
        self.base.set("AS", Object::name(state));
    }

    /// Names of the normal appearances (`/AP /N`), for checkboxes and
    /// radio buttons the possible on and off states.
    pub fn appearance_states(&self, resolver: &dyn ObjectResolver) -> Vec<String> {
        let Some(ap) = self.base.get("AP").map(|ap| resolver.deref(&ap)) else {
            return Vec::new();
        };
        let normal = ap
            .as_dict()
            .and_then(|d| d.get("N"))
            .map(|n| resolver.deref(n));
        match normal.as_ref().and_then(Object::as_dict) {
            Some(states) if normal.as_ref().and_then(Object::as_stream).is_none() => {
                states.keys().cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    /// Highlighting mode (`/H`), `I` when absent.
    pub fn highlight_mode(&self) -> String {
        self.base
            .get("H")
            .and_then(|h| h.as_name().map(str::to_string))
            .unwrap_or_else(|| "I".to_string())
    }
}

impl Deref for Widget {
    type Target = AnnotationBase;

    fn deref(&self) -> &AnnotationBase {
        &self.base
    }
}
