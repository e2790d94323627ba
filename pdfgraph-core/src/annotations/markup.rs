//! Markup annotations (highlight, ink, shapes, stamps, ...) and popups

use super::annotation::{text_entry, AnnotationBase, AnnotationType};
use crate::geometry::Rectangle;
use crate::objects::{Object, ObjectId};
use std::ops::Deref;

/// Quad points defining the region to be marked up
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuadPoints {
    /// Points defining quadrilaterals (8 numbers per quad)
    pub points: Vec<f64>,
}

impl QuadPoints {
    /// Create quad points from rectangles
    pub fn from_rects(rects: &[Rectangle]) -> Self {
        let mut points = Vec::with_capacity(rects.len() * 8);
        for rect in rects {
            // Counterclockwise from lower-left
            points.extend_from_slice(&[
                rect.lower_left.x,
                rect.lower_left.y,
                rect.upper_right.x,
                rect.lower_left.y,
                rect.upper_right.x,
                rect.upper_right.y,
                rect.lower_left.x,
                rect.upper_right.y,
            ]);
        }
        Self { points }
    }

    pub fn quad_count(&self) -> usize {
        self.points.len() / 8
    }

    pub fn to_array(&self) -> Object {
        Object::Array(self.points.iter().map(|&p| Object::Real(p)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct MarkupAnnotation {
    base: AnnotationBase,
    kind: AnnotationType,
}

impl MarkupAnnotation {
    pub fn from_base(base: AnnotationBase, kind: AnnotationType) -> Self {
        Self { base, kind }
    }

    pub fn base(&self) -> &AnnotationBase {
        &self.base
    }

    pub fn markup_type(&self) -> AnnotationType {
        self.kind
    }

    /// Author of the markup, stored as `/T`
    pub fn author(&self) -> Option<String> {
        text_entry(self.base.get("T")?)
    }

    pub fn set_author(&self, author: &str) {
        self.base.set("T", Object::string(author));
    }

    pub fn subject(&self) -> Option<String> {
        text_entry(self.base.get("Subj")?)
    }

    /// `/QuadPoints` of text markup; non-numeric entries are skipped.
    pub fn quad_points(&self) -> QuadPoints {
        let points = self
            .base
            .get("QuadPoints")
            .and_then(|q| q.as_array().map(|a| a.iter().filter_map(Object::as_real).collect()))
            .unwrap_or_default();
        QuadPoints { points }
    }

    pub fn set_quad_points(&self, quads: &QuadPoints) {
        self.base.set("QuadPoints", quads.to_array());
    }

    /// Associated popup annotation (`/Popup`)
    pub fn popup_ref(&self) -> Option<ObjectId> {
        self.base.get("Popup")?.as_reference()
    }

    /// Opacity (`/CA`), 1.0 when absent
    pub fn opacity(&self) -> f64 {
        self.base
            .get("CA")
            .and_then(|ca| ca.as_real())
            .unwrap_or(1.0)
    }
}

impl Deref for MarkupAnnotation {
    type Target = AnnotationBase;

    fn deref(&self) -> &AnnotationBase {
        &self.base
    }
}

/// Pop-up window showing the text of its parent markup annotation
#[derive(Debug, Clone)]
pub struct PopupAnnotation {
    base: AnnotationBase,
}

impl PopupAnnotation {
    pub fn from_base(base: AnnotationBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &AnnotationBase {
        &self.base
    }

    pub fn parent_ref(&self) -> Option<ObjectId> {
        self.base.get("Parent")?.as_reference()
    }

    pub fn is_open(&self) -> bool {
        self.base
            .get("Open")
            .and_then(|o| o.as_bool())
            .unwrap_or(false)
    }
}

impl Deref for PopupAnnotation {
    type Target = AnnotationBase;

    fn deref(&self) -> &AnnotationBase {
        &self.base
    }
}
