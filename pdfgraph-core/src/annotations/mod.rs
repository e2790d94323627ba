//! Annotations according to ISO 32000-1 Chapter 12.5
//!
//! Every annotation is a view over a shared indirect dictionary: reading
//! and writing go through the object itself, so all views of the same
//! annotation observe the same state. [`Annotation`] dispatches on
//! `/Subtype`; widgets additionally resolve the form field they belong to.

mod annotation;
mod link;
mod markup;
mod text;
mod widget;

pub use annotation::{Annotation, AnnotationBase, AnnotationFlags, AnnotationType};
pub use link::{HighlightMode, LinkAnnotation, LinkTarget};
pub use markup::{MarkupAnnotation, PopupAnnotation, QuadPoints};
pub use text::{Icon, TextAnnotation};
pub use widget::Widget;
