//! Base annotation types and the subtype dispatch

use super::link::LinkAnnotation;
use super::markup::{MarkupAnnotation, PopupAnnotation};
use super::text::TextAnnotation;
use super::widget::Widget;
use crate::geometry::Rectangle;
use crate::objects::{Dictionary, Object, ObjectHandle, ObjectId, ObjectResolver, PdfString};
use bitflags::bitflags;
use std::ops::Deref;

/// Annotation types according to ISO 32000-1 Table 169
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationType {
    Text,
    Link,
    FreeText,
    Line,
    Square,
    Circle,
    Polygon,
    PolyLine,
    Highlight,
    Underline,
    Squiggly,
    StrikeOut,
    Stamp,
    Caret,
    Ink,
    Popup,
    FileAttachment,
    Sound,
    Movie,
    Widget,
    Screen,
    PrinterMark,
    TrapNet,
    Watermark,
    Redact,
}

impl AnnotationType {
    const ALL: [AnnotationType; 25] = [
        AnnotationType::Text,
        AnnotationType::Link,
        AnnotationType::FreeText,
        AnnotationType::Line,
        AnnotationType::Square,
        AnnotationType::Circle,
        AnnotationType::Polygon,
        AnnotationType::PolyLine,
        AnnotationType::Highlight,
        AnnotationType::Underline,
        AnnotationType::Squiggly,
        AnnotationType::StrikeOut,
        AnnotationType::Stamp,
        AnnotationType::Caret,
        AnnotationType::Ink,
        AnnotationType::Popup,
        AnnotationType::FileAttachment,
        AnnotationType::Sound,
        AnnotationType::Movie,
        AnnotationType::Widget,
        AnnotationType::Screen,
        AnnotationType::PrinterMark,
        AnnotationType::TrapNet,
        AnnotationType::Watermark,
        AnnotationType::Redact,
    ];

    /// Get PDF subtype name
    pub fn pdf_name(&self) -> &'static str {
        match self {
            AnnotationType::Text => "Text",
            AnnotationType::Link => "Link",
            AnnotationType::FreeText => "FreeText",
            AnnotationType::Line => "Line",
            AnnotationType::Square => "Square",
            AnnotationType::Circle => "Circle",
            AnnotationType::Polygon => "Polygon",
            AnnotationType::PolyLine => "PolyLine",
            AnnotationType::Highlight => "Highlight",
            AnnotationType::Underline => "Underline",
            AnnotationType::Squiggly => "Squiggly",
            AnnotationType::StrikeOut => "StrikeOut",
            AnnotationType::Stamp => "Stamp",
            AnnotationType::Caret => "Caret",
            AnnotationType::Ink => "Ink",
            AnnotationType::Popup => "Popup",
            AnnotationType::FileAttachment => "FileAttachment",
            AnnotationType::Sound => "Sound",
            AnnotationType::Movie => "Movie",
            AnnotationType::Widget => "Widget",
            AnnotationType::Screen => "Screen",
            AnnotationType::PrinterMark => "PrinterMark",
            AnnotationType::TrapNet => "TrapNet",
            AnnotationType::Watermark => "Watermark",
            AnnotationType::Redact => "Redact",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.pdf_name() == name)
    }

    /// Markup annotations (ISO 32000-1 Section 12.5.6.2) other than Text,
    /// which has its own variant.
    pub fn is_markup(&self) -> bool {
        matches!(
            self,
            AnnotationType::FreeText
                | AnnotationType::Line
                | AnnotationType::Square
                | AnnotationType::Circle
                | AnnotationType::Polygon
                | AnnotationType::PolyLine
                | AnnotationType::Highlight
                | AnnotationType::Underline
                | AnnotationType::Squiggly
                | AnnotationType::StrikeOut
                | AnnotationType::Stamp
                | AnnotationType::Caret
                | AnnotationType::Ink
                | AnnotationType::FileAttachment
                | AnnotationType::Sound
                | AnnotationType::Redact
        )
    }
}

bitflags! {
    /// Annotation flags according to ISO 32000-1 Section 12.5.3
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnnotationFlags: u32 {
        const INVISIBLE = 1 << 0;
        const HIDDEN = 1 << 1;
        const PRINT = 1 << 2;
        const NO_ZOOM = 1 << 3;
        const NO_ROTATE = 1 << 4;
        const NO_VIEW = 1 << 5;
        const READ_ONLY = 1 << 6;
        const LOCKED = 1 << 7;
        const TOGGLE_NO_VIEW = 1 << 8;
        const LOCKED_CONTENTS = 1 << 9;
    }
}

/// Entries every annotation dictionary shares, read and written through
/// the shared object.
#[derive(Debug, Clone)]
pub struct AnnotationBase {
    handle: ObjectHandle,
}

impl AnnotationBase {
    pub fn new(handle: ObjectHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    pub fn id(&self) -> ObjectId {
        self.handle.id()
    }

    /// A copy of the entry `key`.
    pub fn get(&self, key: &str) -> Option<Object> {
        self.handle.borrow().as_dict()?.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<Object>) {
        if let Some(dict) = self.handle.borrow_mut().as_dict_mut() {
            dict.set(key, value);
        }
    }

    pub fn remove(&self, key: &str) -> Option<Object> {
        self.handle.borrow_mut().as_dict_mut()?.remove(key)
    }

    pub fn subtype(&self) -> Option<String> {
        self.get("Subtype")?.as_name().map(str::to_string)
    }

    pub fn annotation_type(&self) -> Option<AnnotationType> {
        AnnotationType::from_name(&self.subtype()?)
    }

    pub fn rect(&self) -> Option<Rectangle> {
        Rectangle::from_object(&self.get("Rect")?)
    }

    pub fn set_rect(&self, rect: Rectangle) {
        self.set("Rect", rect.to_object());
    }

    pub fn contents(&self) -> Option<String> {
        text_entry(self.get("Contents")?)
    }

    pub fn set_contents(&self, contents: &str) {
        self.set("Contents", Object::String(PdfString::from(contents)));
    }

    /// The annotation name (`/NM`).
    pub fn name(&self) -> Option<String> {
        text_entry(self.get("NM")?)
    }

    pub fn flags(&self) -> AnnotationFlags {
        self.get("F")
            .and_then(|f| f.as_integer())
            .map(|f| AnnotationFlags::from_bits_truncate(f as u32))
            .unwrap_or_default()
    }

    pub fn set_flags(&self, flags: AnnotationFlags) {
        self.set("F", i64::from(flags.bits()));
    }

    /// The page this annotation claims to be on (`/P`).
    pub fn page_ref(&self) -> Option<ObjectId> {
        self.get("P")?.as_reference()
    }
}

pub(crate) fn text_entry(value: Object) -> Option<String> {
    match value {
        Object::String(s) => Some(s.to_text()),
        Object::Name(n) => Some(n),
        _ => None,
    }
}

/// An annotation, dispatched on `/Subtype`.
#[derive(Debug, Clone)]
pub enum Annotation {
    Widget(Widget),
    Text(TextAnnotation),
    Link(LinkAnnotation),
    /// Highlight, ink, shapes, stamps and the other markup kinds
    Markup(MarkupAnnotation),
    Popup(PopupAnnotation),
    /// Any other or missing subtype
    Other(AnnotationBase),
}

impl Annotation {
    /// Typed view of `handle`. Widgets resolve their parent field here.
    pub fn from_handle(resolver: &dyn ObjectResolver, handle: ObjectHandle) -> Self {
        let base = AnnotationBase::new(handle);
        match base.annotation_type() {
            Some(AnnotationType::Widget) => Annotation::Widget(Widget::from_base(resolver, base)),
            Some(AnnotationType::Text) => Annotation::Text(TextAnnotation::from_base(base)),
            Some(AnnotationType::Link) => Annotation::Link(LinkAnnotation::from_base(base)),
            Some(AnnotationType::Popup) => Annotation::Popup(PopupAnnotation::from_base(base)),
            Some(kind) if kind.is_markup() => {
                Annotation::Markup(MarkupAnnotation::from_base(base, kind))
            }
            _ => Annotation::Other(base),
        }
    }

    /// Create a new annotation object of `annotation_type` in `resolver`.
    /// It is flagged for printing and not yet placed on any page.
    pub fn create(
        resolver: &dyn ObjectResolver,
        annotation_type: AnnotationType,
        rect: Rectangle,
    ) -> Self {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Annot"));
        dict.set("Subtype", Object::name(annotation_type.pdf_name()));
        dict.set("Rect", rect.to_object());
        dict.set("F", i64::from(AnnotationFlags::PRINT.bits()));
        let handle = resolver.add_object(Object::Dictionary(dict));
        Self::from_handle(resolver, handle)
    }

    pub fn base(&self) -> &AnnotationBase {
        match self {
            Annotation::Widget(a) => a.base(),
            Annotation::Text(a) => a.base(),
            Annotation::Link(a) => a.base(),
            Annotation::Markup(a) => a.base(),
            Annotation::Popup(a) => a.base(),
            Annotation::Other(a) => a,
        }
    }

    pub fn as_widget(&self) -> Option<&Widget> {
        match self {
            Annotation::Widget(widget) => Some(widget),
            _ => None,
        }
    }

    pub fn as_widget_mut(&mut self) -> Option<&mut Widget> {
        match self {
            Annotation::Widget(widget) => Some(widget),
            _ => None,
        }
    }

    pub fn is_widget(&self) -> bool {
        matches!(self, Annotation::Widget(_))
    }
}

impl Deref for Annotation {
    type Target = AnnotationBase;

    fn deref(&self) -> &AnnotationBase {
        self.base()
    }
}
