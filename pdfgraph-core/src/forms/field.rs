//! Form fields: nodes of the AcroForm field tree
//!
//! A field dictionary may have a `/Parent` field and `/Kids` that are
//! either fields or widget annotations. A terminal field with a single
//! widget is often merged with it into one dictionary. Inheritable entries
//! (`/FT`, `/Ff`, `/V`, `/DA`) are looked up along the `/Parent` chain.

use super::field_type::{FieldFlags, FieldType};
use crate::annotations::{AnnotationBase, Widget};
use crate::objects::{array_handles, Dictionary, Object, ObjectHandle, ObjectId, ObjectResolver};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Field {
    handle: ObjectHandle,
}

impl Field {
    pub fn from_handle(handle: ObjectHandle) -> Self {
        Self { handle }
    }

    /// Create a root-level field with partial name `name`.
    pub fn create(resolver: &dyn ObjectResolver, name: &str, field_type: FieldType) -> Self {
        let mut dict = Dictionary::new();
        dict.set("FT", Object::name(field_type.pdf_name()));
        dict.set("T", Object::string(name));
        Self::from_handle(resolver.add_object(Object::Dictionary(dict)))
    }

    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    pub fn id(&self) -> ObjectId {
        self.handle.id()
    }

    pub fn get(&self, key: &str) -> Option<Object> {
        self.handle.borrow().as_dict()?.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<Object>) {
        if let Some(dict) = self.handle.borrow_mut().as_dict_mut() {
            dict.set(key, value);
        }
    }

    /// `/T`, the name of this node alone.
    pub fn partial_name(&self) -> Option<String> {
        match self.get("T")? {
            Object::String(s) => Some(s.to_text()),
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Partial names from the root of the field tree down to this field,
    /// joined by periods. Nodes without `/T` contribute nothing.
    pub fn fully_qualified_name(&self, resolver: &dyn ObjectResolver) -> String {
        let mut names: Vec<String> = self
            .ancestry(resolver)
            .iter()
            .filter_map(Field::partial_name)
            .collect();
        names.reverse();
        names.join(".")
    }

    /// `/FT`, inherited from the nearest ancestor that has one.
    pub fn field_type(&self, resolver: &dyn ObjectResolver) -> Option<FieldType> {
        self.inherited(resolver, "FT")
            .and_then(|ft| ft.as_name().and_then(FieldType::from_name))
    }

    /// `/Ff`, inherited.
    pub fn flags(&self, resolver: &dyn ObjectResolver) -> FieldFlags {
        self.inherited(resolver, "Ff")
            .and_then(|ff| ff.as_integer())
            .map(|ff| FieldFlags::from_bits_truncate(ff as u32))
            .unwrap_or_default()
    }

    pub fn set_flags(&self, flags: FieldFlags) {
        self.set("Ff", i64::from(flags.bits()));
    }

    /// `/V`, inherited, with references followed.
    pub fn value(&self, resolver: &dyn ObjectResolver) -> Option<Object> {
        self.inherited(resolver, "V").map(|v| resolver.deref(&v))
    }

    pub fn set_value(&self, value: impl Into<Object>) {
        self.set("V", value);
    }

    pub fn parent_ref(&self) -> Option<ObjectId> {
        self.get("Parent")?.as_reference()
    }

    pub fn parent(&self, resolver: &dyn ObjectResolver) -> Option<Field> {
        resolver
            .resolve_handle(self.parent_ref()?)
            .filter(|h| h.borrow().as_dict().is_some())
            .map(Field::from_handle)
    }

    /// References in `/Kids` as stored.
    pub fn kid_refs(&self) -> Vec<ObjectId> {
        self.get("Kids")
            .and_then(|kids| {
                kids.as_array()
                    .map(|a| a.iter().filter_map(Object::as_reference).collect())
            })
            .unwrap_or_default()
    }

    /// Kids that are fields themselves.
    pub fn kids(&self, resolver: &dyn ObjectResolver) -> Vec<Field> {
        array_handles(resolver, &self.handle, "Kids")
            .into_iter()
            .filter(is_field_node)
            .map(Field::from_handle)
            .collect()
    }

    /// Widget annotations of this field: kids that are pure widgets, or
    /// the field itself when it is merged with its widget.
    pub fn widgets(&self, resolver: &dyn ObjectResolver) -> Vec<Widget> {
        let mut handles: Vec<ObjectHandle> = array_handles(resolver, &self.handle, "Kids")
            .into_iter()
            .filter(|h| !is_field_node(h))
            .collect();
        if self.is_widget() {
            handles.insert(0, self.handle.clone());
        }
        handles
            .into_iter()
            .map(|h| Widget::from_base(resolver, AnnotationBase::new(h)))
            .collect()
    }

    /// Whether this dictionary is also a widget annotation.
    pub fn is_widget(&self) -> bool {
        self.handle
            .borrow()
            .as_dict()
            .and_then(|d| d.get_subtype())
            == Some("Widget")
    }

    /// Make `kid` a child field of this one.
    pub fn add_kid(&self, kid: &Field) {
        kid.set("Parent", Object::Reference(self.id()));
        self.push_kid(kid.id());
    }

    /// Append `id` to a direct `/Kids` array, creating it when absent.
    pub(crate) fn push_kid(&self, id: ObjectId) {
        let mut value = self.handle.borrow_mut();
        let Some(dict) = value.as_dict_mut() else {
            return;
        };
        match dict.get_mut("Kids") {
            Some(Object::Array(kids)) => kids.push(Object::Reference(id)),
            Some(_) => warn!(
                "Field {} has an indirect or malformed /Kids; {} not added",
                self.handle.id(),
                id
            ),
            None => dict.set("Kids", vec![Object::Reference(id)]),
        }
    }

    fn inherited(&self, resolver: &dyn ObjectResolver, key: &str) -> Option<Object> {
        self.ancestry(resolver).iter().find_map(|f| f.get(key))
    }

    /// This field followed by its ancestors, nearest first, stopping at a
    /// cycle or at a `/Parent` that does not resolve to a dictionary.
    fn ancestry(&self, resolver: &dyn ObjectResolver) -> Vec<Field> {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(field) = current {
            if !seen.insert(field.handle.identity()) {
                warn!("Cycle in /Parent chain at field {}", field.id());
                break;
            }
            current = field.parent(resolver);
            chain.push(field);
        }
        chain
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.handle.ptr_eq(&other.handle)
    }
}

/// A kid is a field when it has field entries or is not a widget at all.
pub(crate) fn is_field_node(handle: &ObjectHandle) -> bool {
    let value = handle.borrow();
    let Some(dict) = value.as_dict() else {
        return false;
    };
    dict.contains_key("T")
        || dict.contains_key("FT")
        || dict.contains_key("Kids")
        || dict.get_subtype() != Some("Widget")
}
