//! The interactive form dictionary (`/AcroForm` in the catalog)

use super::field::{is_field_node, Field};
use crate::objects::{
    array_handles, push_reference, Dictionary, Object, ObjectHandle, ObjectId, ObjectResolver,
};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct AcroForm {
    handle: ObjectHandle,
}

impl AcroForm {
    /// Create an empty form object in `resolver`.
    pub fn new(resolver: &dyn ObjectResolver) -> Self {
        let mut dict = Dictionary::new();
        dict.set("Fields", Object::Array(Vec::new()));
        Self::from_handle(resolver.add_object(Object::Dictionary(dict)))
    }

    pub fn from_handle(handle: ObjectHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ObjectHandle {
        &self.handle
    }

    pub fn id(&self) -> ObjectId {
        self.handle.id()
    }

    fn get(&self, key: &str) -> Option<Object> {
        self.handle.borrow().as_dict()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: impl Into<Object>) {
        if let Some(dict) = self.handle.borrow_mut().as_dict_mut() {
            dict.set(key, value);
        }
    }

    /// Root fields, in `/Fields` order. Roots have no parent: a stray
    /// `/Parent` on a `/Fields` entry is removed.
    pub fn fields(&self, resolver: &dyn ObjectResolver) -> Vec<Field> {
        array_handles(resolver, &self.handle, "Fields")
            .into_iter()
            .map(|handle| {
                let stray = handle
                    .borrow_mut()
                    .as_dict_mut()
                    .and_then(|dict| dict.remove("Parent"));
                if let Some(parent) = stray {
                    warn!(
                        "Root field {} has /Parent {:?}, dropping it",
                        handle.id(),
                        parent
                    );
                }
                Field::from_handle(handle)
            })
            .collect()
    }

    /// Every field reachable from `/Fields` through `/Kids`, in preorder.
    /// Each field appears once no matter how often it is referenced, and
    /// cycles in the field tree terminate.
    pub fn all_fields(&self, resolver: &dyn ObjectResolver) -> Vec<Field> {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut stack: Vec<Field> = self.fields(resolver).into_iter().rev().collect();

        while let Some(field) = stack.pop() {
            if !visited.insert(field.handle().identity()) {
                continue;
            }
            stack.extend(field.kids(resolver).into_iter().rev());
            result.push(field);
        }

        debug!("AcroForm {} has {} fields", self.id(), result.len());
        result
    }

    /// Append `field` to `/Fields` as a root field.
    pub fn add_field(&self, resolver: &dyn ObjectResolver, field: &Field) {
        push_reference(resolver, &self.handle, "Fields", field.id());
    }

    pub fn need_appearances(&self) -> bool {
        self.get("NeedAppearances")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn set_need_appearances(&self, value: bool) {
        self.set("NeedAppearances", value);
    }

    /// Default appearance string (`/DA`) for variable-text fields
    pub fn default_appearance(&self) -> Option<String> {
        match self.get("DA")? {
            Object::String(s) => Some(s.to_text()),
            _ => None,
        }
    }

    pub fn set_default_appearance(&self, da: &str) {
        self.set("DA", Object::string(da));
    }

    /// Default resources (`/DR`)
    pub fn default_resources(&self, resolver: &dyn ObjectResolver) -> Option<Dictionary> {
        let dr = self.get("DR")?;
        resolver.deref(&dr).as_dict().cloned()
    }

    /// Number of root fields that are widgets rather than fields, which
    /// some producers emit by mistake.
    pub fn stray_widgets(&self, resolver: &dyn ObjectResolver) -> usize {
        array_handles(resolver, &self.handle, "Fields")
            .iter()
            .filter(|h| !is_field_node(h))
            .count()
    }
}
