//! Identity-carrying handles to indirect objects and the resolver seam the
//! entity layer and the writer are built on.

use crate::objects::{Object, ObjectId};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Non-owning view of one indirect object. Clones share the same cell, so
/// two handles for the same object compare equal by identity and a
/// mutation through one is visible through the other.
#[derive(Clone)]
pub struct ObjectHandle {
    id: ObjectId,
    cell: Rc<RefCell<Object>>,
}

impl ObjectHandle {
    pub(crate) fn new(id: ObjectId, value: Object) -> Self {
        Self {
            id,
            cell: Rc::new(RefCell::new(value)),
        }
    }

    /// Number and generation this object had in its source document.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.cell.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.cell.borrow_mut()
    }

    /// Replace the stored value; used to fill in a placeholder.
    pub fn replace(&self, value: Object) -> Object {
        self.cell.replace(value)
    }

    pub fn ptr_eq(&self, other: &ObjectHandle) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// Stable address of the shared cell. Unique for as long as any handle
    /// to the object is alive, which makes it usable as a visited-set key.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.cell) as *const () as usize
    }

    pub fn get_type(&self) -> Option<String> {
        self.borrow()
            .as_dict()
            .and_then(|d| d.get_type())
            .map(str::to_string)
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectHandle {}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.try_borrow() {
            Ok(value) => f
                .debug_struct("ObjectHandle")
                .field("id", &self.id)
                .field("type", &value.type_name())
                .finish(),
            Err(_) => f
                .debug_struct("ObjectHandle")
                .field("id", &self.id)
                .finish_non_exhaustive(),
        }
    }
}

/// Lookup-or-load access to the indirect objects of one document.
///
/// Implementations keep one handle per [`ObjectId`] for the lifetime of the
/// document, so repeated resolution of the same reference yields the same
/// in-memory object. A reference that names no object resolves to `None`
/// (and to [`Object::Null`] through [`ObjectResolver::resolve`]); this is
/// never an error.
pub trait ObjectResolver {
    fn resolve_handle(&self, id: ObjectId) -> Option<ObjectHandle>;

    /// Store a new indirect object under a fresh number.
    fn add_object(&self, value: Object) -> ObjectHandle;

    fn resolve(&self, id: ObjectId) -> Object {
        self.resolve_handle(id)
            .map(|handle| handle.borrow().clone())
            .unwrap_or(Object::Null)
    }

    /// Follow one level of indirection; direct values are cloned as is.
    fn deref(&self, value: &Object) -> Object {
        match value {
            Object::Reference(id) => self.resolve(*id),
            other => other.clone(),
        }
    }

    /// Handle for a value that is expected to be indirect.
    fn handle_of(&self, value: &Object) -> Option<ObjectHandle> {
        value.as_reference().and_then(|id| self.resolve_handle(id))
    }

    /// Handle for `slot`, turning a direct dictionary or stream into a new
    /// indirect object first. `slot` is left holding a reference to it.
    fn promote(&self, slot: &mut Object) -> Option<ObjectHandle> {
        match slot {
            Object::Reference(id) => self.resolve_handle(*id),
            Object::Dictionary(_) | Object::Stream(_) => {
                let value = std::mem::replace(slot, Object::Null);
                let handle = self.add_object(value);
                *slot = Object::Reference(handle.id());
                Some(handle)
            }
            _ => None,
        }
    }
}

/// Handles for the entries of the array under `key` in `owner`, which may
/// be stored directly or behind a reference. Direct dictionaries in the
/// array are promoted to indirect objects and the array is updated to
/// point at them; entries that are neither are skipped.
pub(crate) fn array_handles(
    resolver: &dyn ObjectResolver,
    owner: &ObjectHandle,
    key: &str,
) -> Vec<ObjectHandle> {
    let entry = owner.borrow().as_dict().and_then(|d| d.get(key)).cloned();
    let (array_owner, mut items) = match entry {
        Some(Object::Array(items)) => (None, items),
        Some(Object::Reference(id)) => {
            let Some(handle) = resolver.resolve_handle(id) else {
                return Vec::new();
            };
            let items = handle.borrow().as_array().cloned();
            match items {
                Some(items) => (Some(handle), items),
                None => return Vec::new(),
            }
        }
        _ => return Vec::new(),
    };

    let mut promoted = false;
    let mut handles = Vec::with_capacity(items.len());
    for slot in items.iter_mut() {
        promoted |= matches!(slot, Object::Dictionary(_) | Object::Stream(_));
        if let Some(handle) = resolver.promote(slot) {
            handles.push(handle);
        }
    }

    if promoted {
        match array_owner {
            Some(array) => {
                array.replace(Object::Array(items));
            }
            None => {
                if let Some(dict) = owner.borrow_mut().as_dict_mut() {
                    dict.set(key, items);
                }
            }
        }
    }
    handles
}

/// Append a reference to `id` to the array under `key` in `owner`,
/// following the entry if it is itself a reference. A missing or
/// non-array entry is replaced by a new one-element array.
pub(crate) fn push_reference(
    resolver: &dyn ObjectResolver,
    owner: &ObjectHandle,
    key: &str,
    id: ObjectId,
) {
    let entry = owner.borrow().as_dict().and_then(|d| d.get(key)).cloned();
    if let Some(Object::Reference(array_id)) = entry {
        if let Some(array) = resolver.resolve_handle(array_id) {
            if let Some(items) = array.borrow_mut().as_array_mut() {
                items.push(Object::Reference(id));
                return;
            }
        }
    }
    if let Some(dict) = owner.borrow_mut().as_dict_mut() {
        match dict.get_mut(key) {
            Some(Object::Array(items)) => items.push(Object::Reference(id)),
            _ => dict.set(key, vec![Object::Reference(id)]),
        }
    }
}

/// In-memory object store for documents built from scratch.
#[derive(Debug, Default)]
pub struct ObjectArena {
    objects: RefCell<HashMap<ObjectId, ObjectHandle>>,
    next_number: Cell<u32>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self {
            objects: RefCell::new(HashMap::new()),
            next_number: Cell::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }

    /// Every stored object, ordered by number.
    pub fn handles(&self) -> Vec<ObjectHandle> {
        let mut all: Vec<_> = self.objects.borrow().values().cloned().collect();
        all.sort_by_key(|h| h.id());
        all
    }
}

impl ObjectResolver for ObjectArena {
    fn resolve_handle(&self, id: ObjectId) -> Option<ObjectHandle> {
        self.objects.borrow().get(&id).cloned()
    }

    fn add_object(&self, value: Object) -> ObjectHandle {
        let number = self.next_number.get().max(1);
        self.next_number.set(number + 1);
        let handle = ObjectHandle::new(ObjectId::new(number, 0), value);
        self.objects.borrow_mut().insert(handle.id(), handle.clone());
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Dictionary;

    #[test]
    fn test_arena_assigns_sequential_numbers() {
        let arena = ObjectArena::new();
        let a = arena.add_object(Object::Integer(1));
        let b = arena.add_object(Object::Integer(2));

        assert_eq!(a.id(), ObjectId::new(1, 0));
        assert_eq!(b.id(), ObjectId::new(2, 0));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_resolution_preserves_identity() {
        let arena = ObjectArena::new();
        let created = arena.add_object(Object::Dictionary(Dictionary::new()));

        let first = arena.resolve_handle(created.id()).unwrap();
        let second = arena.resolve_handle(created.id()).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(first.identity(), created.identity());

        if let Some(dict) = first.borrow_mut().as_dict_mut() {
            dict.set("Marker", true);
        }
        assert_eq!(
            second.borrow().as_dict().and_then(|d| d.get("Marker")),
            Some(&Object::Boolean(true))
        );
    }

    #[test]
    fn test_dangling_resolves_to_null() {
        let arena = ObjectArena::new();
        assert!(arena.resolve_handle(ObjectId::new(42, 0)).is_none());
        assert_eq!(arena.resolve(ObjectId::new(42, 0)), Object::Null);
        assert_eq!(
            arena.deref(&Object::Reference(ObjectId::new(42, 0))),
            Object::Null
        );
    }

    #[test]
    fn test_self_reference_is_just_a_value() {
        let arena = ObjectArena::new();
        let handle = arena.add_object(Object::Null);
        let mut dict = Dictionary::new();
        dict.set("Self", handle.id());
        handle.replace(Object::Dictionary(dict));

        let again = arena
            .handle_of(handle.borrow().as_dict().unwrap().get("Self").unwrap())
            .unwrap();
        assert!(again.ptr_eq(&handle));
    }

    #[test]
    fn test_promote_direct_dictionary() {
        let arena = ObjectArena::new();
        let mut slot = Object::Dictionary(Dictionary::new());
        let handle = arena.promote(&mut slot).unwrap();
        assert_eq!(slot, Object::Reference(handle.id()));
        assert!(arena.promote(&mut slot).unwrap().ptr_eq(&handle));
        assert!(arena.promote(&mut Object::Integer(3)).is_none());
    }

    #[test]
    fn test_array_handles_promotes_direct_entries() {
        let arena = ObjectArena::new();
        let shared = arena.add_object(Object::Dictionary(Dictionary::new()));
        let mut owner_dict = Dictionary::new();
        owner_dict.set(
            "Kids",
            vec![
                Object::Reference(shared.id()),
                Object::Dictionary(Dictionary::new()),
                Object::Integer(7),
                Object::Reference(ObjectId::new(99, 0)),
            ],
        );
        let owner = arena.add_object(Object::Dictionary(owner_dict));

        let handles = array_handles(&arena, &owner, "Kids");
        assert_eq!(handles.len(), 2);
        assert!(handles[0].ptr_eq(&shared));

        let kids = owner.borrow().as_dict().unwrap().get("Kids").cloned().unwrap();
        assert_eq!(kids.as_array().unwrap()[1], Object::Reference(handles[1].id()));
        assert!(array_handles(&arena, &owner, "Kids")[1].ptr_eq(&handles[1]));
    }

    #[test]
    fn test_array_handles_through_reference() {
        let arena = ObjectArena::new();
        let array = arena.add_object(Object::Array(vec![Object::Dictionary(Dictionary::new())]));
        let mut owner_dict = Dictionary::new();
        owner_dict.set("Annots", array.id());
        let owner = arena.add_object(Object::Dictionary(owner_dict));

        let handles = array_handles(&arena, &owner, "Annots");
        assert_eq!(handles.len(), 1);
        assert_eq!(
            array.borrow().as_array().unwrap()[0],
            Object::Reference(handles[0].id())
        );
        assert!(array_handles(&arena, &owner, "Missing").is_empty());
    }

    #[test]
    fn test_debug_while_mutably_borrowed() {
        let handle = ObjectHandle::new(ObjectId::new(3, 0), Object::Null);
        let _guard = handle.borrow_mut();
        let rendered = format!("{handle:?}");
        assert!(rendered.contains("ObjectHandle"));
    }
}
