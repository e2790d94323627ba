//! Renumbering of the object graph reachable from the pages being written
//!
//! Objects are numbered in discovery order: the catalog is 1, the new page
//! tree root 2, then each page followed by everything reachable from it
//! (breadth first), then the form. The number map doubles as the visited
//! set, so shared objects are emitted once and cycles terminate.

use crate::forms::AcroForm;
use crate::objects::{Dictionary, Object, ObjectHandle, ObjectId, ObjectResolver};
use crate::page::Page;
use std::collections::{HashMap, VecDeque};
use tracing::{trace, warn};

pub(crate) const CATALOG_NUMBER: u32 = 1;
pub(crate) const PAGES_NUMBER: u32 = 2;

/// Rewritten objects ready for serialization.
#[derive(Debug)]
pub(crate) struct GraphPlan {
    /// `(number, value)` in ascending number order, starting at 3
    pub objects: Vec<(u32, Object)>,
    /// New numbers of the written pages, in page order
    pub page_numbers: Vec<u32>,
    pub form_number: Option<u32>,
    /// First number not yet used
    pub next_number: u32,
}

struct Renumbering<'a> {
    resolver: &'a dyn ObjectResolver,
    numbers: HashMap<usize, (u32, ObjectHandle)>,
    pending: VecDeque<(u32, ObjectHandle)>,
    objects: Vec<(u32, Object)>,
    /// Pages being written, as the dictionaries that will replace them
    page_overrides: HashMap<usize, Dictionary>,
    strip_widget_parent: bool,
    next_number: u32,
}

/// Number and rewrite everything reachable from `pages` and `form`.
///
/// Without a form, `/Parent` is dropped from widget annotations so the
/// field tree is not dragged in through them.
pub(crate) fn collect(
    resolver: &dyn ObjectResolver,
    pages: &[Page],
    form: Option<&AcroForm>,
) -> GraphPlan {
    let mut graph = Renumbering {
        resolver,
        numbers: HashMap::new(),
        pending: VecDeque::new(),
        objects: Vec::new(),
        page_overrides: HashMap::new(),
        strip_widget_parent: form.is_none(),
        next_number: PAGES_NUMBER + 1,
    };

    let mut unique_pages = Vec::with_capacity(pages.len());
    for page in pages {
        let identity = page.handle().identity();
        if graph.page_overrides.contains_key(&identity) {
            warn!("Page {} listed twice, writing it once", page.id());
            continue;
        }
        graph.page_overrides.insert(identity, page_override(page));
        unique_pages.push(page);
    }

    let mut page_numbers = Vec::with_capacity(unique_pages.len());
    for page in unique_pages {
        page_numbers.push(graph.number_for(page.handle()));
        graph.drain();
    }

    let form_number = form.map(|form| {
        let number = graph.number_for(form.handle());
        graph.drain();
        number
    });

    graph.objects.sort_by_key(|(number, _)| *number);
    GraphPlan {
        objects: graph.objects,
        page_numbers,
        form_number,
        next_number: graph.next_number,
    }
}

/// The page's own entries plus what it inherited, with `/Parent` left as
/// a placeholder to be pointed at the new tree root.
fn page_override(page: &Page) -> Dictionary {
    let mut dict = page
        .handle()
        .borrow()
        .as_dict()
        .cloned()
        .unwrap_or_default();
    if dict.get_type().is_none() {
        dict.set("Type", Object::name("Page"));
    }
    dict.set("Parent", Object::Null);
    for (key, value) in page.inherited_attributes() {
        dict.set(key, value);
    }
    dict
}

impl Renumbering<'_> {
    fn number_for(&mut self, handle: &ObjectHandle) -> u32 {
        if let Some((number, _)) = self.numbers.get(&handle.identity()) {
            return *number;
        }
        let number = self.next_number;
        self.next_number += 1;
        self.numbers
            .insert(handle.identity(), (number, handle.clone()));
        self.pending.push_back((number, handle.clone()));
        number
    }

    fn drain(&mut self) {
        while let Some((number, handle)) = self.pending.pop_front() {
            let identity = handle.identity();
            let is_page = self.page_overrides.contains_key(&identity);
            let mut value = match self.page_overrides.get(&identity) {
                Some(dict) => Object::Dictionary(dict.clone()),
                None => handle.borrow().clone(),
            };
            if self.strip_widget_parent && !is_page {
                if let Some(dict) = value.as_dict_mut() {
                    if dict.get_subtype() == Some("Widget") {
                        dict.remove("Parent");
                    }
                }
            }

            let mut value = self.rewrite(&value);
            if is_page {
                if let Some(dict) = value.as_dict_mut() {
                    dict.set("Parent", Object::Reference(ObjectId::new(PAGES_NUMBER, 0)));
                }
            }

            trace!("Object {} renumbered to {}", handle.id(), number);
            self.objects.push((number, value));
        }
    }

    /// Copy of `value` with every reference replaced by its target's new
    /// number, or by what stands in for it.
    fn rewrite(&mut self, value: &Object) -> Object {
        match value {
            Object::Reference(id) => self.rewrite_reference(*id),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.rewrite(item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.rewrite_dict(dict)),
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                let dict = self.rewrite_dict(stream.dictionary());
                *stream.dictionary_mut() = dict;
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    fn rewrite_dict(&mut self, dict: &Dictionary) -> Dictionary {
        dict.iter()
            .map(|(key, value)| (key.clone(), self.rewrite(value)))
            .collect()
    }

    fn rewrite_reference(&mut self, id: ObjectId) -> Object {
        let Some(handle) = self.resolver.resolve_handle(id) else {
            trace!("Dangling reference {} written as null", id);
            return Object::Null;
        };
        let identity = handle.identity();
        if let Some((number, _)) = self.numbers.get(&identity) {
            return Object::Reference(ObjectId::new(*number, 0));
        }
        if !self.page_overrides.contains_key(&identity) {
            match handle.get_type().as_deref() {
                Some("Pages") => return Object::Reference(ObjectId::new(PAGES_NUMBER, 0)),
                Some("Page") => {
                    trace!("Reference to unwritten page {} written as null", id);
                    return Object::Null;
                }
                _ => {}
            }
        }
        Object::Reference(ObjectId::new(self.number_for(&handle), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{Annotation, AnnotationType};
    use crate::forms::{Field, FieldType};
    use crate::geometry::Rectangle;
    use crate::objects::ObjectArena;

    fn reference(number: u32) -> Object {
        Object::Reference(ObjectId::new(number, 0))
    }

    fn value(plan: &GraphPlan, number: u32) -> &Object {
        &plan
            .objects
            .iter()
            .find(|(n, _)| *n == number)
            .unwrap()
            .1
    }

    #[test]
    fn test_shared_object_numbered_once() {
        let arena = ObjectArena::new();
        let font = arena.add_object(Object::Dictionary(Dictionary::new()));
        let pages: Vec<Page> = (0..2)
            .map(|_| {
                let page = Page::new(&arena, 612.0, 792.0);
                let mut fonts = Dictionary::new();
                fonts.set("F1", font.id());
                let mut resources = Dictionary::new();
                resources.set("Font", fonts);
                if let Some(dict) = page.handle().borrow_mut().as_dict_mut() {
                    dict.set("Resources", resources);
                }
                page
            })
            .collect();

        let plan = collect(&arena, &pages, None);
        assert_eq!(plan.page_numbers, vec![3, 5]);
        assert_eq!(plan.objects.len(), 3);
        assert_eq!(plan.next_number, 6);
        let page = value(&plan, 5).as_dict().unwrap();
        assert_eq!(page.get("Parent"), Some(&reference(PAGES_NUMBER)));
        let fonts = page.get_dict("Resources").and_then(|r| r.get_dict("Font"));
        assert_eq!(fonts.and_then(|f| f.get("F1")), Some(&reference(4)));
    }

    #[test]
    fn test_cycle_terminates() {
        let arena = ObjectArena::new();
        let page = Page::new(&arena, 612.0, 792.0);
        let a = arena.add_object(Object::Null);
        let b = arena.add_object(Object::Null);
        let mut da = Dictionary::new();
        da.set("Next", b.id());
        a.replace(Object::Dictionary(da));
        let mut db = Dictionary::new();
        db.set("Next", a.id());
        db.set("Self", b.id());
        b.replace(Object::Dictionary(db));
        if let Some(dict) = page.handle().borrow_mut().as_dict_mut() {
            dict.set("Extra", a.id());
        }

        let plan = collect(&arena, &[page], None);
        assert_eq!(plan.objects.len(), 3);
        let b_out = value(&plan, 5).as_dict().unwrap();
        assert_eq!(b_out.get("Next"), Some(&reference(4)));
        assert_eq!(b_out.get("Self"), Some(&reference(5)));
    }

    #[test]
    fn test_dangling_and_foreign_references() {
        let arena = ObjectArena::new();
        let outside = Page::new(&arena, 100.0, 100.0);
        let mut old_root = Dictionary::new();
        old_root.set("Type", Object::name("Pages"));
        let old_root = arena.add_object(Object::Dictionary(old_root));
        let page = Page::new(&arena, 612.0, 792.0);
        if let Some(dict) = page.handle().borrow_mut().as_dict_mut() {
            dict.set("Parent", old_root.id());
            dict.set("Missing", ObjectId::new(500, 0));
            dict.set("Other", outside.id());
            dict.set("Tree", old_root.id());
        }

        let plan = collect(&arena, &[page], None);
        assert_eq!(plan.objects.len(), 1);
        let out = value(&plan, 3).as_dict().unwrap();
        assert_eq!(out.get("Parent"), Some(&reference(PAGES_NUMBER)));
        assert_eq!(out.get("Missing"), Some(&Object::Null));
        assert_eq!(out.get("Other"), Some(&Object::Null));
        assert_eq!(out.get("Tree"), Some(&reference(PAGES_NUMBER)));
    }

    #[test]
    fn test_widget_parent_depends_on_form() {
        let arena = ObjectArena::new();
        let page = Page::new(&arena, 612.0, 792.0);
        let form = crate::forms::AcroForm::new(&arena);
        let field = Field::create(&arena, "name", FieldType::Text);
        form.add_field(&arena, &field);
        let rect = Rectangle::from_position_and_size(0.0, 0.0, 100.0, 20.0);
        let mut widget = Annotation::create(&arena, AnnotationType::Widget, rect);
        widget.as_widget_mut().unwrap().set_parent(&field);
        page.add_annotation(&arena, &widget);

        let without = collect(&arena, &[page.clone()], None);
        assert_eq!(without.objects.len(), 2);
        assert!(value(&without, 4).as_dict().unwrap().get("Parent").is_none());
        assert_eq!(without.form_number, None);

        let with = collect(&arena, &[page], Some(&form));
        // page, widget, field, form
        assert_eq!(with.objects.len(), 4);
        assert_eq!(
            value(&with, 4).as_dict().unwrap().get("Parent"),
            Some(&reference(5))
        );
        assert_eq!(with.form_number, Some(6));
    }

    #[test]
    fn test_duplicate_page_written_once() {
        let arena = ObjectArena::new();
        let page = Page::new(&arena, 612.0, 792.0);
        let plan = collect(&arena, &[page.clone(), page], None);
        assert_eq!(plan.page_numbers, vec![3]);
    }
}
