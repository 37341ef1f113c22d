use std::sync::Arc;

use crate::annotation::{is_blank, Point, TextId, TextObject, TextStyle};
use crate::error::{EditorError, EditorResult};
use crate::measure::TextMeasure;

/// Fields to change on an existing text object; `None` leaves a field alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextPatch {
    pub text: Option<String>,
    pub position: Option<Point>,
    pub style: Option<TextStyle>,
}

/// Text objects in z-order, bottom first. Objects are shared with history
/// snapshots and copied only when mutated.
#[derive(Clone, Debug)]
pub struct OverlayStore {
    objects: Vec<Arc<TextObject>>,
    next_id: TextId,
}

impl Default for OverlayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayStore {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, text: &str, position: Point, style: TextStyle) -> EditorResult<TextObject> {
        if is_blank(text) {
            return Err(EditorError::EmptyTextRejected);
        }
        let object = TextObject {
            id: self.next_id,
            text: text.to_owned(),
            position,
            style,
        };
        self.next_id = self.next_id.saturating_add(1);
        self.objects.push(Arc::new(object.clone()));
        Ok(object)
    }

    /// Top-most object whose measured box contains `point`.
    pub fn find_at(&self, point: Point, measure: &dyn TextMeasure) -> Option<&TextObject> {
        self.objects
            .iter()
            .rev()
            .map(Arc::as_ref)
            .find(|object| object.contains(point, measure))
    }

    pub fn update(&mut self, id: TextId, patch: TextPatch) -> EditorResult<&TextObject> {
        if patch.text.as_deref().is_some_and(is_blank) {
            return Err(EditorError::EmptyTextRejected);
        }
        let object = self.get_mut(id).ok_or(EditorError::UnknownText(id))?;
        if let Some(text) = patch.text {
            object.text = text;
        }
        if let Some(position) = patch.position {
            object.move_to(position);
        }
        if let Some(style) = patch.style {
            object.style = style;
        }
        Ok(object)
    }

    pub fn remove(&mut self, id: TextId) -> Option<Arc<TextObject>> {
        let index = self.index_of(id)?;
        Some(self.objects.remove(index))
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.objects.len();
        self.objects.clear();
        removed
    }

    /// Moves the object to the top of the z-order.
    pub fn raise(&mut self, id: TextId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let object = self.objects.remove(index);
        self.objects.push(object);
        true
    }

    pub fn get(&self, id: TextId) -> Option<&TextObject> {
        self.objects
            .iter()
            .map(Arc::as_ref)
            .find(|object| object.id == id)
    }

    pub fn get_mut(&mut self, id: TextId) -> Option<&mut TextObject> {
        self.objects
            .iter_mut()
            .find(|object| object.id == id)
            .map(Arc::make_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextObject> {
        self.objects.iter().map(Arc::as_ref)
    }

    pub fn as_slice(&self) -> &[Arc<TextObject>] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<TextObject>> {
        self.objects.clone()
    }

    /// Replaces the sequence. Ids keep counting up so restored and new
    /// objects never collide.
    pub fn restore(&mut self, objects: Vec<Arc<TextObject>>) {
        self.objects = objects;
    }

    fn index_of(&self, id: TextId) -> Option<usize> {
        self.objects.iter().position(|object| object.id == id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{OverlayStore, TextPatch};
    use crate::annotation::{Point, TextSize, TextStyle};
    use crate::error::EditorError;
    use crate::measure::FontBook;

    fn small() -> TextStyle {
        TextStyle {
            size: TextSize::from_px(10),
            ..TextStyle::default()
        }
    }

    #[test]
    fn ids_follow_creation_order() {
        let mut store = OverlayStore::new();
        let a = store.add("a", Point::new(0.0, 0.0), small()).expect("add a");
        let b = store.add("b", Point::new(0.0, 0.0), small()).expect("add b");
        assert!(a.id < b.id);
        store.remove(b.id);
        let c = store.add("c", Point::new(0.0, 0.0), small()).expect("add c");
        assert!(c.id > b.id);
    }

    #[test]
    fn blank_text_is_rejected() {
        let mut store = OverlayStore::new();
        let err = store.add("  ", Point::new(0.0, 0.0), small()).unwrap_err();
        assert!(matches!(err, EditorError::EmptyTextRejected));
        assert!(store.is_empty());

        let id = store.add("ok", Point::new(0.0, 0.0), small()).expect("add").id;
        let patch = TextPatch {
            text: Some(String::new()),
            ..TextPatch::default()
        };
        assert!(matches!(
            store.update(id, patch),
            Err(EditorError::EmptyTextRejected)
        ));
        assert_eq!(store.get(id).map(|object| object.text.as_str()), Some("ok"));
    }

    #[test]
    fn find_at_returns_top_most() {
        let fonts = FontBook::empty();
        let mut store = OverlayStore::new();
        let bottom = store.add("wide text", Point::new(0.0, 0.0), small()).expect("bottom");
        let top = store.add("top", Point::new(5.0, 2.0), small()).expect("top");

        let hit = store.find_at(Point::new(6.0, 5.0), &fonts).map(|object| object.id);
        assert_eq!(hit, Some(top.id));

        // Only the wider bottom label reaches x = 40.
        let hit = store.find_at(Point::new(40.0, 5.0), &fonts).map(|object| object.id);
        assert_eq!(hit, Some(bottom.id));

        assert!(store.find_at(Point::new(200.0, 200.0), &fonts).is_none());

        store.raise(bottom.id);
        let hit = store.find_at(Point::new(6.0, 5.0), &fonts).map(|object| object.id);
        assert_eq!(hit, Some(bottom.id));
    }

    #[test]
    fn mutation_does_not_touch_snapshots() {
        let mut store = OverlayStore::new();
        let id = store.add("first", Point::new(1.0, 1.0), small()).expect("add").id;
        let snapshot = store.snapshot();

        store
            .update(
                id,
                TextPatch {
                    position: Some(Point::new(9.0, 9.0)),
                    ..TextPatch::default()
                },
            )
            .expect("update");

        assert_eq!(snapshot[0].position, Point::new(1.0, 1.0));
        assert_eq!(store.get(id).map(|object| object.position), Some(Point::new(9.0, 9.0)));
        assert!(!Arc::ptr_eq(&snapshot[0], &store.as_slice()[0]));
    }

    #[test]
    fn unchanged_objects_are_shared_with_snapshots() {
        let mut store = OverlayStore::new();
        store.add("a", Point::new(0.0, 0.0), small()).expect("add");
        let snapshot = store.snapshot();
        assert!(Arc::ptr_eq(&snapshot[0], &store.as_slice()[0]));
    }

    #[test]
    fn update_unknown_id_fails() {
        let mut store = OverlayStore::new();
        assert!(matches!(
            store.update(42, TextPatch::default()),
            Err(EditorError::UnknownText(42))
        ));
        assert!(store.remove(42).is_none());
        assert!(!store.raise(42));
    }

    #[test]
    fn clear_reports_removed_count() {
        let mut store = OverlayStore::new();
        store.add("a", Point::new(0.0, 0.0), small()).expect("add");
        store.add("b", Point::new(0.0, 0.0), small()).expect("add");
        assert_eq!(store.clear(), 2);
        assert_eq!(store.clear(), 0);
    }
}
