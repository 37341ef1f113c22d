use std::path::Path;
use std::sync::Arc;

use image::error::{ParameterError, ParameterErrorKind};
use image::{DynamicImage, ImageError, RgbaImage};
use log::{debug, info, warn};

use crate::annotation::{is_blank, Point, TextId, TextObject, TextStyle};
use crate::error::{EditorError, EditorResult};
use crate::flatten::{self, Chrome, Compositor, Scene};
use crate::history::UndoHistory;
use crate::measure::{FontBook, TextMeasure};
use crate::overlay::{OverlayStore, TextPatch};
use crate::settings::Settings;
use crate::surface::Surface;

/// One history entry. Bitmaps, the base image and unchanged text objects are
/// shared between entries.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub bitmap: Arc<RgbaImage>,
    pub base: Option<Arc<RgbaImage>>,
    pub overlays: Vec<Arc<TextObject>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DragState {
    id: TextId,
    grab_offset: Point,
    origin: Point,
}

#[derive(Clone, Debug, PartialEq)]
struct EditSession {
    id: TextId,
    original_style: TextStyle,
}

/// The editor session. Every user command is a method here.
pub struct EditorState {
    surface: Surface,
    base: Option<Arc<RgbaImage>>,
    overlays: OverlayStore,
    history: UndoHistory<Snapshot>,
    fonts: FontBook,
    settings: Settings,
    selection: Option<TextId>,
    editing: Option<EditSession>,
    drag: Option<DragState>,
}

impl EditorState {
    pub fn new(settings: Settings, fonts: FontBook) -> Self {
        let surface = Surface::blank(
            settings.blank_width,
            settings.blank_height,
            settings.blank_fill,
        );
        let mut state = Self {
            surface,
            base: None,
            overlays: OverlayStore::new(),
            history: UndoHistory::new(settings.history_capacity),
            fonts,
            settings,
            selection: None,
            editing: None,
            drag: None,
        };
        if let Err(err) = state.redraw() {
            warn!("initial redraw failed: {err}");
        }
        let initial = state.capture(
            Arc::clone(state.surface.bitmap()),
            state.overlays.snapshot(),
        );
        state.history.push_snapshot(initial);
        state
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn base_image(&self) -> Option<&Arc<RgbaImage>> {
        self.base.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.base.is_some()
    }

    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    pub fn text(&self, id: TextId) -> Option<&TextObject> {
        self.overlays.get(id)
    }

    pub fn history(&self) -> &UndoHistory<Snapshot> {
        &self.history
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn selection(&self) -> Option<TextId> {
        self.selection
    }

    pub fn editing(&self) -> Option<TextId> {
        self.editing.as_ref().map(|edit| edit.id)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn chrome(&self) -> Chrome {
        match (self.editing(), self.selection) {
            (Some(id), _) => Chrome::Editing(id),
            (None, Some(id)) => Chrome::Selected(id),
            (None, None) => Chrome::None,
        }
    }

    pub fn load_image_bytes(&mut self, bytes: &[u8]) -> EditorResult<()> {
        let image = image::load_from_memory(bytes).map_err(EditorError::ImageDecodeFailure)?;
        self.load_image(image)
    }

    pub fn load_image_file(&mut self, path: &Path) -> EditorResult<()> {
        let bytes = std::fs::read(path)?;
        self.load_image_bytes(&bytes)
    }

    /// Replaces the base image and resizes the surface to it. Existing text
    /// objects stay where they are.
    pub fn load_image(&mut self, image: DynamicImage) -> EditorResult<()> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EditorError::ImageDecodeFailure(ImageError::Parameter(
                ParameterError::from_kind(ParameterErrorKind::DimensionMismatch),
            )));
        }

        let base = Arc::new(image.to_rgba8());
        let bitmap = self.compose(Some(&base), self.overlays.as_slice(), Chrome::None)?;
        info!("loaded {}x{} image", base.width(), base.height());

        self.base = Some(base);
        self.selection = None;
        self.editing = None;
        self.drag = None;
        self.surface.present(Arc::new(bitmap));
        self.commit()
    }

    /// Adds a text object and selects it. Without a position the text is
    /// centred on the surface; without a style the configured default is used.
    pub fn add_text(
        &mut self,
        text: &str,
        position: Option<Point>,
        style: Option<TextStyle>,
    ) -> EditorResult<TextId> {
        if is_blank(text) {
            return Err(EditorError::EmptyTextRejected);
        }
        if self.base.is_none() {
            return Err(EditorError::NoImageLoaded);
        }

        let style = style.unwrap_or_else(|| self.settings.default_style.clone());
        let position = position.unwrap_or_else(|| {
            let size = self.fonts.measure(text, &style);
            let surface = self.surface.size();
            Point::new(
                (surface.width - size.width) / 2.0,
                (surface.height - size.height) / 2.0,
            )
        });

        let object = self.overlays.add(text, position, style)?;
        debug!("added text {} at ({}, {})", object.id, position.x, position.y);
        self.selection = Some(object.id);
        self.editing = None;
        self.drag = None;
        self.redraw()?;
        self.commit()?;
        Ok(object.id)
    }

    /// Pointer down at `point` (image pixels). `clicks` is the click count of
    /// the gesture, 2 for a double click. Returns the object under the pointer.
    pub fn select(&mut self, point: Point, clicks: u8) -> EditorResult<Option<TextId>> {
        if self.base.is_none() {
            return Ok(None);
        }

        let hit = self
            .overlays
            .find_at(point, &self.fonts)
            .map(|object| (object.id, object.position));

        let Some((id, position)) = hit else {
            self.selection = None;
            self.cancel_edit_session();
            self.drag = None;
            self.redraw()?;
            return Ok(None);
        };

        let currently_editing = self.editing() == Some(id);
        if self.editing().is_some_and(|editing| editing != id) {
            self.cancel_edit_session();
        }
        if clicks >= 2 && self.selection == Some(id) && !currently_editing {
            self.start_edit_session(id);
        }
        if !currently_editing {
            self.selection = Some(id);
            self.overlays.raise(id);
        }

        self.drag = Some(DragState {
            id,
            grab_offset: position.delta(point),
            origin: position,
        });
        self.redraw()?;
        Ok(Some(id))
    }

    /// Pointer move while dragging. Keeps the grab offset and the whole text
    /// box inside the surface. Never touches history.
    pub fn drag_to(&mut self, point: Point) -> EditorResult<()> {
        let Some(drag) = self.drag else {
            return Ok(());
        };
        let Some(object) = self.overlays.get(drag.id) else {
            self.drag = None;
            return Ok(());
        };

        let wanted = Point::new(point.x - drag.grab_offset.x, point.y - drag.grab_offset.y);
        let size = object.size(&self.fonts);
        let position = self.surface.clamp_position(wanted, size);
        if let Some(object) = self.overlays.get_mut(drag.id) {
            object.move_to(position);
        }
        self.redraw()
    }

    /// Pointer up. Ends the drag and commits once if the object moved.
    pub fn release(&mut self) -> EditorResult<bool> {
        let Some(drag) = self.drag.take() else {
            return Ok(false);
        };
        let moved = self
            .overlays
            .get(drag.id)
            .is_some_and(|object| object.position != drag.origin);
        if moved {
            self.commit()?;
        }
        Ok(moved)
    }

    /// Pointer left the surface. Same as a release: movement so far is kept.
    pub fn leave(&mut self) -> EditorResult<bool> {
        self.release()
    }

    pub fn move_text(&mut self, id: TextId, position: Point) -> EditorResult<()> {
        let current = self.overlays.get(id).ok_or(EditorError::UnknownText(id))?;
        if current.position == position {
            return Ok(());
        }
        self.overlays.update(
            id,
            TextPatch {
                position: Some(position),
                ..TextPatch::default()
            },
        )?;
        self.redraw()?;
        self.commit()
    }

    pub fn begin_edit(&mut self, id: TextId) -> EditorResult<&TextObject> {
        if self.overlays.get(id).is_none() {
            return Err(EditorError::UnknownText(id));
        }
        if self.editing() != Some(id) {
            self.cancel_edit_session();
            self.start_edit_session(id);
        }
        self.selection = Some(id);
        self.redraw()?;
        self.overlays.get(id).ok_or(EditorError::UnknownText(id))
    }

    /// Leaves edit mode, undoing any previewed style.
    pub fn cancel_edit(&mut self) -> EditorResult<()> {
        if self.editing.is_none() {
            return Ok(());
        }
        self.cancel_edit_session();
        self.redraw()
    }

    /// Shows `style` on the text being edited without recording history.
    pub fn preview_style(&mut self, style: TextStyle) -> EditorResult<()> {
        let Some(id) = self.editing() else {
            return Ok(());
        };
        if let Some(object) = self.overlays.get_mut(id) {
            object.style = style;
        }
        self.redraw()
    }

    pub fn edit(&mut self, id: TextId, text: &str, style: Option<TextStyle>) -> EditorResult<()> {
        if is_blank(text) {
            return Err(EditorError::EmptyTextRejected);
        }
        self.overlays.update(
            id,
            TextPatch {
                text: Some(text.to_owned()),
                style,
                ..TextPatch::default()
            },
        )?;
        if self.editing() == Some(id) {
            self.editing = None;
        }
        self.redraw()?;
        self.commit()
    }

    pub fn delete(&mut self, id: TextId) -> EditorResult<()> {
        self.overlays
            .remove(id)
            .ok_or(EditorError::UnknownText(id))?;
        if self.selection == Some(id) {
            self.selection = None;
        }
        if self.editing() == Some(id) {
            self.editing = None;
        }
        if self.drag.is_some_and(|drag| drag.id == id) {
            self.drag = None;
        }
        self.redraw()?;
        self.commit()
    }

    pub fn delete_selected(&mut self) -> EditorResult<bool> {
        let Some(id) = self.selection else {
            return Ok(false);
        };
        self.delete(id)?;
        Ok(true)
    }

    pub fn clear_text(&mut self) -> EditorResult<usize> {
        if self.overlays.is_empty() {
            return Ok(0);
        }
        let removed = self.overlays.clear();
        self.selection = None;
        self.editing = None;
        self.drag = None;
        self.redraw()?;
        self.commit()?;
        Ok(removed)
    }

    /// Drops every text object and the base image. The surface goes back to
    /// its blank size.
    pub fn clear_all(&mut self) -> EditorResult<()> {
        if self.base.is_none() && self.overlays.is_empty() {
            return Ok(());
        }
        self.overlays.clear();
        self.base = None;
        self.selection = None;
        self.editing = None;
        self.drag = None;
        self.surface = Surface::blank(
            self.settings.blank_width,
            self.settings.blank_height,
            self.settings.blank_fill,
        );
        self.redraw()?;
        self.commit()
    }

    pub fn redraw(&mut self) -> EditorResult<()> {
        let bitmap = self.compose(self.base.as_ref(), self.overlays.as_slice(), self.chrome())?;
        self.surface.present(Arc::new(bitmap));
        Ok(())
    }

    /// Records the current state as the newest history entry. A text object in
    /// edit mode is recorded with the style it had before the preview.
    pub fn commit(&mut self) -> EditorResult<()> {
        let overlays = self.committed_overlays();
        let bitmap = if self.chrome() == Chrome::None {
            Arc::clone(self.surface.bitmap())
        } else {
            Arc::new(self.compose(self.base.as_ref(), &overlays, Chrome::None)?)
        };
        let snapshot = self.capture(bitmap, overlays);
        self.history.push_snapshot(snapshot);
        debug!(
            "history: {} entries, at {:?}",
            self.history.len(),
            self.history.index()
        );
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    /// The composited image without selection outlines.
    pub fn render_export(&self) -> EditorResult<RgbaImage> {
        let Some(base) = self.base.as_ref() else {
            return Err(EditorError::NoImageLoaded);
        };
        self.compose(Some(base), self.overlays.as_slice(), Chrome::None)
    }

    pub fn export_png(&self) -> EditorResult<Vec<u8>> {
        flatten::encode_png(&self.render_export()?)
    }

    pub fn export_to(&self, path: &Path) -> EditorResult<()> {
        flatten::save_image(&self.render_export()?, path)?;
        info!("exported to {}", path.display());
        Ok(())
    }

    fn compose(
        &self,
        base: Option<&Arc<RgbaImage>>,
        overlays: &[Arc<TextObject>],
        chrome: Chrome,
    ) -> EditorResult<RgbaImage> {
        Compositor::new(&self.fonts, self.settings.blank_fill).flatten(&Scene {
            base: base.map(Arc::as_ref),
            width: self.surface.width(),
            height: self.surface.height(),
            overlays,
            chrome,
        })
    }

    fn committed_overlays(&self) -> Vec<Arc<TextObject>> {
        let mut overlays = self.overlays.snapshot();
        let Some(edit) = self.editing.as_ref() else {
            return overlays;
        };
        if let Some(slot) = overlays.iter_mut().find(|object| object.id == edit.id) {
            if slot.style != edit.original_style {
                Arc::make_mut(slot).style = edit.original_style.clone();
            }
        }
        overlays
    }

    fn capture(&self, bitmap: Arc<RgbaImage>, overlays: Vec<Arc<TextObject>>) -> Snapshot {
        Snapshot {
            bitmap,
            base: self.base.clone(),
            overlays,
        }
    }

    // All three parts are swapped together; nothing here can fail.
    fn restore(&mut self, snapshot: Snapshot) {
        self.surface.present(snapshot.bitmap);
        self.base = snapshot.base;
        self.overlays.restore(snapshot.overlays);
        self.selection = None;
        self.editing = None;
        self.drag = None;
        debug!("restored history entry {:?}", self.history.index());
    }

    fn start_edit_session(&mut self, id: TextId) {
        if let Some(object) = self.overlays.get(id) {
            self.editing = Some(EditSession {
                id,
                original_style: object.style.clone(),
            });
        }
    }

    fn cancel_edit_session(&mut self) {
        let Some(edit) = self.editing.take() else {
            return;
        };
        if let Some(object) = self.overlays.get_mut(edit.id) {
            if object.style != edit.original_style {
                object.style = edit.original_style;
            }
        }
    }
}
