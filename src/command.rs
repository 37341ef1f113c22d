use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::annotation::{Point, TextId, TextStyle};
use crate::error::EditorResult;
use crate::state::EditorState;
use crate::surface::DisplayRect;

/// A user action as produced by a front end. Pointer positions are image
/// pixels unless a `display` rect says where the surface is shown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    LoadImage {
        path: PathBuf,
    },
    AddText {
        text: String,
        #[serde(default)]
        position: Option<Point>,
        #[serde(default)]
        style: Option<TextStyle>,
    },
    Select {
        x: f32,
        y: f32,
        #[serde(default = "single_click")]
        clicks: u8,
        #[serde(default)]
        display: Option<DisplayRect>,
    },
    DragTo {
        x: f32,
        y: f32,
        #[serde(default)]
        display: Option<DisplayRect>,
    },
    Release,
    Leave,
    Move {
        id: TextId,
        x: f32,
        y: f32,
    },
    BeginEdit {
        id: TextId,
    },
    CancelEdit,
    PreviewStyle {
        style: TextStyle,
    },
    Edit {
        id: TextId,
        text: String,
        #[serde(default)]
        style: Option<TextStyle>,
    },
    Delete {
        id: TextId,
    },
    DeleteSelected,
    ClearText,
    ClearAll,
    Undo,
    Redo,
    Export {
        path: PathBuf,
    },
}

fn single_click() -> u8 {
    1
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Done,
    /// Whether the command changed anything.
    Changed(bool),
    Added(TextId),
    Hit(Option<TextId>),
    Cleared(usize),
    Exported(PathBuf),
}

impl EditorState {
    pub fn apply(&mut self, command: Command) -> EditorResult<Outcome> {
        match command {
            Command::LoadImage { path } => {
                self.load_image_file(&path)?;
                Ok(Outcome::Done)
            }
            Command::AddText {
                text,
                position,
                style,
            } => self.add_text(&text, position, style).map(Outcome::Added),
            Command::Select {
                x,
                y,
                clicks,
                display,
            } => {
                let point = self.pointer(x, y, display);
                self.select(point, clicks).map(Outcome::Hit)
            }
            Command::DragTo { x, y, display } => {
                let point = self.pointer(x, y, display);
                self.drag_to(point)?;
                Ok(Outcome::Done)
            }
            Command::Release => self.release().map(Outcome::Changed),
            Command::Leave => self.leave().map(Outcome::Changed),
            Command::Move { id, x, y } => {
                self.move_text(id, Point::new(x, y))?;
                Ok(Outcome::Done)
            }
            Command::BeginEdit { id } => {
                self.begin_edit(id)?;
                Ok(Outcome::Done)
            }
            Command::CancelEdit => {
                self.cancel_edit()?;
                Ok(Outcome::Done)
            }
            Command::PreviewStyle { style } => {
                self.preview_style(style)?;
                Ok(Outcome::Done)
            }
            Command::Edit { id, text, style } => {
                self.edit(id, &text, style)?;
                Ok(Outcome::Done)
            }
            Command::Delete { id } => {
                self.delete(id)?;
                Ok(Outcome::Done)
            }
            Command::DeleteSelected => self.delete_selected().map(Outcome::Changed),
            Command::ClearText => self.clear_text().map(Outcome::Cleared),
            Command::ClearAll => {
                self.clear_all()?;
                Ok(Outcome::Done)
            }
            Command::Undo => Ok(Outcome::Changed(self.undo())),
            Command::Redo => Ok(Outcome::Changed(self.redo())),
            Command::Export { path } => {
                self.export_to(&path)?;
                Ok(Outcome::Exported(path))
            }
        }
    }

    fn pointer(&self, x: f32, y: f32, display: Option<DisplayRect>) -> Point {
        let point = Point::new(x, y);
        match display {
            Some(display) => self.surface().to_image_space(point, display),
            None => point,
        }
    }
}
