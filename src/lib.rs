pub mod annotation;
pub mod clipboard;
pub mod command;
pub mod error;
pub mod flatten;
pub mod history;
pub mod measure;
pub mod overlay;
pub mod settings;
pub mod state;
pub mod surface;

pub use annotation::{Color, FontFamily, Point, TextId, TextObject, TextSize, TextStyle};
pub use command::{Command, Outcome};
pub use error::{EditorError, EditorResult};
pub use measure::{FontBook, TextMeasure};
pub use settings::Settings;
pub use state::EditorState;
