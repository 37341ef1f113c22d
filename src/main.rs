use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use snaptext::clipboard;
use snaptext::{Command, EditorState, FontBook, Outcome, Settings};

/// Put text labels on a screenshot and export the flattened result.
#[derive(Debug, Parser)]
#[command(name = "snaptext", version, about)]
struct Cli {
    /// Image to annotate.
    image: Option<PathBuf>,

    /// Take the image from the clipboard instead of a file.
    #[arg(long, conflicts_with = "image")]
    clipboard: bool,

    /// JSON file holding a list of editor commands to replay.
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Where to write the result. Defaults to a timestamped PNG in the
    /// current directory.
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Also copy the result to the clipboard.
    #[arg(long)]
    copy: bool,

    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    let fonts = FontBook::with_overrides(&settings.fonts);
    let mut editor = EditorState::new(settings, fonts);

    if let Some(path) = &cli.image {
        editor
            .load_image_file(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
    } else if cli.clipboard {
        let Some(image) = clipboard::read_image_from_clipboard()? else {
            bail!("clipboard does not contain an image");
        };
        editor.load_image(image).context("cannot use clipboard image")?;
    }

    if let Some(path) = &cli.script {
        replay(&mut editor, path)?;
    }

    if !editor.has_image() {
        bail!("{}", snaptext::EditorError::NoImageLoaded.to_user_facing());
    }

    let output = cli
        .output
        .unwrap_or_else(|| default_output_name(&editor.settings().export_name));
    editor
        .export_to(&output)
        .with_context(|| format!("cannot export to {}", output.display()))?;
    println!("{}", output.display());

    if cli.copy {
        let image = editor.render_export()?;
        clipboard::write_image_to_clipboard(&image)?;
        info!("copied {}x{} image to clipboard", image.width(), image.height());
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from(path),
        None => Ok(Settings::load().unwrap_or_else(|err| {
            info!("using default settings: {err:#}");
            Settings::default()
        })),
    }
}

fn replay(editor: &mut EditorState, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read script {}", path.display()))?;
    let commands: Vec<Command> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid script {}", path.display()))?;

    info!("replaying {} commands from {}", commands.len(), path.display());
    for (index, command) in commands.into_iter().enumerate() {
        let label = format!("{command:?}");
        match editor.apply(command) {
            Ok(Outcome::Added(id)) => info!("#{index}: added text {id}"),
            Ok(Outcome::Exported(path)) => info!("#{index}: exported {}", path.display()),
            Ok(_) => {}
            Err(err) => warn!("#{index}: {label} rejected: {} ({err})", err.to_user_facing()),
        }
    }
    Ok(())
}

fn default_output_name(base: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("{base}-{stamp}.png"))
}
