use std::path::Path;
use std::sync::Arc;

use ab_glyph::{Font, FontArc, ScaleFont};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tiny_skia::{
    ColorU8, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, StrokeDash, Transform,
};

use crate::annotation::{Bounds, Color, TextId, TextObject};
use crate::error::{EditorError, EditorResult};
use crate::measure::{FontBook, TextMeasure};

/// Background plate opacity (50%).
const PLATE_ALPHA: u8 = 128;
/// Plate padding as a multiple of the font size.
const PLATE_PADDING: f32 = 0.2;
const OUTLINE_WIDTH: f32 = 2.0;
const SELECTED_INSET: f32 = 2.0;
const EDITING_INSET: f32 = 4.0;
const EDITING_DASH: [f32; 2] = [5.0, 3.0];

/// Outline drawn around the active text object. Never part of an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Chrome {
    #[default]
    None,
    Selected(TextId),
    Editing(TextId),
}

/// Inputs of a redraw. The output depends on nothing else.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    pub base: Option<&'a RgbaImage>,
    pub width: u32,
    pub height: u32,
    pub overlays: &'a [Arc<TextObject>],
    pub chrome: Chrome,
}

pub struct Compositor<'a> {
    fonts: &'a FontBook,
    fill: Color,
}

impl<'a> Compositor<'a> {
    /// `fill` paints the surface when there is no base image.
    pub fn new(fonts: &'a FontBook, fill: Color) -> Self {
        Self { fonts, fill }
    }

    pub fn flatten(&self, scene: &Scene<'_>) -> EditorResult<RgbaImage> {
        let (width, height) = match scene.base {
            Some(base) => (base.width(), base.height()),
            None => (scene.width, scene.height),
        };
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| EditorError::Render(format!("cannot allocate {width}x{height} pixmap")))?;

        match scene.base {
            Some(base) => copy_image_to_pixmap(base, &mut pixmap)?,
            None => pixmap.fill(skia_color(self.fill)),
        }

        for object in scene.overlays {
            let bounds = object.bounds(self.fonts);
            if let Some(background) = object.style.background {
                fill_plate(&mut pixmap, object, bounds, background);
            }
            self.draw_glyphs(&mut pixmap, object, bounds);

            match scene.chrome {
                Chrome::Selected(id) if id == object.id => stroke_outline(
                    &mut pixmap,
                    bounds.expand(SELECTED_INSET),
                    Color::SELECTION,
                    None,
                ),
                Chrome::Editing(id) if id == object.id => stroke_outline(
                    &mut pixmap,
                    bounds.expand(EDITING_INSET),
                    Color::EDITING,
                    Some(EDITING_DASH.as_slice()),
                ),
                _ => {}
            }
        }

        Ok(pixmap_to_image(&pixmap))
    }

    // Glyphs go onto a transparent layer first. Drawing opaque text on
    // transparent black leaves premultiplied pixels behind, so the layer can
    // be handed to tiny-skia as is and blended with the text alpha. The layer
    // only covers the part of the text box that lands on the surface.
    fn draw_glyphs(&self, pixmap: &mut Pixmap, object: &TextObject, bounds: Bounds) {
        let Some(font) = self.fonts.face(&object.style) else {
            return;
        };

        let px = object.style.size.px();
        let line_height = self.fonts.line_height(&object.style);
        let slack = px.ceil() as i64;

        let origin_x = bounds.x.round() as i64;
        let origin_y = bounds.y.round() as i64;
        let left = origin_x.max(0);
        let top = origin_y.max(0);
        let right = origin_x
            .saturating_add(bounds.width.ceil() as i64)
            .saturating_add(slack)
            .min(i64::from(pixmap.width()));
        let bottom = origin_y
            .saturating_add(bounds.height.ceil() as i64)
            .saturating_add(slack)
            .min(i64::from(pixmap.height()));
        if right <= left || bottom <= top {
            return;
        }

        let layer_width = (right - left) as u32;
        let layer_height = (bottom - top) as u32;
        // Text origin relative to the layer; negative when clipped.
        let shift_x = (origin_x - left) as f32;
        let shift_y = origin_y - top;

        let [r, g, b, a] = object.style.color.0;
        let mut layer = RgbaImage::new(layer_width, layer_height);
        for (index, line) in object.lines().enumerate() {
            let line_top = shift_y + (index as f32 * line_height).round() as i64;
            let line_bottom = line_top + slack + line_height.ceil() as i64;
            if line_bottom < 0 || line_top > i64::from(layer_height) {
                continue;
            }
            let Some((start, end, pen)) =
                visible_run(font, px, line, -shift_x, -shift_x + layer_width as f32)
            else {
                continue;
            };
            draw_text_mut(
                &mut layer,
                Rgba([r, g, b, 255]),
                (shift_x + pen).round() as i32,
                line_top as i32,
                px,
                font,
                &line[start..end],
            );
        }

        let Some(size) = IntSize::from_wh(layer_width, layer_height) else {
            return;
        };
        let Some(layer) = Pixmap::from_vec(layer.into_raw(), size) else {
            return;
        };
        let paint = PixmapPaint {
            opacity: a as f32 / 255.0,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(
            left as i32,
            top as i32,
            layer.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }
}

/// Byte range of `line` whose glyphs can reach the pen span `from..to`, and
/// the pen position at its first glyph. Glyphs within one font size of the
/// span are kept so overhanging ink is not cut.
fn visible_run(
    font: &FontArc,
    px: f32,
    line: &str,
    from: f32,
    to: f32,
) -> Option<(usize, usize, f32)> {
    let scaled = font.as_scaled(px);
    let mut pen = 0.0f32;
    let mut prev = None;
    let mut start = None;
    let mut end = line.len();
    for (offset, ch) in line.char_indices() {
        let glyph = font.glyph_id(ch);
        if let Some(prev) = prev {
            pen += scaled.kern(prev, glyph);
        }
        prev = Some(glyph);
        if pen - px > to {
            end = offset;
            break;
        }
        let advance = scaled.h_advance(glyph);
        if start.is_none() && pen + advance + px >= from {
            start = Some((offset, pen));
        }
        pen += advance;
    }
    let (start, pen) = start?;
    (start < end).then_some((start, end, pen))
}

pub fn encode_png(image: &RgbaImage) -> EditorResult<Vec<u8>> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(EditorError::Encode)?;
    Ok(buffer.into_inner())
}

/// Writes PNG unless the extension asks for JPEG, which has no alpha.
pub fn save_image(image: &RgbaImage, path: &Path) -> EditorResult<()> {
    let ext = path
        .extension()
        .and_then(|item| item.to_str())
        .unwrap_or("png")
        .to_ascii_lowercase();

    if ext == "jpg" || ext == "jpeg" {
        image::DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save_with_format(path, ImageFormat::Jpeg)
            .map_err(EditorError::Encode)
    } else {
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(EditorError::Encode)
    }
}

fn copy_image_to_pixmap(image: &RgbaImage, pixmap: &mut Pixmap) -> EditorResult<()> {
    if image.width() != pixmap.width() || image.height() != pixmap.height() {
        return Err(EditorError::Render(
            "source image and pixmap size mismatch".into(),
        ));
    }
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(())
}

fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut output = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in output.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    output
}

fn skia_color(color: Color) -> tiny_skia::Color {
    let [r, g, b, a] = color.0;
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    paint
}

fn fill_plate(pixmap: &mut Pixmap, object: &TextObject, bounds: Bounds, background: Color) {
    let padding = object.style.size.px() * PLATE_PADDING;
    let Some(rect) = Rect::from_xywh(
        bounds.x - padding,
        bounds.y - padding,
        bounds.width + padding * 2.0,
        bounds.height + padding,
    ) else {
        return;
    };
    let paint = paint_for(background.with_alpha(PLATE_ALPHA));
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}

fn stroke_outline(pixmap: &mut Pixmap, outline: Bounds, color: Color, dash: Option<&[f32]>) {
    let Some(rect) = Rect::from_xywh(outline.x, outline.y, outline.width, outline.height) else {
        return;
    };
    let path = PathBuilder::from_rect(rect);
    let mut stroke = Stroke {
        width: OUTLINE_WIDTH,
        ..Default::default()
    };
    stroke.dash = dash.and_then(|intervals| StrokeDash::new(intervals.to_vec(), 0.0));
    pixmap.stroke_path(&path, &paint_for(color), &stroke, Transform::identity(), None);
}
