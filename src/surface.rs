use std::sync::Arc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::annotation::{Color, Point, Size};

/// Where the surface is shown on screen, in display units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// The pixel buffer the editor presents. Dimensions always follow the bitmap.
#[derive(Clone, Debug)]
pub struct Surface {
    bitmap: Arc<RgbaImage>,
}

impl Surface {
    pub fn blank(width: u32, height: u32, fill: Color) -> Self {
        Self {
            bitmap: Arc::new(RgbaImage::from_pixel(
                width.max(1),
                height.max(1),
                Rgba(fill.0),
            )),
        }
    }

    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width() as f32,
            height: self.height() as f32,
        }
    }

    pub fn bitmap(&self) -> &Arc<RgbaImage> {
        &self.bitmap
    }

    pub fn present(&mut self, bitmap: Arc<RgbaImage>) {
        self.bitmap = bitmap;
    }

    /// Maps a pointer position in display units to image pixels.
    pub fn to_image_space(&self, client: Point, display: DisplayRect) -> Point {
        if display.width <= 0.0 || display.height <= 0.0 {
            return client;
        }
        let scale_x = self.width() as f32 / display.width;
        let scale_y = self.height() as f32 / display.height;
        Point::new(
            (client.x - display.left) * scale_x,
            (client.y - display.top) * scale_y,
        )
    }

    /// Keeps a box of `size` at `position` inside the surface. Boxes larger
    /// than the surface stick to the top-left corner.
    pub fn clamp_position(&self, position: Point, size: Size) -> Point {
        let max_x = self.width() as f32 - size.width;
        let max_y = self.height() as f32 - size.height;
        Point::new(position.x.min(max_x).max(0.0), position.y.min(max_y).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplayRect, Surface};
    use crate::annotation::{Color, Point, Size};

    #[test]
    fn blank_surface_has_at_least_one_pixel() {
        let surface = Surface::blank(0, 0, Color::WHITE);
        assert_eq!((surface.width(), surface.height()), (1, 1));
    }

    #[test]
    fn display_coordinates_scale_to_pixels() {
        let surface = Surface::blank(200, 100, Color::WHITE);
        let display = DisplayRect {
            left: 10.0,
            top: 20.0,
            width: 100.0,
            height: 50.0,
        };
        let point = surface.to_image_space(Point::new(60.0, 45.0), display);
        assert_eq!(point, Point::new(100.0, 50.0));
    }

    #[test]
    fn clamp_keeps_box_inside() {
        let surface = Surface::blank(100, 100, Color::WHITE);
        let size = Size {
            width: 30.0,
            height: 10.0,
        };
        assert_eq!(
            surface.clamp_position(Point::new(90.0, -5.0), size),
            Point::new(70.0, 0.0)
        );
        let huge = Size {
            width: 300.0,
            height: 300.0,
        };
        assert_eq!(
            surface.clamp_position(Point::new(40.0, 40.0), huge),
            Point::new(0.0, 0.0)
        );
    }
}
