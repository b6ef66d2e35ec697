//! Drawing surface: an off-screen raster plus the visible screen.
//!
//! Shapes are painted into the raster; `copy_to_screen` publishes a
//! rectangle of it. Both are CPU pixmaps.

use fc_core::config::SurfaceConfig;
use fc_core::error::CanvasError;
use fc_core::geometry::Rect;
use fc_core::model::Color;
use tiny_skia::{BlendMode, IntRect, Paint, Pixmap, PixmapPaint, Transform};

/// Pixels saved from under a shape before it was drawn.
#[derive(Debug, Clone)]
pub struct Background {
    pub rect: Rect,
    pixels: Pixmap,
}

impl Background {
    pub fn pixels(&self) -> &Pixmap {
        &self.pixels
    }
}

pub struct Surface {
    raster: Pixmap,
    screen: Pixmap,
    config: SurfaceConfig,
}

fn allocate(width: u32, height: u32) -> Result<Pixmap, CanvasError> {
    Pixmap::new(width, height).ok_or(CanvasError::InvalidSurface { width, height })
}

fn int_rect(r: Rect) -> Option<IntRect> {
    if r.width <= 0 || r.height <= 0 {
        return None;
    }
    IntRect::from_xywh(r.x, r.y, r.width as u32, r.height as u32)
}

pub(crate) fn skia_color(c: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

impl Surface {
    pub fn new(config: SurfaceConfig) -> Result<Self, CanvasError> {
        let mut surface = Self {
            raster: allocate(config.width, config.height)?,
            screen: allocate(config.width, config.height)?,
            config,
        };
        surface.clear();
        Ok(surface)
    }

    pub fn width(&self) -> i32 {
        self.raster.width() as i32
    }

    pub fn height(&self) -> i32 {
        self.raster.height() as i32
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width(), self.height())
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Replace both pixmaps with blank ones of the new size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CanvasError> {
        self.raster = allocate(width, height)?;
        self.screen = allocate(width, height)?;
        self.config.width = width;
        self.config.height = height;
        self.clear();
        Ok(())
    }

    /// Intersection of `r` with the surface, if any.
    pub fn clip(&self, r: Rect) -> Option<Rect> {
        r.intersection(&self.bounds())
    }

    /// Whether any part of a non-empty `r` lies on the surface.
    pub fn on_screen(&self, r: Rect) -> bool {
        r.x < self.width() && r.y < self.height() && r.x + r.width >= 0 && r.y + r.height >= 0 && r.width > 0 && r.height > 0
    }

    /// Background fill plus grid.
    pub fn clear(&mut self) {
        self.raster.fill(skia_color(self.config.background));
        let spacing = self.config.grid_spacing as i32;
        if spacing > 0 {
            let mut paint = Paint::default();
            paint.set_color(skia_color(self.config.grid_color));
            paint.anti_alias = false;
            let (w, h) = (self.width() as f32, self.height() as f32);
            for x in (0..self.width()).step_by(spacing as usize) {
                if let Some(line) = tiny_skia::Rect::from_xywh(x as f32, 0.0, 1.0, h) {
                    self.raster.fill_rect(line, &paint, Transform::identity(), None);
                }
            }
            for y in (0..self.height()).step_by(spacing as usize) {
                if let Some(line) = tiny_skia::Rect::from_xywh(0.0, y as f32, w, 1.0) {
                    self.raster.fill_rect(line, &paint, Transform::identity(), None);
                }
            }
        }
        self.screen.fill(tiny_skia::Color::TRANSPARENT);
    }

    /// Save the raster pixels under `r` (clipped). `None` when nothing of
    /// `r` is on the surface.
    pub fn capture(&self, r: Rect) -> Option<Background> {
        let clipped = self.clip(r)?;
        let pixels = self.raster.clone_rect(int_rect(clipped)?)?;
        Some(Background { rect: clipped, pixels })
    }

    /// Put saved pixels back, replacing whatever is there.
    pub fn restore(&mut self, background: &Background) {
        let paint = PixmapPaint {
            blend_mode: BlendMode::Source,
            ..PixmapPaint::default()
        };
        self.raster.draw_pixmap(
            background.rect.x,
            background.rect.y,
            background.pixels.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }

    /// Publish the raster pixels under `r` to the screen.
    pub fn copy_to_screen(&mut self, r: Rect) {
        let Some(clipped) = self.clip(r) else { return };
        let Some(pixels) = int_rect(clipped).and_then(|ir| self.raster.clone_rect(ir)) else {
            return;
        };
        let paint = PixmapPaint {
            blend_mode: BlendMode::Source,
            ..PixmapPaint::default()
        };
        self.screen
            .draw_pixmap(clipped.x, clipped.y, pixels.as_ref(), &paint, Transform::identity(), None);
    }

    pub fn copy_all_to_screen(&mut self) {
        self.copy_to_screen(self.bounds());
    }

    pub fn raster(&self) -> &Pixmap {
        &self.raster
    }

    pub fn raster_mut(&mut self) -> &mut Pixmap {
        &mut self.raster
    }

    pub fn screen(&self) -> &Pixmap {
        &self.screen
    }

    /// Raster pixel at (`x`, `y`), demultiplied.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        read(&self.raster, x, y)
    }

    pub fn screen_pixel(&self, x: i32, y: i32) -> Option<Color> {
        read(&self.screen, x, y)
    }
}

fn read(pixmap: &Pixmap, x: i32, y: i32) -> Option<Color> {
    if x < 0 || y < 0 {
        return None;
    }
    let p = pixmap.pixel(x as u32, y as u32)?.demultiply();
    Some(Color {
        r: p.red(),
        g: p.green(),
        b: p.blue(),
        a: p.alpha(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small() -> Surface {
        Surface::new(SurfaceConfig {
            width: 100,
            height: 80,
            ..SurfaceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = Surface::new(SurfaceConfig {
            width: 0,
            ..SurfaceConfig::default()
        });
        assert!(matches!(err, Err(CanvasError::InvalidSurface { width: 0, .. })));
    }

    #[test]
    fn grid_lines_every_spacing() {
        let s = small();
        assert_eq!(s.pixel(0, 5), Some(Color::LIGHT_BLUE));
        assert_eq!(s.pixel(32, 5), Some(Color::LIGHT_BLUE));
        assert_eq!(s.pixel(5, 64), Some(Color::LIGHT_BLUE));
        assert_eq!(s.pixel(5, 5), Some(Color::WHITE));
    }

    #[test]
    fn on_screen_matches_edges() {
        let s = small();
        assert!(s.on_screen(Rect::new(-10, -10, 10, 10)));
        assert!(!s.on_screen(Rect::new(100, 0, 10, 10)));
        assert!(!s.on_screen(Rect::new(-11, 0, 10, 10)));
        assert!(!s.on_screen(Rect::new(10, 10, 0, 10)));
    }

    #[test]
    fn capture_then_restore_brings_pixels_back() {
        let mut s = small();
        let bg = s.capture(Rect::new(-5, -5, 20, 20)).unwrap();
        assert_eq!(bg.rect, Rect::new(0, 0, 15, 15));
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 0, 0, 255);
        let r = tiny_skia::Rect::from_xywh(0.0, 0.0, 15.0, 15.0).unwrap();
        s.raster_mut().fill_rect(r, &paint, Transform::identity(), None);
        assert_eq!(s.pixel(5, 5), Some(Color::RED));
        s.restore(&bg);
        assert_eq!(s.pixel(5, 5), Some(Color::WHITE));
        assert_eq!(s.pixel(0, 5), Some(Color::LIGHT_BLUE));
    }

    #[test]
    fn capture_off_surface_is_none() {
        let s = small();
        assert!(s.capture(Rect::new(200, 200, 10, 10)).is_none());
    }

    #[test]
    fn screen_only_changes_on_copy() {
        let mut s = small();
        assert_eq!(s.screen_pixel(5, 5).map(|c| c.a), Some(0));
        s.copy_to_screen(Rect::new(0, 0, 10, 10));
        assert_eq!(s.screen_pixel(5, 5), Some(Color::WHITE));
        assert_eq!(s.screen_pixel(50, 50).map(|c| c.a), Some(0));
    }
}
