//! Incremental dirty-rectangle renderer.
//!
//! Every drawn shape keeps a copy of the raster pixels it covered. A change
//! to a set of seed shapes is repainted in four steps:
//!
//! 1. plan: collect every shape whose update rectangle overlaps a seed (the
//!    seed's rectangle grown by the motion), then everything overlapping
//!    those, transitively;
//! 2. erase: restore saved backgrounds, topmost first;
//! 3. draw: save fresh backgrounds and paint, bottommost first;
//! 4. publish the touched area to the screen.
//!
//! Restoring in reverse paint order leaves the raster exactly as it was
//! before the bottommost affected shape was drawn.

use crate::paint::paint_shape;
use crate::surface::{Background, Surface};
use fc_core::config::EngineConfig;
use fc_core::elements::Elements;
use fc_core::error::CanvasError;
use fc_core::geometry::{Delta, Rect};
use fc_core::id::ShapeId;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use std::collections::HashMap;

/// Shapes touched by a change to `seeds` moving by `delta`, topmost first.
pub fn affected_set(elements: &Elements, seeds: &[ShapeId], delta: Delta, config: &EngineConfig) -> Vec<ShapeId> {
    let d = delta.abs();
    let rects: Vec<(ShapeId, Rect)> = elements.iter().map(|s| (s.id, s.update_rect(config))).collect();

    // Node 0 stands for "the change"; it links to everything the grown
    // seed rectangles touch. Shape-to-shape edges use plain rectangles.
    let mut graph: UnGraph<Option<ShapeId>, ()> = UnGraph::default();
    let change = graph.add_node(None);
    let nodes: Vec<NodeIndex> = rects.iter().map(|(id, _)| graph.add_node(Some(*id))).collect();

    for i in 0..rects.len() {
        for j in i + 1..rects.len() {
            if rects[i].1.intersects(&rects[j].1) {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }
    for seed in seeds {
        let Some(i) = rects.iter().position(|(id, _)| id == seed) else {
            continue;
        };
        graph.add_edge(change, nodes[i], ());
        let grown = rects[i].1.grow(d.dx, d.dy);
        for (j, (_, r)) in rects.iter().enumerate() {
            if j != i && grown.intersects(r) {
                graph.add_edge(change, nodes[j], ());
            }
        }
    }

    let mut reached = Vec::new();
    let mut bfs = Bfs::new(&graph, change);
    while let Some(n) = bfs.next(&graph) {
        if let Some(id) = graph[n] {
            reached.push(id);
        }
    }
    elements.sorted_by_z(reached)
}

pub struct Renderer {
    surface: Surface,
    backgrounds: HashMap<ShapeId, Background>,
}

impl Renderer {
    pub fn new(config: &EngineConfig) -> Result<Self, CanvasError> {
        Ok(Self {
            surface: Surface::new(config.surface)?,
            backgrounds: HashMap::new(),
        })
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn has_background(&self, id: ShapeId) -> bool {
        self.backgrounds.contains_key(&id)
    }

    /// Drop the saved background of `id` without restoring it. Used when a
    /// shape leaves the surface, so a stale copy is never pasted back.
    pub fn cancel_background(&mut self, id: ShapeId) {
        self.backgrounds.remove(&id);
    }

    /// Restore saved backgrounds of `ids` (topmost first).
    pub fn erase(&mut self, elements: &Elements, ids: &[ShapeId], delta: Delta, config: &EngineConfig) {
        let d = delta.abs();
        for &id in ids {
            let Some(shape) = elements.get(id) else { continue };
            if !self.surface.on_screen(shape.update_rect(config).grow(d.dx, d.dy)) {
                continue;
            }
            if let Some(bg) = self.backgrounds.remove(&id) {
                log::trace!("erase {id} {:?}", bg.rect);
                self.surface.restore(&bg);
            }
        }
    }

    /// Paint `ids` (given topmost first) bottom to top, saving what each
    /// one covers.
    pub fn draw(&mut self, elements: &Elements, ids: &[ShapeId], config: &EngineConfig) {
        for &id in ids.iter().rev() {
            let Some(shape) = elements.get(id) else { continue };
            let area = shape.update_rect(config);
            if !self.surface.on_screen(area) {
                continue;
            }
            match self.surface.capture(area) {
                Some(bg) => {
                    self.backgrounds.insert(id, bg);
                }
                None => {
                    self.backgrounds.remove(&id);
                }
            }
            paint_shape(self.surface.raster_mut(), shape, config);
        }
    }

    /// Publish the area of `ids`, grown by the motion, to the screen.
    pub fn update_screen(&mut self, elements: &Elements, ids: &[ShapeId], delta: Delta, config: &EngineConfig) {
        let d = delta.abs();
        for &id in ids {
            if let Some(shape) = elements.get(id) {
                self.surface.copy_to_screen(shape.update_rect(config).grow(d.dx, d.dy));
            }
        }
    }

    /// Repaint everything affected by a change to `seeds` that already
    /// happened with no geometry change (selection, anchors, style).
    pub fn redraw(&mut self, elements: &mut Elements, seeds: &[ShapeId], delta: Delta, config: &EngineConfig) {
        self.redraw_with(elements, seeds, delta, config, |_| ());
    }

    /// Erase what `seeds` affect, apply `change`, then draw and publish.
    /// Shapes removed by `change` are erased and not redrawn.
    pub fn redraw_with<R>(
        &mut self,
        elements: &mut Elements,
        seeds: &[ShapeId],
        delta: Delta,
        config: &EngineConfig,
        change: impl FnOnce(&mut Elements) -> R,
    ) -> R {
        let affected = affected_set(elements, seeds, delta, config);
        let d = delta.abs();
        let before: Vec<Rect> = affected
            .iter()
            .filter_map(|&id| elements.get(id))
            .map(|s| s.update_rect(config).grow(d.dx, d.dy))
            .collect();
        log::trace!("redraw {} shape(s) for {seeds:?}", affected.len());

        self.erase(elements, &affected, delta, config);
        let result = change(elements);
        for &id in &affected {
            if !elements.contains(id) {
                self.backgrounds.remove(&id);
            }
        }

        // The change may have added shapes (paste, undo of delete).
        let drawn = affected_set(elements, seeds, Delta::ZERO, config);
        let mut order = affected;
        for id in drawn {
            if !order.contains(&id) {
                order.push(id);
            }
        }
        let order = elements.sorted_by_z(order);
        self.erase(elements, &order, Delta::ZERO, config);
        self.draw(elements, &order, config);

        for r in before {
            self.surface.copy_to_screen(r);
        }
        self.update_screen(elements, &order, delta, config);
        result
    }

    /// Full repaint: grid, then every shape bottom to top.
    pub fn draw_all(&mut self, elements: &Elements, config: &EngineConfig) {
        self.surface.clear();
        self.backgrounds.clear();
        let ids: Vec<ShapeId> = elements.ids().to_vec();
        self.draw(elements, &ids, config);
        self.surface.copy_all_to_screen();
    }

    pub fn resize(&mut self, width: u32, height: u32, elements: &Elements, config: &EngineConfig) -> Result<(), CanvasError> {
        self.surface.resize(width, height)?;
        self.draw_all(elements, config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::config::SurfaceConfig;
    use fc_core::model::{Color, Shape, ShapeKind};
    use pretty_assertions::assert_eq;

    fn config() -> EngineConfig {
        EngineConfig {
            surface: SurfaceConfig {
                width: 300,
                height: 200,
                ..SurfaceConfig::default()
            },
            ..EngineConfig::default()
        }
    }

    fn filled(x: i32, y: i32, w: i32, h: i32, fill: Color) -> Shape {
        let mut s = Shape::new(ShapeKind::Box, Rect::new(x, y, w, h));
        s.style.fill = fill;
        s
    }

    #[test]
    fn closure_follows_overlap_chain() {
        let config = config();
        let mut els = Elements::new();
        let a = filled(0, 0, 40, 40, Color::RED);
        let b = filled(30, 0, 40, 40, Color::RED);
        let c = filled(60, 0, 40, 40, Color::RED);
        let far = filled(200, 0, 40, 40, Color::RED);
        let ids = [a.id, b.id, c.id, far.id];
        for s in [a, b, c, far] {
            els.insert(s).unwrap();
        }
        let set = affected_set(&els, &[ids[0]], Delta::ZERO, &config);
        assert_eq!(set, vec![ids[2], ids[1], ids[0]]);

        let moving = affected_set(&els, &[ids[0]], Delta::new(160, 0), &config);
        assert_eq!(moving, vec![ids[3], ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn move_restores_old_area() {
        let config = config();
        let mut els = Elements::new();
        let b = filled(10, 10, 40, 40, Color::RED);
        let id = b.id;
        els.insert(b).unwrap();
        let mut r = Renderer::new(&config).unwrap();
        r.draw_all(&els, &config);
        assert_eq!(r.surface().screen_pixel(30, 30), Some(Color::RED));

        let d = Delta::new(100, 0);
        r.redraw_with(&mut els, &[id], d, &config, |els| {
            els.translate(id, d, false);
        });
        assert_eq!(r.surface().pixel(30, 30), Some(Color::WHITE));
        assert_eq!(r.surface().screen_pixel(30, 30), Some(Color::WHITE));
        assert_eq!(r.surface().screen_pixel(130, 30), Some(Color::RED));
    }

    #[test]
    fn moving_lower_shape_keeps_upper_on_top() {
        let config = config();
        let mut els = Elements::new();
        let low = filled(10, 10, 60, 60, Color::RED);
        let high = filled(40, 40, 60, 60, Color::BLUE);
        let low_id = low.id;
        els.insert(low).unwrap();
        els.insert(high).unwrap();
        let mut r = Renderer::new(&config).unwrap();
        r.draw_all(&els, &config);

        let d = Delta::new(5, 5);
        r.redraw_with(&mut els, &[low_id], d, &config, |els| {
            els.translate(low_id, d, false);
        });
        assert_eq!(r.surface().screen_pixel(60, 60), Some(Color::BLUE));
        assert_eq!(r.surface().screen_pixel(20, 20), Some(Color::RED));
        // Uncovered strip of the old position shows the canvas again.
        assert_eq!(r.surface().screen_pixel(12, 40), Some(Color::WHITE));
    }

    #[test]
    fn redraw_is_stable_without_change() {
        let config = config();
        let mut els = Elements::new();
        let b = filled(10, 10, 60, 60, Color::RED);
        let id = b.id;
        els.insert(b).unwrap();
        let mut r = Renderer::new(&config).unwrap();
        r.draw_all(&els, &config);
        let before = r.surface().raster().clone();
        r.redraw(&mut els, &[id], Delta::ZERO, &config);
        assert!(before == *r.surface().raster());
    }

    #[test]
    fn removed_shape_is_erased() {
        let config = config();
        let mut els = Elements::new();
        let b = filled(10, 10, 40, 40, Color::RED);
        let id = b.id;
        els.insert(b).unwrap();
        let mut r = Renderer::new(&config).unwrap();
        r.draw_all(&els, &config);
        r.redraw_with(&mut els, &[id], Delta::ZERO, &config, |els| els.remove(id));
        assert_eq!(r.surface().screen_pixel(30, 30), Some(Color::WHITE));
        assert!(!r.has_background(id));
    }

    #[test]
    fn off_screen_shapes_keep_no_background() {
        let config = config();
        let mut els = Elements::new();
        let b = filled(500, 500, 40, 40, Color::RED);
        let id = b.id;
        els.insert(b).unwrap();
        let mut r = Renderer::new(&config).unwrap();
        r.draw_all(&els, &config);
        assert!(!r.has_background(id));
    }
}
