//! Flat scenes of sprite-referencing nodes.
//!
//! A [`Composition`] is an ordered node list; the order is the draw order.
//! Nodes refer to sprites by name, so removing or renaming a sprite must be
//! forwarded with [`Composition::remove_sprite`] / [`Composition::rename_sprite`].

use crate::model::Sprite;
use kurbo::{Affine, Point, Vec2};
use std::collections::BTreeMap;

/// One placed sprite instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub position: Point,
    pub scale: Vec2,
    /// Degrees, kept in `[0, 360)` by the composition operations.
    pub rotation: f64,
    /// Referenced sprite name; `None` once the sprite is deleted.
    pub sprite: Option<String>,
    pub selected: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            position: Point::ORIGIN,
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
            sprite: None,
            selected: false,
        }
    }
}

impl Node {
    pub fn new(sprite: impl Into<String>, position: Point) -> Self {
        Self {
            position,
            sprite: Some(sprite.into()),
            ..Self::default()
        }
    }

    /// Local-to-world transform: translate · rotate · scale.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.position.to_vec2())
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
    }

    /// Whether `world` falls inside `sprite` drawn with this node's transform.
    pub fn contains(&self, world: Point, sprite: &Sprite) -> bool {
        let t = self.transform();
        if t.determinant().abs() < f64::EPSILON {
            return false;
        }
        sprite.local_bounds().contains(t.inverse() * world)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Drag { last: Point },
    Rotate { last_angle: f64 },
}

/// Ordered node list plus transient editing state (active node, selection
/// centre, in-progress gesture). Only the nodes are persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    nodes: Vec<Node>,
    active: Option<usize>,
    center: Point,
    gesture: Option<Gesture>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Direct node access. Call [`Composition::refresh_center`] after
    /// changing `position` or `selected` through it.
    pub fn node_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Appends a node on top and returns its index.
    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.refresh_center();
        self.nodes.len() - 1
    }

    /// Erases the node at `index` and clears the selection.
    pub fn remove_node(&mut self, index: usize) -> Option<Node> {
        if index >= self.nodes.len() {
            return None;
        }
        let node = self.nodes.remove(index);
        self.clear_selection();
        Some(node)
    }

    /// Selects `index`. Additive selection toggles the node and keeps the
    /// others; otherwise it becomes the only selected node.
    pub fn select(&mut self, index: usize, additive: bool) -> bool {
        if index >= self.nodes.len() {
            return false;
        }
        if additive {
            let n = &mut self.nodes[index];
            n.selected = !n.selected;
        } else {
            for (i, n) in self.nodes.iter_mut().enumerate() {
                n.selected = i == index;
            }
        }
        self.active = Some(index);
        self.refresh_center();
        true
    }

    pub fn select_all(&mut self) {
        for n in &mut self.nodes {
            n.selected = true;
        }
        self.refresh_center();
    }

    pub fn clear_selection(&mut self) {
        for n in &mut self.nodes {
            n.selected = false;
        }
        self.active = None;
        self.gesture = None;
        self.refresh_center();
    }

    pub fn selected_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.selected).count()
    }

    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.selected)
            .map(|(i, _)| i)
    }

    /// Centroid of the selected node positions (origin when nothing is selected).
    pub fn selection_center(&self) -> Point {
        self.center
    }

    pub fn refresh_center(&mut self) {
        let mut sum = Vec2::ZERO;
        let mut count = 0usize;
        for n in self.nodes.iter().filter(|n| n.selected) {
            sum += n.position.to_vec2();
            count += 1;
        }
        self.center = if count == 0 {
            Point::ORIGIN
        } else {
            (sum / count as f64).to_point()
        };
    }

    pub fn move_selected(&mut self, delta: Vec2) {
        for n in self.nodes.iter_mut().filter(|n| n.selected) {
            n.position += delta;
        }
        self.center += delta;
    }

    /// Rotates every selected node by `degrees` around the selection centre.
    pub fn rotate_selected(&mut self, degrees: f64) {
        let about = Affine::rotate_about(degrees.to_radians(), self.center);
        for n in self.nodes.iter_mut().filter(|n| n.selected) {
            n.position = about * n.position;
            n.rotation = normalize_degrees(n.rotation + degrees);
        }
    }

    /// Scales every selected node and its offset from the selection centre.
    pub fn scale_selected(&mut self, factor: Vec2) {
        let c = self.center;
        for n in self.nodes.iter_mut().filter(|n| n.selected) {
            let d = n.position - c;
            n.position = c + Vec2::new(d.x * factor.x, d.y * factor.y);
            n.scale = Vec2::new(n.scale.x * factor.x, n.scale.y * factor.y);
        }
        self.refresh_center();
    }

    /// Moves node `index` by `direction` places (positive is toward the top),
    /// clamped to the list bounds. Returns the new index.
    pub fn reorder_node(&mut self, index: usize, direction: i64) -> Option<usize> {
        if index >= self.nodes.len() {
            return None;
        }
        let last = (self.nodes.len() - 1) as i64;
        let target = (index as i64).saturating_add(direction).clamp(0, last) as usize;
        if target > index {
            self.nodes[index..=target].rotate_left(1);
        } else if target < index {
            self.nodes[target..=index].rotate_right(1);
        }
        self.active = self.active.map(|a| {
            if a == index {
                target
            } else if index < a && a <= target {
                a - 1
            } else if target <= a && a < index {
                a + 1
            } else {
                a
            }
        });
        Some(target)
    }

    /// Topmost node whose sprite contains `world`. Nodes without a sprite,
    /// or whose sprite is missing from `sprites`, are skipped.
    pub fn hit_test(&self, world: Point, sprites: &BTreeMap<String, Sprite>) -> Option<usize> {
        self.nodes.iter().enumerate().rev().find_map(|(i, n)| {
            let sprite = sprites.get(n.sprite.as_deref()?)?;
            n.contains(world, sprite).then_some(i)
        })
    }

    /// Nulls every reference to `name`; returns how many nodes changed.
    pub fn remove_sprite(&mut self, name: &str) -> usize {
        let mut count = 0;
        for n in &mut self.nodes {
            if n.sprite.as_deref() == Some(name) {
                n.sprite = None;
                count += 1;
            }
        }
        count
    }

    pub fn rename_sprite(&mut self, old: &str, new: &str) -> usize {
        let mut count = 0;
        for n in &mut self.nodes {
            if n.sprite.as_deref() == Some(old) {
                n.sprite = Some(new.to_string());
                count += 1;
            }
        }
        count
    }

    pub fn begin_drag(&mut self, cursor: Point) {
        self.gesture = Some(Gesture::Drag { last: cursor });
    }

    /// Moves the selection by the cursor motion since the previous call.
    pub fn drag_to(&mut self, cursor: Point) -> bool {
        let Some(Gesture::Drag { last }) = self.gesture else {
            return false;
        };
        self.move_selected(cursor - last);
        self.gesture = Some(Gesture::Drag { last: cursor });
        true
    }

    pub fn end_drag(&mut self) {
        if matches!(self.gesture, Some(Gesture::Drag { .. })) {
            self.gesture = None;
        }
    }

    pub fn begin_rotate(&mut self, cursor: Point) {
        let last_angle = self.cursor_angle(cursor);
        self.gesture = Some(Gesture::Rotate { last_angle });
    }

    /// Rotates the selection by the cursor's angular motion around the
    /// selection centre.
    pub fn rotate_to(&mut self, cursor: Point) -> bool {
        let Some(Gesture::Rotate { last_angle }) = self.gesture else {
            return false;
        };
        let angle = self.cursor_angle(cursor);
        self.rotate_selected(angle - last_angle);
        self.gesture = Some(Gesture::Rotate { last_angle: angle });
        true
    }

    pub fn end_rotate(&mut self) {
        if matches!(self.gesture, Some(Gesture::Rotate { .. })) {
            self.gesture = None;
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Some(Gesture::Drag { .. }))
    }

    pub fn is_rotating(&self) -> bool {
        matches!(self.gesture, Some(Gesture::Rotate { .. }))
    }

    fn cursor_angle(&self, cursor: Point) -> f64 {
        (cursor - self.center).angle().to_degrees()
    }
}

/// Maps any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if r >= 360.0 { 0.0 } else { r }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn names(c: &Composition) -> Vec<&str> {
        c.nodes()
            .iter()
            .map(|n| n.sprite.as_deref().unwrap_or("-"))
            .collect()
    }

    fn abcd() -> Composition {
        let mut c = Composition::new();
        for s in ["A", "B", "C", "D"] {
            c.add_node(Node::new(s, Point::ORIGIN));
        }
        c
    }

    #[test]
    fn reorder_rotates_subrange() {
        let mut c = abcd();
        assert_eq!(c.reorder_node(0, 1), Some(1));
        assert_eq!(names(&c), ["B", "A", "C", "D"]);

        let mut c = abcd();
        assert_eq!(c.reorder_node(3, -10000), Some(0));
        assert_eq!(names(&c), ["D", "A", "B", "C"]);

        let mut c = abcd();
        assert_eq!(c.reorder_node(1, i64::MAX), Some(3));
        assert_eq!(names(&c), ["A", "C", "D", "B"]);
        assert_eq!(c.reorder_node(4, 1), None);
    }

    #[test]
    fn active_follows_reorder() {
        let mut c = abcd();
        c.select(2, false);
        c.reorder_node(2, -2);
        assert_eq!(c.active(), Some(0));
        c.select(3, false);
        c.reorder_node(0, 1);
        assert_eq!(c.active(), Some(3));
        c.reorder_node(1, 5);
        assert_eq!(c.active(), Some(2));
    }

    #[test]
    fn selection_center_tracks_selection() {
        let mut c = Composition::new();
        c.add_node(Node::new("a", Point::new(0.0, 0.0)));
        c.add_node(Node::new("b", Point::new(10.0, 0.0)));
        c.add_node(Node::new("c", Point::new(10.0, 10.0)));
        c.select(0, false);
        c.select(1, true);
        assert_eq!(c.selection_center(), Point::new(5.0, 0.0));
        c.select(1, true);
        assert_eq!(c.selected_count(), 1);
        assert_eq!(c.selection_center(), Point::ORIGIN);
        c.select_all();
        assert_eq!(c.selected_count(), 3);
        c.remove_node(0);
        assert_eq!(c.selected_count(), 0);
        assert_eq!(c.active(), None);
    }

    #[test]
    fn rotate_about_centroid() {
        let mut c = Composition::new();
        c.add_node(Node::new("a", Point::new(-1.0, 0.0)));
        c.add_node(Node::new("b", Point::new(1.0, 0.0)));
        c.select_all();
        c.rotate_selected(90.0);
        let a = c.node(0).unwrap();
        assert!((a.position - Point::new(0.0, -1.0)).hypot() < 1e-9);
        assert_eq!(a.rotation, 90.0);
        c.rotate_selected(-180.0);
        assert_eq!(c.node(1).unwrap().rotation, 270.0);
        c.rotate_selected(450.0);
        assert_eq!(c.node(1).unwrap().rotation, 0.0);
    }

    #[test]
    fn tiny_negative_rotation_stays_below_360() {
        let mut c = Composition::new();
        c.add_node(Node::new("a", Point::ORIGIN));
        c.select_all();
        c.rotate_selected(-1e-15);
        let r = c.node(0).unwrap().rotation;
        assert!((0.0..360.0).contains(&r), "rotation {r}");
        assert_eq!(normalize_degrees(-720.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
    }

    #[test]
    fn scale_about_centroid() {
        let mut c = Composition::new();
        c.add_node(Node::new("a", Point::new(0.0, 0.0)));
        c.add_node(Node::new("b", Point::new(4.0, 2.0)));
        c.select_all();
        c.scale_selected(Vec2::new(2.0, 0.5));
        assert_eq!(c.node(0).unwrap().position, Point::new(-2.0, 0.5));
        assert_eq!(c.node(1).unwrap().position, Point::new(6.0, 1.5));
        assert_eq!(c.node(1).unwrap().scale, Vec2::new(2.0, 0.5));
        assert_eq!(c.selection_center(), Point::new(2.0, 1.0));
    }

    #[test]
    fn hit_test_prefers_topmost_and_skips_null() {
        let mut sprites = BTreeMap::new();
        let mut s = Sprite::new(RgbaImage::new(10, 10));
        s.origin_a = (5, 5);
        sprites.insert("s".to_string(), s);

        let mut c = Composition::new();
        c.add_node(Node::new("s", Point::new(0.0, 0.0)));
        c.add_node(Node::new("s", Point::new(4.0, 0.0)));
        c.add_node(Node {
            position: Point::new(0.0, 0.0),
            ..Node::default()
        });
        assert_eq!(c.hit_test(Point::new(1.0, 0.0), &sprites), Some(1));
        assert_eq!(c.hit_test(Point::new(-4.0, 0.0), &sprites), Some(0));
        assert_eq!(c.hit_test(Point::new(20.0, 0.0), &sprites), None);

        // rotated and stretched: local x maps onto world y
        let n = c.node_mut(0).unwrap();
        n.rotation = 90.0;
        n.scale = Vec2::new(3.0, 1.0);
        assert!(c.node(0).unwrap().contains(Point::new(0.0, -14.0), &sprites["s"]));
        assert!(!c.node(0).unwrap().contains(Point::new(-6.0, 0.0), &sprites["s"]));
    }

    #[test]
    fn degenerate_scale_never_hits() {
        let s = Sprite::new(RgbaImage::new(4, 4));
        let mut n = Node::new("s", Point::ORIGIN);
        n.scale = Vec2::new(0.0, 1.0);
        assert!(!n.contains(Point::ORIGIN, &s));
    }

    #[test]
    fn sprite_references() {
        let mut c = abcd();
        c.add_node(Node::new("A", Point::ORIGIN));
        assert_eq!(c.remove_sprite("A"), 2);
        assert_eq!(c.len(), 5);
        assert_eq!(names(&c), ["-", "B", "C", "D", "-"]);
        assert_eq!(c.rename_sprite("B", "E"), 1);
        assert_eq!(c.node(1).unwrap().sprite.as_deref(), Some("E"));
    }

    #[test]
    fn drag_and_rotate_sessions() {
        let mut c = Composition::new();
        c.add_node(Node::new("a", Point::new(10.0, 0.0)));
        c.select(0, false);
        assert!(!c.drag_to(Point::new(1.0, 1.0)));
        c.begin_drag(Point::new(0.0, 0.0));
        assert!(c.drag_to(Point::new(2.0, 3.0)));
        assert!(c.drag_to(Point::new(5.0, 3.0)));
        c.end_drag();
        assert!(!c.is_dragging());
        assert_eq!(c.node(0).unwrap().position, Point::new(15.0, 3.0));
        assert_eq!(c.selection_center(), Point::new(15.0, 3.0));

        c.begin_rotate(Point::new(16.0, 3.0));
        assert!(c.is_rotating());
        assert!(c.rotate_to(Point::new(15.0, 4.0)));
        c.end_rotate();
        let n = c.node(0).unwrap();
        assert!((n.rotation - 90.0).abs() < 1e-9);
        assert!((n.position - Point::new(15.0, 3.0)).hypot() < 1e-9);
    }
}
