use super::{Packer, Score};
use crate::config::MaxRectsHeuristic;
use crate::model::Rect;

/// MaxRects bin: a list of maximal free rectangles that shrinks as
/// rectangles are placed. Placements never rotate.
#[derive(Debug, Clone)]
pub struct MaxRectsPacker {
    border: Rect,
    free: Vec<Rect>,
    used: Vec<Rect>,
    heuristic: MaxRectsHeuristic,
}

impl MaxRectsPacker {
    pub fn new(width: u32, height: u32, heuristic: MaxRectsHeuristic) -> Self {
        let border = Rect::new(0, 0, width, height);
        let free = if border.w > 0 && border.h > 0 {
            vec![border]
        } else {
            Vec::new()
        };
        Self {
            border,
            free,
            used: Vec::new(),
            heuristic,
        }
    }

    pub fn heuristic(&self) -> MaxRectsHeuristic {
        self.heuristic
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }

    pub fn free_rects(&self) -> &[Rect] {
        &self.free
    }

    pub fn used_rects(&self) -> &[Rect] {
        &self.used
    }

    /// Used area divided by the bin area.
    pub fn occupancy(&self) -> f64 {
        let bin = self.border.area();
        if bin == 0 {
            return 0.0;
        }
        let used: u64 = self.used.iter().map(Rect::area).sum();
        used as f64 / bin as f64
    }

    fn split_free(&mut self, node: &Rect) {
        let mut new_free: Vec<Rect> = Vec::with_capacity(self.free.len() + 4);
        for fr in self.free.iter() {
            if !fr.intersects(node) {
                new_free.push(*fr);
                continue;
            }
            // above
            if node.y > fr.y {
                new_free.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
            }
            // below
            if node.bottom() < fr.bottom() {
                new_free.push(Rect::new(fr.x, node.bottom(), fr.w, fr.bottom() - node.bottom()));
            }
            // left
            if node.x > fr.x {
                new_free.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
            }
            // right
            if node.right() < fr.right() {
                new_free.push(Rect::new(node.right(), fr.y, fr.right() - node.right(), fr.h));
            }
        }
        self.free = new_free;
        self.prune_free_list();
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let a = self.free[i];
            let mut remove_i = false;
            let mut j = i + 1;
            while j < self.free.len() {
                let b = self.free[j];
                if b.contains(&a) {
                    remove_i = true;
                    break;
                }
                if a.contains(&b) {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn score(&self, fr: &Rect, w: u32, h: u32) -> Score {
        let leftover_h = i64::from(fr.w) - i64::from(w);
        let leftover_v = i64::from(fr.h) - i64::from(h);
        let short_fit = leftover_h.min(leftover_v);
        let long_fit = leftover_h.max(leftover_v);
        let area_fit = fr.area() as i64 - (u64::from(w) * u64::from(h)) as i64;
        match self.heuristic {
            MaxRectsHeuristic::BestShortSideFit => (short_fit, long_fit),
            MaxRectsHeuristic::BestLongSideFit => (long_fit, short_fit),
            MaxRectsHeuristic::BestAreaFit => (area_fit, short_fit),
            MaxRectsHeuristic::BottomLeft => (i64::from(fr.y + h), i64::from(fr.x)),
            MaxRectsHeuristic::ContactPoint => {
                // higher contact is better
                let contact = self.contact_point_score(fr.x, fr.y, w, h);
                (-i64::from(contact), area_fit)
            }
        }
    }

    fn contact_point_score(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        let node = Rect::new(x, y, w, h);
        let mut score = 0u32;
        if node.x == self.border.x {
            score += node.h;
        }
        if node.y == self.border.y {
            score += node.w;
        }
        if node.right() == self.border.right() {
            score += node.h;
        }
        if node.bottom() == self.border.bottom() {
            score += node.w;
        }
        for u in &self.used {
            if node.x == u.right() || u.x == node.right() {
                score += overlap_1d(node.y, node.bottom(), u.y, u.bottom());
            }
            if node.y == u.bottom() || u.y == node.bottom() {
                score += overlap_1d(node.x, node.right(), u.x, u.right());
            }
        }
        score
    }
}

fn overlap_1d(a1: u32, a2: u32, b1: u32, b2: u32) -> u32 {
    let start = a1.max(b1);
    let end = a2.min(b2);
    end.saturating_sub(start)
}

impl Packer for MaxRectsPacker {
    fn find_position(&self, w: u32, h: u32) -> Option<(Score, Rect)> {
        if w == 0 || h == 0 {
            return None;
        }
        let mut best: Option<(Score, Rect)> = None;
        for fr in &self.free {
            if fr.w < w || fr.h < h {
                continue;
            }
            let s = self.score(fr, w, h);
            let better = match &best {
                None => true,
                Some((bs, br)) => s < *bs || (s == *bs && (fr.y, fr.x) < (br.y, br.x)),
            };
            if better {
                best = Some((s, Rect::new(fr.x, fr.y, w, h)));
            }
        }
        best
    }

    fn place(&mut self, node: Rect) {
        debug_assert!(self.border.contains(&node));
        self.split_free(&node);
        self.used.push(node);
    }
}
