use std::collections::HashMap;

// fraction of the remaining distance covered per frame
const SCROLL_LERP: f32 = 0.25;

/// Laid-out position of one item row, in content coordinates (no scroll
/// offset applied).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub y: i32,
    pub h: i32,
}

/// Scroll synchronizer for the cart grid.
///
/// The renderer registers every item's slot each frame; `scroll_to` centers
/// a registered slot in the view by retargeting a smoothed offset. Indices
/// without a registered slot (list not laid out yet, or stale after a
/// re-render) are silently ignored.
pub struct Viewport {
    slots: HashMap<usize, Slot>,
    offset: f32,
    target: f32,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            offset: 0.0,
            target: 0.0,
        }
    }

    /// Drop all registrations. Called whenever the backing list is re-laid
    /// out; old handles must not survive a re-render.
    pub fn begin_layout(&mut self) {
        self.slots.clear();
    }

    pub fn register(&mut self, index: usize, slot: Slot) {
        self.slots.insert(index, slot);
    }

    /// Request a centered scroll to the given item. Missing slot is a no-op.
    pub fn scroll_to(&mut self, index: usize, view_h: i32) {
        let Some(slot) = self.slots.get(&index) else {
            return;
        };
        let center = slot.y as f32 + slot.h as f32 / 2.0;
        let raw = center - view_h as f32 / 2.0;
        self.target = raw.clamp(0.0, self.max_offset(view_h));
    }

    /// Snap back to the top, e.g. when the list contents change.
    pub fn reset(&mut self) {
        self.offset = 0.0;
        self.target = 0.0;
    }

    /// Advance the smooth scroll one frame.
    pub fn tick(&mut self) {
        let remaining = self.target - self.offset;
        if remaining.abs() < 0.5 {
            self.offset = self.target;
        } else {
            self.offset += remaining * SCROLL_LERP;
        }
    }

    pub fn offset(&self) -> i32 {
        self.offset.round() as i32
    }

    fn max_offset(&self, view_h: i32) -> f32 {
        let bottom = self.slots.values().map(|s| s.y + s.h).max().unwrap_or(0);
        ((bottom - view_h) as f32).max(0.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(vp: &mut Viewport, rows: usize, row_h: i32) {
        vp.begin_layout();
        for i in 0..rows {
            vp.register(i, Slot { y: i as i32 * row_h, h: row_h });
        }
    }

    #[test]
    fn unregistered_index_is_a_no_op() {
        let mut vp = Viewport::new();
        grid(&mut vp, 3, 100);
        vp.scroll_to(42, 200);
        vp.tick();
        assert_eq!(vp.offset(), 0);
    }

    #[test]
    fn centers_the_requested_slot() {
        let mut vp = Viewport::new();
        grid(&mut vp, 10, 100);
        // slot 5: y=500, center 550; view 200 -> target 450
        vp.scroll_to(5, 200);
        for _ in 0..100 {
            vp.tick();
        }
        assert_eq!(vp.offset(), 450);
    }

    #[test]
    fn clamps_at_both_ends() {
        let mut vp = Viewport::new();
        grid(&mut vp, 10, 100);
        vp.scroll_to(0, 200);
        for _ in 0..100 {
            vp.tick();
        }
        assert_eq!(vp.offset(), 0);

        // content is 1000 tall, view 200 -> max offset 800
        vp.scroll_to(9, 200);
        for _ in 0..100 {
            vp.tick();
        }
        assert_eq!(vp.offset(), 800);
    }

    #[test]
    fn tick_approaches_smoothly_then_snaps() {
        let mut vp = Viewport::new();
        grid(&mut vp, 10, 100);
        vp.scroll_to(5, 200);
        vp.tick();
        let first = vp.offset();
        assert!(first > 0 && first < 450);
        vp.tick();
        assert!(vp.offset() > first);
    }

    #[test]
    fn begin_layout_invalidates_old_slots() {
        let mut vp = Viewport::new();
        grid(&mut vp, 10, 100);
        vp.begin_layout();
        vp.scroll_to(5, 200);
        for _ in 0..100 {
            vp.tick();
        }
        assert_eq!(vp.offset(), 0);
    }

    #[test]
    fn reset_snaps_to_top() {
        let mut vp = Viewport::new();
        grid(&mut vp, 10, 100);
        vp.scroll_to(9, 200);
        for _ in 0..100 {
            vp.tick();
        }
        vp.reset();
        assert_eq!(vp.offset(), 0);
    }
}
