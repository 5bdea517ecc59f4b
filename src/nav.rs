use sdl2::keyboard::Keycode;
use std::collections::HashMap;

/// Fraction of full axis scale below which stick input is treated as noise.
pub const AXIS_DEADZONE: f32 = 0.5;

/// Logical pad controls after button/axis translation. Directions and
/// actions share one edge-detection path.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PadControl {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Settings,
}

const PAD_CONTROLS: [PadControl; 7] = [
    PadControl::Right,
    PadControl::Left,
    PadControl::Down,
    PadControl::Up,
    PadControl::Select,
    PadControl::Back,
    PadControl::Settings,
];

/// One frame's sampled state for a single connected controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PadSnapshot {
    pub id: u32,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub select: bool,
    pub back: bool,
    pub settings: bool,
}

impl PadSnapshot {
    pub fn is_down(&self, control: PadControl) -> bool {
        match control {
            PadControl::Up => self.up,
            PadControl::Down => self.down,
            PadControl::Left => self.left,
            PadControl::Right => self.right,
            PadControl::Select => self.select,
            PadControl::Back => self.back,
            PadControl::Settings => self.settings,
        }
    }

    pub fn any_direction(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// Live grid layout, rebuilt from application state on every poll and key
/// event. Never cache one of these across frames.
#[derive(Clone, Copy, Debug)]
pub struct GridContext {
    pub item_count: usize,
    pub columns: usize,
    pub enabled: bool,
}

impl GridContext {
    fn cols(&self) -> usize {
        self.columns.max(1)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputSource {
    Pad,
    Key,
}

/// Collaborator callbacks. Every method has a no-op default, so a sink only
/// implements the intents it cares about; unimplemented intents are dropped.
pub trait NavSink {
    fn on_select(&mut self, _index: usize) {}
    fn on_back(&mut self) {}
    fn on_settings(&mut self) {}
    fn on_up_out(&mut self) {}
    fn on_down_out(&mut self) {}
    fn on_focus_changed(&mut self, _index: usize, _source: InputSource) {}
    /// Escape pressed while a text field owns the keyboard.
    fn on_text_blur(&mut self) {}
}

/// Focus controller for a one-dimensional list laid out as a grid.
///
/// Holds the single authoritative focused index for the list, fed by two
/// independent readers: a per-frame controller poll with rising-edge
/// detection, and discrete key-down events (the host's native key repeat is
/// the only repeat source). Boundary exits at the top and bottom row are
/// reported through the sink identically for both readers.
///
/// Each navigable list owns its own `GridNav`; instances never share state.
/// Dropping the instance is the teardown: nothing it schedules can outlive
/// it.
pub struct GridNav {
    focused: Option<usize>,
    held: HashMap<(u32, PadControl), bool>,
}

impl GridNav {
    pub fn new() -> Self {
        Self {
            focused: None,
            held: HashMap::new(),
        }
    }

    /// Currently focused item, if any.
    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    /// External reset, e.g. when the backing list is replaced. Does not
    /// notify the sink: scroll sync only follows reader-originated moves.
    pub fn set_focus(&mut self, index: Option<usize>) {
        self.focused = index;
    }

    /// Sample all connected controllers once for this display frame.
    /// While `ctx.enabled` is false nothing fires, but levels are still
    /// recorded: a button held across re-enable is a held button, not a
    /// fresh edge. The caller keeps invoking this every frame so navigation
    /// resumes without re-registration.
    pub fn poll_pads(&mut self, ctx: &GridContext, pads: &[PadSnapshot], sink: &mut dyn NavSink) {
        if !ctx.enabled {
            for pad in pads {
                self.record_levels(pad);
            }
            return;
        }
        for pad in pads {
            self.poll_pad(ctx, pad, sink);
        }
    }

    fn poll_pad(&mut self, ctx: &GridContext, pad: &PadSnapshot, sink: &mut dyn NavSink) {
        if ctx.item_count == 0 {
            return;
        }
        self.clamp_focus(ctx);

        // First directional press on an unfocused list only takes focus.
        // Recording the levels here swallows the triggering press so the
        // held direction does not also move next frame.
        if self.focused.is_none() && pad.any_direction() {
            self.focused = Some(0);
            sink.on_focus_changed(0, InputSource::Pad);
            self.record_levels(pad);
            return;
        }

        for control in PAD_CONTROLS {
            let down = pad.is_down(control);
            let was_down = self
                .held
                .insert((pad.id, control), down)
                .unwrap_or(false);
            if !down || was_down {
                continue;
            }
            match control {
                PadControl::Up | PadControl::Down | PadControl::Left | PadControl::Right => {
                    self.apply_move(control, ctx, InputSource::Pad, sink);
                }
                PadControl::Select => {
                    if let Some(i) = self.focused {
                        sink.on_select(i);
                    }
                }
                PadControl::Back => sink.on_back(),
                PadControl::Settings => sink.on_settings(),
            }
        }
    }

    /// React to one key-down event. Returns true when the event was handled
    /// and must not reach any other listener.
    pub fn handle_key(
        &mut self,
        ctx: &GridContext,
        key: Keycode,
        text_entry: bool,
        sink: &mut dyn NavSink,
    ) -> bool {
        if !ctx.enabled {
            return false;
        }

        // While a text field owns the keyboard only Escape (blur) and Return
        // are ours; everything else passes through for normal editing.
        if text_entry {
            match key {
                Keycode::Escape => {
                    sink.on_text_blur();
                    return true;
                }
                Keycode::Return => {}
                _ => return false,
            }
        }

        self.clamp_focus(ctx);

        let direction = match key {
            Keycode::Up => Some(PadControl::Up),
            Keycode::Down => Some(PadControl::Down),
            Keycode::Left => Some(PadControl::Left),
            Keycode::Right => Some(PadControl::Right),
            _ => None,
        };

        // Auto-focus: the first directional key is consumed without moving.
        if direction.is_some() && self.focused.is_none() {
            if ctx.item_count > 0 {
                self.focused = Some(0);
                sink.on_focus_changed(0, InputSource::Key);
            }
            return true;
        }

        // Back keys fire whether or not anything is focused.
        if matches!(
            key,
            Keycode::Backspace | Keycode::Escape | Keycode::B | Keycode::AcBack
        ) {
            sink.on_back();
            return true;
        }

        let Some(cur) = self.focused else {
            return false;
        };

        if let Some(dir) = direction {
            self.apply_move(dir, ctx, InputSource::Key, sink);
            return true;
        }

        match key {
            Keycode::Return | Keycode::Space | Keycode::Z | Keycode::X => {
                sink.on_select(cur);
                true
            }
            _ => false,
        }
    }

    fn apply_move(
        &mut self,
        dir: PadControl,
        ctx: &GridContext,
        source: InputSource,
        sink: &mut dyn NavSink,
    ) {
        let total = ctx.item_count;
        let Some(cur) = self.focused else {
            return;
        };
        let cols = ctx.cols();
        let next = match dir {
            PadControl::Right => (cur + 1 < total).then(|| cur + 1),
            PadControl::Left => (cur > 0).then(|| cur - 1),
            PadControl::Down => {
                if cur + cols < total {
                    Some(cur + cols)
                } else {
                    sink.on_down_out();
                    None
                }
            }
            PadControl::Up => {
                if cur >= cols {
                    Some(cur - cols)
                } else {
                    sink.on_up_out();
                    None
                }
            }
            _ => None,
        };
        if let Some(next) = next {
            self.focused = Some(next);
            sink.on_focus_changed(next, source);
        }
    }

    // The item list is read live and may have shrunk since the last input.
    fn clamp_focus(&mut self, ctx: &GridContext) {
        if let Some(i) = self.focused {
            if ctx.item_count == 0 {
                self.focused = None;
            } else if i >= ctx.item_count {
                self.focused = Some(ctx.item_count - 1);
            }
        }
    }

    fn record_levels(&mut self, pad: &PadSnapshot) {
        for control in PAD_CONTROLS {
            self.held.insert((pad.id, control), pad.is_down(control));
        }
    }
}

impl Default for GridNav {
    fn default() -> Self {
        Self::new()
    }
}
