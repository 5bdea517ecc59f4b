use crate::nav::{PadSnapshot, AXIS_DEADZONE};
use sdl2::controller::{Axis, Button, GameController};

/// Per-pad input options read live from config each frame.
#[derive(Clone, Copy, Debug)]
pub struct PadOptions {
    pub use_joystick: bool,
    pub swap_buttons: bool,
}

/// True when the raw axis value is past the deadzone in the given direction.
pub fn axis_engaged(value: i16, positive: bool) -> bool {
    let norm = value as f32 / i16::MAX as f32;
    if positive {
        norm > AXIS_DEADZONE
    } else {
        norm < -AXIS_DEADZONE
    }
}

/// A logical direction is down if its D-pad button is pressed or the stick
/// axis is past the deadzone (when stick navigation is enabled).
pub fn direction_down(button: bool, axis: i16, positive: bool, use_joystick: bool) -> bool {
    button || (use_joystick && axis_engaged(axis, positive))
}

/// Sample one controller's raw state into a logical snapshot.
pub fn snapshot(gc: &GameController, opts: &PadOptions) -> PadSnapshot {
    let lx = gc.axis(Axis::LeftX);
    let ly = gc.axis(Axis::LeftY);
    let (select_btn, back_btn) = if opts.swap_buttons {
        (Button::B, Button::A)
    } else {
        (Button::A, Button::B)
    };

    PadSnapshot {
        id: gc.instance_id(),
        up: direction_down(gc.button(Button::DPadUp), ly, false, opts.use_joystick),
        down: direction_down(gc.button(Button::DPadDown), ly, true, opts.use_joystick),
        left: direction_down(gc.button(Button::DPadLeft), lx, false, opts.use_joystick),
        right: direction_down(gc.button(Button::DPadRight), lx, true, opts.use_joystick),
        select: gc.button(select_btn),
        back: gc.button(back_btn),
        // either designated button opens settings
        settings: gc.button(Button::Start) || gc.button(Button::Y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0.5 of full scale: 16384 is past the deadzone, 16383 is not
    #[test]
    fn deadzone_threshold_positive() {
        assert!(axis_engaged(16384, true));
        assert!(!axis_engaged(16383, true));
        assert!(!axis_engaged(16384, false));
    }

    #[test]
    fn deadzone_threshold_negative() {
        assert!(axis_engaged(-16384, false));
        assert!(!axis_engaged(-16383, false));
        assert!(!axis_engaged(-16384, true));
        // hardware minimum still registers
        assert!(axis_engaged(i16::MIN, false));
    }

    #[test]
    fn center_is_noise() {
        assert!(!axis_engaged(0, true));
        assert!(!axis_engaged(0, false));
    }

    #[test]
    fn button_or_axis_merge() {
        assert!(direction_down(true, 0, true, true));
        assert!(direction_down(false, 20000, true, true));
        assert!(!direction_down(false, 20000, false, true));
        assert!(!direction_down(false, 0, true, true));
    }

    #[test]
    fn stick_contribution_can_be_disabled() {
        assert!(!direction_down(false, 20000, true, false));
        assert!(direction_down(true, 0, true, false));
    }
}
