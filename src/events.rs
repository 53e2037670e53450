//! Input snapshots and bridge notifications.
//!
//! This module defines the immutable event values that travel from the
//! producer (UI/event) thread to the render thread, and the notifications the
//! render thread broadcasts back to the producer.
//!
//! # Main Types
//!
//! - [`MouseButton`], [`MouseButtons`]: a single button and a set of held buttons.
//! - [`Modifiers`]: Keyboard modifiers (Shift, Control, Alt, Meta).
//! - [`InputEvent`]: A copied snapshot of one host input event.
//! - [`BridgeEvent`]: Lifecycle, texture and fault notifications from the render thread.

use crate::errors::FaultKind;
use crate::item::ItemId;
use crate::render::texture::TextureHandle;
use bitflags::bitflags;
use std::fmt::Display;

/// Represents a mouse button that can be pressed or released
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MouseButton {
    /// No button (plain moves)
    None,
    /// Left mouse button
    Left,
    /// Middle mouse button
    Middle,
    /// Right mouse button
    Right,
    /// Back side button
    Back,
    /// Forward side button
    Forward,
}

impl Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MouseButton::None => write!(f, "None"),
            MouseButton::Left => write!(f, "Left"),
            MouseButton::Middle => write!(f, "Middle"),
            MouseButton::Right => write!(f, "Right"),
            MouseButton::Back => write!(f, "Back"),
            MouseButton::Forward => write!(f, "Forward"),
        }
    }
}

bitflags! {
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        const META    = 0b1000;
    }
}

impl Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();

        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        if self.contains(Modifiers::CONTROL) {
            parts.push("Control");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        if self.contains(Modifiers::META) {
            parts.push("Meta");
        }

        if parts.is_empty() {
            write!(f, "None")
        } else {
            write!(f, "{}", parts.join("+"))
        }
    }
}

bitflags! {
    /// Buttons held down while an event happened.
    pub struct MouseButtons: u8 {
        const LEFT    = 0b00001;
        const MIDDLE  = 0b00010;
        const RIGHT   = 0b00100;
        const BACK    = 0b01000;
        const FORWARD = 0b10000;
    }
}

impl From<MouseButton> for MouseButtons {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::None => MouseButtons::empty(),
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Middle => MouseButtons::MIDDLE,
            MouseButton::Right => MouseButtons::RIGHT,
            MouseButton::Back => MouseButtons::BACK,
            MouseButton::Forward => MouseButtons::FORWARD,
        }
    }
}

/// Position in item-local logical coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FocusReason {
    Mouse,
    Tab,
    Backtab,
    ActiveWindow,
    Popup,
    Shortcut,
    Other,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContextMenuReason {
    Mouse,
    Keyboard,
    Other,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WheelPhase {
    NoScrollPhase,
    Begin,
    Update,
    End,
    Momentum,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TouchPhase {
    Begin,
    Update,
    End,
    Cancel,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TouchPointState {
    Pressed,
    Moved,
    Stationary,
    Released,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TouchPoint {
    pub id: i32,
    pub state: TouchPointState,
    pub pos: Point,
    pub pressure: f32,
}

/// Drag-and-drop payload snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DragData {
    pub pos: Point,
    pub mime_types: Vec<String>,
    pub buttons: MouseButtons,
    pub modifiers: Modifiers,
}

impl Default for MouseButtons {
    fn default() -> Self {
        MouseButtons::empty()
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers::empty()
    }
}

/// Copied snapshot of a host input event, safe to move to the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // ****************************************
    // ** Hover / enter / leave
    HoverEnter { pos: Point, modifiers: Modifiers },
    HoverMove { pos: Point, old_pos: Point, modifiers: Modifiers },
    HoverLeave { old_pos: Point, modifiers: Modifiers },
    /// Pointer entered the item
    Enter { local: Point, window: Point, screen: Point },
    /// Pointer left the item
    Leave,

    // ****************************************
    // ** Drag and drop
    DragEnter(DragData),
    DragMove(DragData),
    DragLeave,
    Drop(DragData),

    // ****************************************
    // ** Keyboard / focus
    ContextMenu { reason: ContextMenuReason, pos: Point, global: Point, modifiers: Modifiers },
    KeyPress {
        key: String,
        code: u32,
        modifiers: Modifiers,
        text: String,
        auto_repeat: bool,
        count: u16,
    },
    KeyRelease {
        key: String,
        code: u32,
        modifiers: Modifiers,
        text: String,
        auto_repeat: bool,
        count: u16,
    },
    FocusIn { reason: FocusReason },
    FocusOut { reason: FocusReason },

    // ****************************************
    // ** Mouse
    MouseMove { pos: Point, buttons: MouseButtons, modifiers: Modifiers },
    MousePress { pos: Point, button: MouseButton, buttons: MouseButtons, modifiers: Modifiers },
    MouseRelease { pos: Point, button: MouseButton, buttons: MouseButtons, modifiers: Modifiers },
    MouseDoubleClick { pos: Point, button: MouseButton, buttons: MouseButtons, modifiers: Modifiers },
    Wheel {
        pos: Point,
        pixel_delta: Point,
        angle_delta: Point,
        buttons: MouseButtons,
        modifiers: Modifiers,
        phase: WheelPhase,
        inverted: bool,
    },

    // ****************************************
    // ** Touch
    Touch { phase: TouchPhase, modifiers: Modifiers, points: Vec<TouchPoint> },
}

/// Coarse classification of an [`InputEvent`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Hover,
    EnterLeave,
    Drag,
    ContextMenu,
    Key,
    Focus,
    Mouse,
    Wheel,
    Touch,
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::HoverEnter { .. } | InputEvent::HoverMove { .. } | InputEvent::HoverLeave { .. } => {
                EventKind::Hover
            }
            InputEvent::Enter { .. } | InputEvent::Leave => EventKind::EnterLeave,
            InputEvent::DragEnter(_) | InputEvent::DragMove(_) | InputEvent::DragLeave | InputEvent::Drop(_) => {
                EventKind::Drag
            }
            InputEvent::ContextMenu { .. } => EventKind::ContextMenu,
            InputEvent::KeyPress { .. } | InputEvent::KeyRelease { .. } => EventKind::Key,
            InputEvent::FocusIn { .. } | InputEvent::FocusOut { .. } => EventKind::Focus,
            InputEvent::MouseMove { .. }
            | InputEvent::MousePress { .. }
            | InputEvent::MouseRelease { .. }
            | InputEvent::MouseDoubleClick { .. } => EventKind::Mouse,
            InputEvent::Wheel { .. } => EventKind::Wheel,
            InputEvent::Touch { .. } => EventKind::Touch,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            InputEvent::HoverEnter { .. } => "HoverEnter",
            InputEvent::HoverMove { .. } => "HoverMove",
            InputEvent::HoverLeave { .. } => "HoverLeave",
            InputEvent::Enter { .. } => "Enter",
            InputEvent::Leave => "Leave",
            InputEvent::DragEnter(_) => "DragEnter",
            InputEvent::DragMove(_) => "DragMove",
            InputEvent::DragLeave => "DragLeave",
            InputEvent::Drop(_) => "Drop",
            InputEvent::ContextMenu { .. } => "ContextMenu",
            InputEvent::KeyPress { .. } => "KeyPress",
            InputEvent::KeyRelease { .. } => "KeyRelease",
            InputEvent::FocusIn { .. } => "FocusIn",
            InputEvent::FocusOut { .. } => "FocusOut",
            InputEvent::MouseMove { .. } => "MouseMove",
            InputEvent::MousePress { .. } => "MousePress",
            InputEvent::MouseRelease { .. } => "MouseRelease",
            InputEvent::MouseDoubleClick { .. } => "MouseDoubleClick",
            InputEvent::Wheel { .. } => "Wheel",
            InputEvent::Touch { .. } => "Touch",
        }
    }
}

/// Notifications broadcast from the render thread to anyone holding an
/// [`ItemHandle`](crate::item::ItemHandle).
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    // ****************************************
    // ** Node lifecycle
    /// Render target and user data have been (re)created
    NodeCreated { item_id: ItemId },
    /// Render target and user data have been released
    NodeDestroyed { item_id: ItemId },

    // ****************************************
    // ** Rendering
    /// A new texture is available for compositing
    TextureChanged { item_id: ItemId, texture: TextureHandle },

    // ****************************************
    // ** Errors / diagnostics
    /// A recoverable fault occurred; the bridge degraded and carried on
    Fault { item_id: ItemId, kind: FaultKind, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mousebutton_display() {
        assert_eq!(MouseButton::Left.to_string(), "Left");
        assert_eq!(MouseButton::Middle.to_string(), "Middle");
        assert_eq!(MouseButton::Right.to_string(), "Right");
        assert_eq!(MouseButton::None.to_string(), "None");
    }

    #[test]
    fn modifiers_display_empty_is_none() {
        let m = Modifiers::empty();
        assert_eq!(m.to_string(), "None");
        assert!(!m.contains(Modifiers::SHIFT));
    }

    #[test]
    fn modifiers_display_combo_in_order() {
        let all = Modifiers::SHIFT | Modifiers::CONTROL | Modifiers::ALT | Modifiers::META;
        assert_eq!(all.to_string(), "Shift+Control+Alt+Meta");

        let some = Modifiers::SHIFT | Modifiers::ALT;
        assert_eq!(some.to_string(), "Shift+Alt");
    }

    #[test]
    fn button_converts_to_held_set() {
        assert_eq!(MouseButtons::from(MouseButton::Right), MouseButtons::RIGHT);
        assert!(MouseButtons::from(MouseButton::None).is_empty());
    }

    #[test]
    fn kinds_group_related_events() {
        let press = InputEvent::MousePress {
            pos: Point::new(1.0, 2.0),
            button: MouseButton::Left,
            buttons: MouseButtons::LEFT,
            modifiers: Modifiers::empty(),
        };
        assert_eq!(press.kind(), EventKind::Mouse);
        assert_eq!(press.name(), "MousePress");

        assert_eq!(InputEvent::Leave.kind(), EventKind::EnterLeave);
        assert_eq!(InputEvent::DragLeave.kind(), EventKind::Drag);
        assert_eq!(
            InputEvent::HoverLeave { old_pos: Point::default(), modifiers: Modifiers::empty() }.kind(),
            EventKind::Hover
        );
        assert_eq!(
            InputEvent::Touch { phase: TouchPhase::Begin, modifiers: Modifiers::empty(), points: vec![] }.kind(),
            EventKind::Touch
        );
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let original = InputEvent::KeyPress {
            key: "A".into(),
            code: 65,
            modifiers: Modifiers::SHIFT,
            text: "A".into(),
            auto_repeat: false,
            count: 1,
        };
        let copy = original.clone();
        drop(original);

        match copy {
            InputEvent::KeyPress { key, modifiers, .. } => {
                assert_eq!(key, "A");
                assert_eq!(modifiers.to_string(), "Shift");
            }
            _ => panic!("Unexpected variant"),
        }
    }
}
