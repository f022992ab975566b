//! Pointer and keyboard input types

use aisle_core::ObjectKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Modifier keys held during a pointer event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        alt: false,
        ctrl: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        alt: false,
        ctrl: false,
        meta: false,
    };

    pub fn any(&self) -> bool {
        self.shift || self.alt || self.ctrl || self.meta
    }
}

/// The modifier that turns a pointer-down into an entity drag instead of
/// camera navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragModifier {
    #[default]
    Shift,
    Alt,
    Ctrl,
    Meta,
}

impl DragModifier {
    pub fn is_held(&self, modifiers: &Modifiers) -> bool {
        match self {
            DragModifier::Shift => modifiers.shift,
            DragModifier::Alt => modifiers.alt,
            DragModifier::Ctrl => modifiers.ctrl,
            DragModifier::Meta => modifiers.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Delete,
    Backspace,
    Escape,
    Enter,
}

/// One recorded input, as fed to `VenueView::handle`. Positions are
/// viewport pixels, y down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown {
        x: f32,
        y: f32,
        #[serde(default = "default_button")]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        x: f32,
        y: f32,
    },
    PointerUp {
        x: f32,
        y: f32,
        #[serde(default = "default_button")]
        button: PointerButton,
    },
    DoubleClick {
        x: f32,
        y: f32,
    },
    Key {
        key: Key,
    },
    /// Enter zone drawing mode
    BeginDrawing,
    /// Drop a new fixture where the pointer is
    Place {
        kind: ObjectKind,
        x: f32,
        y: f32,
    },
    Tick {
        dt: f64,
        #[serde(default = "default_visible")]
        visible: bool,
    },
}

fn default_button() -> PointerButton {
    PointerButton::Primary
}

fn default_visible() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_modifier_matches_flag() {
        let mods = Modifiers {
            alt: true,
            ..Modifiers::NONE
        };
        assert!(DragModifier::Alt.is_held(&mods));
        assert!(!DragModifier::Shift.is_held(&mods));
        assert!(DragModifier::Shift.is_held(&Modifiers::SHIFT));
    }

    #[test]
    fn test_event_from_toml() {
        #[derive(Deserialize)]
        struct Script {
            events: Vec<InputEvent>,
        }
        let script: Script = toml::from_str(
            r#"
            [[events]]
            event = "pointer_down"
            x = 10.0
            y = 20.0
            modifiers = { shift = true }

            [[events]]
            event = "key"
            key = "delete"

            [[events]]
            event = "tick"
            dt = 0.016
            "#,
        )
        .unwrap();
        assert_eq!(
            script.events[0],
            InputEvent::PointerDown {
                x: 10.0,
                y: 20.0,
                button: PointerButton::Primary,
                modifiers: Modifiers::SHIFT,
            }
        );
        assert_eq!(script.events[1], InputEvent::Key { key: Key::Delete });
        assert!(matches!(script.events[2], InputEvent::Tick { visible: true, .. }));
    }
}
