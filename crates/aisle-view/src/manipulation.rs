//! Manipulation State Machine
//!
//! `Idle -> PendingDrag -> Dragging -> Idle`. A press always starts a
//! pending gesture; it only becomes an entity drag when the drag modifier
//! was held over a draggable target. Crossing the pixel threshold turns an
//! armed press into a drag and any other press into camera navigation.
//! Releasing before the threshold is a click.

use crate::hit_test::Hit;
use crate::input::PointerButton;
use aisle_core::FloorPoint;

/// Entity drag in progress
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    pub target: Hit,
    /// Target position minus the drag-plane point under the pointer at press
    pub offset: FloorPoint,
    /// Target position when the drag started (centroid for region bodies)
    pub origin: FloorPoint,
    /// Region vertices when the drag started; empty for objects and sensors
    pub origin_vertices: Vec<FloorPoint>,
    /// Last previewed position; clamped to the venue except for region bodies
    pub current: FloorPoint,
    /// Height of the horizontal drag plane, taken from the hit point
    pub plane_height: f32,
}

impl ActiveDrag {
    pub fn new(target: Hit, origin: FloorPoint, pointer: FloorPoint) -> Self {
        Self {
            target,
            offset: origin - pointer,
            origin,
            origin_vertices: Vec::new(),
            current: origin,
            plane_height: 0.0,
        }
    }

    pub fn on_plane(mut self, height: f32) -> Self {
        self.plane_height = height;
        self
    }

    pub fn with_vertices(mut self, vertices: Vec<FloorPoint>) -> Self {
        self.origin_vertices = vertices;
        self
    }

    /// Where the target goes for a pointer now over `pointer` on the drag plane
    pub fn target_for(&self, pointer: FloorPoint) -> FloorPoint {
        pointer + self.offset
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManipulationState {
    Idle,
    PendingDrag {
        down: [f32; 2],
        button: PointerButton,
        hit: Option<Hit>,
        armed: Option<ActiveDrag>,
    },
    Dragging(ActiveDrag),
    /// Pointer gesture handed to the camera
    Navigating { last: [f32; 2] },
}

/// Result of a pointer move
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    /// No button held
    Hover,
    /// Below the threshold; nothing to do yet
    Pending,
    /// Dragging; preview the target under the pointer
    Drag,
    /// Camera gesture with the pixel delta since the last move
    Navigate { delta: [f32; 2], button: PointerButton },
}

/// Result of a pointer release
#[derive(Debug, Clone, PartialEq)]
pub enum Release {
    None,
    Click { button: PointerButton, hit: Option<Hit> },
    Commit(ActiveDrag),
}

pub struct Manipulator {
    state: ManipulationState,
    nav_button: PointerButton,
    pub threshold_px: f32,
}

impl Manipulator {
    pub fn new(threshold_px: f32) -> Self {
        Self {
            state: ManipulationState::Idle,
            nav_button: PointerButton::Primary,
            threshold_px,
        }
    }

    pub fn state(&self) -> &ManipulationState {
        &self.state
    }

    /// Start a gesture. `armed` is the drag to run if the pointer moves far
    /// enough; pass None for presses that can only click or navigate.
    pub fn press(&mut self, pixel: [f32; 2], button: PointerButton, hit: Option<Hit>, armed: Option<ActiveDrag>) {
        self.state = ManipulationState::PendingDrag {
            down: pixel,
            button,
            hit,
            armed,
        };
    }

    pub fn motion(&mut self, pixel: [f32; 2]) -> Motion {
        match std::mem::replace(&mut self.state, ManipulationState::Idle) {
            ManipulationState::Idle => Motion::Hover,
            ManipulationState::PendingDrag {
                down,
                button,
                hit,
                armed,
            } => {
                let dx = pixel[0] - down[0];
                let dy = pixel[1] - down[1];
                if (dx * dx + dy * dy).sqrt() <= self.threshold_px {
                    self.state = ManipulationState::PendingDrag {
                        down,
                        button,
                        hit,
                        armed,
                    };
                    return Motion::Pending;
                }
                match armed {
                    Some(drag) => {
                        self.state = ManipulationState::Dragging(drag);
                        Motion::Drag
                    }
                    None => {
                        self.nav_button = button;
                        self.state = ManipulationState::Navigating { last: pixel };
                        Motion::Navigate {
                            delta: [dx, dy],
                            button,
                        }
                    }
                }
            }
            ManipulationState::Dragging(drag) => {
                self.state = ManipulationState::Dragging(drag);
                Motion::Drag
            }
            ManipulationState::Navigating { last } => {
                self.state = ManipulationState::Navigating { last: pixel };
                Motion::Navigate {
                    delta: [pixel[0] - last[0], pixel[1] - last[1]],
                    button: self.nav_button,
                }
            }
        }
    }

    pub fn release(&mut self) -> Release {
        match std::mem::replace(&mut self.state, ManipulationState::Idle) {
            ManipulationState::PendingDrag { button, hit, .. } => Release::Click { button, hit },
            ManipulationState::Dragging(drag) => Release::Commit(drag),
            ManipulationState::Idle | ManipulationState::Navigating { .. } => Release::None,
        }
    }

    /// Abandon the gesture, returning the drag it had started, if any
    pub fn cancel(&mut self) -> Option<ActiveDrag> {
        match std::mem::replace(&mut self.state, ManipulationState::Idle) {
            ManipulationState::Dragging(drag) => Some(drag),
            _ => None,
        }
    }

    pub fn drag(&self) -> Option<&ActiveDrag> {
        match &self.state {
            ManipulationState::Dragging(drag) => Some(drag),
            _ => None,
        }
    }

    pub fn drag_mut(&mut self) -> Option<&mut ActiveDrag> {
        match &mut self.state {
            ManipulationState::Dragging(drag) => Some(drag),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ManipulationState::Dragging(_))
    }

    /// Camera controls stay off from an armed press until release
    pub fn camera_enabled(&self) -> bool {
        !matches!(
            self.state,
            ManipulationState::Dragging(_) | ManipulationState::PendingDrag { armed: Some(_), .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object_drag() -> ActiveDrag {
        ActiveDrag::new(Hit::Object("o1".into()), FloorPoint::new(5.0, 5.0), FloorPoint::new(5.2, 4.9))
    }

    #[test]
    fn test_small_move_is_click() {
        let mut m = Manipulator::new(5.0);
        m.press([100.0, 100.0], PointerButton::Primary, Some(Hit::Object("o1".into())), Some(object_drag()));
        assert_eq!(m.motion([103.0, 103.0]), Motion::Pending);
        assert!(!m.camera_enabled());
        assert_eq!(
            m.release(),
            Release::Click {
                button: PointerButton::Primary,
                hit: Some(Hit::Object("o1".into()))
            }
        );
        assert_eq!(*m.state(), ManipulationState::Idle);
    }

    #[test]
    fn test_armed_press_becomes_drag() {
        let mut m = Manipulator::new(5.0);
        m.press([100.0, 100.0], PointerButton::Primary, Some(Hit::Object("o1".into())), Some(object_drag()));
        assert_eq!(m.motion([110.0, 100.0]), Motion::Drag);
        assert!(m.is_dragging());
        assert!(!m.camera_enabled());

        m.drag_mut().unwrap().current = FloorPoint::new(6.0, 5.0);
        match m.release() {
            Release::Commit(drag) => assert_eq!(drag.current, FloorPoint::new(6.0, 5.0)),
            other => panic!("expected commit, got {:?}", other),
        }
        assert!(m.camera_enabled());
    }

    #[test]
    fn test_unarmed_press_navigates() {
        let mut m = Manipulator::new(5.0);
        m.press([100.0, 100.0], PointerButton::Primary, Some(Hit::Object("o1".into())), None);
        assert!(m.camera_enabled());
        assert_eq!(
            m.motion([150.0, 100.0]),
            Motion::Navigate {
                delta: [50.0, 0.0],
                button: PointerButton::Primary
            }
        );
        assert_eq!(
            m.motion([150.0, 110.0]),
            Motion::Navigate {
                delta: [0.0, 10.0],
                button: PointerButton::Primary
            }
        );
        assert_eq!(m.release(), Release::None);
    }

    #[test]
    fn test_drag_offset_preserved() {
        let drag = object_drag();
        let target = drag.target_for(FloorPoint::new(7.2, 4.9));
        assert!((target.x - 7.0).abs() < 1e-5);
        assert!((target.z - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_cancel_returns_drag() {
        let mut m = Manipulator::new(5.0);
        m.press([0.0, 0.0], PointerButton::Primary, None, Some(object_drag()));
        m.motion([20.0, 0.0]);
        assert!(m.cancel().is_some());
        assert_eq!(m.motion([30.0, 0.0]), Motion::Hover);
    }
}
