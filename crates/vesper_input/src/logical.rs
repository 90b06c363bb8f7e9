use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::catalog::{ActionDef, ModeDef};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ModeId(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub u32);

/// Shape of the value an action reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ValueKind {
    Button,
    Vector2,
}

impl ValueKind {
    pub fn zero(self) -> ActionValue {
        match self {
            ValueKind::Button => ActionValue::Button(false),
            ValueKind::Vector2 => ActionValue::Vector2(Vec2::ZERO),
        }
    }
}

/// How an action treats its bound controls.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Button,
    Value,
    PassThrough,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActionValue {
    Button(bool),
    Vector2(Vec2),
}

impl ActionValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ActionValue::Button(_) => ValueKind::Button,
            ActionValue::Vector2(_) => ValueKind::Vector2,
        }
    }

    /// Buttons read as zero.
    pub fn as_vec2(&self) -> Vec2 {
        match self {
            ActionValue::Button(_) => Vec2::ZERO,
            ActionValue::Vector2(v) => *v,
        }
    }

    pub fn is_pressed(&self) -> bool {
        match self {
            ActionValue::Button(pressed) => *pressed,
            ActionValue::Vector2(v) => *v != Vec2::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    Started,
    Performed,
    Canceled,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct PhaseMask: u8 {
        const STARTED   = 1 << 0;
        const PERFORMED = 1 << 1;
        const CANCELED  = 1 << 2;
    }
}

impl Phase {
    pub fn mask(self) -> PhaseMask {
        match self {
            Phase::Started => PhaseMask::STARTED,
            Phase::Performed => PhaseMask::PERFORMED,
            Phase::Canceled => PhaseMask::CANCELED,
        }
    }
}

/// A resolved input: one phase of one action, with its value snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionEvent {
    pub action: ActionId,
    pub phase: Phase,
    pub value: ActionValue,
}

impl ActionEvent {
    pub fn new(action: ActionId, phase: Phase, value: ActionValue) -> Self {
        Self {
            action,
            phase,
            value,
        }
    }

    pub fn started(action: ActionId, value: ActionValue) -> Self {
        Self::new(action, Phase::Started, value)
    }

    pub fn performed(action: ActionId, value: ActionValue) -> Self {
        Self::new(action, Phase::Performed, value)
    }

    pub fn canceled(action: ActionId, value: ActionValue) -> Self {
        Self::new(action, Phase::Canceled, value)
    }
}

/// What a subscriber sees for each delivered phase.
#[derive(Clone, Copy, Debug)]
pub struct CallbackContext<'a> {
    pub mode: &'a ModeDef,
    pub action: &'a ActionDef,
    pub phase: Phase,
    pub value: ActionValue,
}

impl CallbackContext<'_> {
    pub fn read_vec2(&self) -> Vec2 {
        self.value.as_vec2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(ValueKind::Button.zero(), ActionValue::Button(false));
        assert_eq!(ValueKind::Vector2.zero(), ActionValue::Vector2(Vec2::ZERO));
        assert!(!ValueKind::Vector2.zero().is_pressed());
    }

    #[test]
    fn test_button_reads_as_zero_vector() {
        let value = ActionValue::Button(true);
        assert!(value.is_pressed());
        assert_eq!(value.as_vec2(), Vec2::ZERO);
        assert_eq!(value.kind(), ValueKind::Button);
    }

    #[test]
    fn test_phase_masks_are_disjoint() {
        let all = Phase::Started.mask() | Phase::Performed.mask() | Phase::Canceled.mask();
        assert_eq!(all, PhaseMask::all());
        assert!(!Phase::Started.mask().intersects(Phase::Canceled.mask()));
    }
}
