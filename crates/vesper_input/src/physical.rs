use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use glam::Vec2;
use winit::{event::MouseButton, keyboard::KeyCode};

use crate::{
    catalog::{ActionCatalog, ActionDef, BindingSource},
    error::InputError,
    logical::{ActionEvent, ActionId, ActionType, ActionValue, ModeId, ValueKind},
};

/// A control referenced by a binding path such as `<Keyboard>/space`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControlPath {
    /// Any of the listed keys actuates the control (`shift` is both shifts).
    Keys(Vec<KeyCode>),
    MouseButton(MouseButton),
    MouseDelta,
    /// Parsed and kept, never resolved against a device.
    Gamepad(String),
}

impl ControlPath {
    pub fn parse(path: &str) -> Result<Self, InputError> {
        let unknown = || InputError::UnknownControlPath(path.to_string());

        let rest = path.strip_prefix('<').ok_or_else(unknown)?;
        let (device, control) = rest.split_once(">/").ok_or_else(unknown)?;

        match device {
            "Keyboard" => keyboard_control(control)
                .map(ControlPath::Keys)
                .ok_or_else(unknown),
            "Mouse" => match control {
                "delta" => Ok(ControlPath::MouseDelta),
                "leftButton" => Ok(ControlPath::MouseButton(MouseButton::Left)),
                "rightButton" => Ok(ControlPath::MouseButton(MouseButton::Right)),
                "middleButton" => Ok(ControlPath::MouseButton(MouseButton::Middle)),
                "backButton" => Ok(ControlPath::MouseButton(MouseButton::Back)),
                "forwardButton" => Ok(ControlPath::MouseButton(MouseButton::Forward)),
                _ => Err(unknown()),
            },
            "Gamepad" => Ok(ControlPath::Gamepad(control.to_string())),
            _ => Err(unknown()),
        }
    }
}

fn keyboard_control(name: &str) -> Option<Vec<KeyCode>> {
    let single = |code| Some(vec![code]);

    match name {
        "shift" => Some(vec![KeyCode::ShiftLeft, KeyCode::ShiftRight]),
        "ctrl" => Some(vec![KeyCode::ControlLeft, KeyCode::ControlRight]),
        "alt" => Some(vec![KeyCode::AltLeft, KeyCode::AltRight]),
        "leftShift" => single(KeyCode::ShiftLeft),
        "rightShift" => single(KeyCode::ShiftRight),
        "leftCtrl" => single(KeyCode::ControlLeft),
        "rightCtrl" => single(KeyCode::ControlRight),
        "leftAlt" => single(KeyCode::AltLeft),
        "rightAlt" => single(KeyCode::AltRight),
        "space" => single(KeyCode::Space),
        "escape" => single(KeyCode::Escape),
        "enter" => single(KeyCode::Enter),
        "tab" => single(KeyCode::Tab),
        "backspace" => single(KeyCode::Backspace),
        "upArrow" => single(KeyCode::ArrowUp),
        "downArrow" => single(KeyCode::ArrowDown),
        "leftArrow" => single(KeyCode::ArrowLeft),
        "rightArrow" => single(KeyCode::ArrowRight),
        "a" => single(KeyCode::KeyA),
        "b" => single(KeyCode::KeyB),
        "c" => single(KeyCode::KeyC),
        "d" => single(KeyCode::KeyD),
        "e" => single(KeyCode::KeyE),
        "f" => single(KeyCode::KeyF),
        "g" => single(KeyCode::KeyG),
        "h" => single(KeyCode::KeyH),
        "i" => single(KeyCode::KeyI),
        "j" => single(KeyCode::KeyJ),
        "k" => single(KeyCode::KeyK),
        "l" => single(KeyCode::KeyL),
        "m" => single(KeyCode::KeyM),
        "n" => single(KeyCode::KeyN),
        "o" => single(KeyCode::KeyO),
        "p" => single(KeyCode::KeyP),
        "q" => single(KeyCode::KeyQ),
        "r" => single(KeyCode::KeyR),
        "s" => single(KeyCode::KeyS),
        "t" => single(KeyCode::KeyT),
        "u" => single(KeyCode::KeyU),
        "v" => single(KeyCode::KeyV),
        "w" => single(KeyCode::KeyW),
        "x" => single(KeyCode::KeyX),
        "y" => single(KeyCode::KeyY),
        "z" => single(KeyCode::KeyZ),
        "0" => single(KeyCode::Digit0),
        "1" => single(KeyCode::Digit1),
        "2" => single(KeyCode::Digit2),
        "3" => single(KeyCode::Digit3),
        "4" => single(KeyCode::Digit4),
        "5" => single(KeyCode::Digit5),
        "6" => single(KeyCode::Digit6),
        "7" => single(KeyCode::Digit7),
        "8" => single(KeyCode::Digit8),
        "9" => single(KeyCode::Digit9),
        _ => None,
    }
}

/// Raw device input as it arrives from the window layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhysicalInput {
    Key { code: KeyCode, pressed: bool },
    MouseButton { button: MouseButton, pressed: bool },
    MouseDelta(Vec2),
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Activation: u8 {
        const NONE        = 0;
        const ACTIVE      = 1 << 0;
        const DELTA       = 1 << 1;
        const DELTA_FRAME = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug)]
struct ActionSlot {
    flags: Activation,
    last: ActionValue,
}

/// Turns physical input into phase-tagged action events.
///
/// Presses only resolve for actions whose mode is enabled at the moment the
/// physical event is resolved, so a key shared by two exclusive modes
/// activates exactly one of them.
pub struct BindingResolver {
    catalog: Arc<ActionCatalog>,
    scheme: Option<String>,
    held_keys: HashSet<KeyCode>,
    held_buttons: HashSet<MouseButton>,
    key_index: HashMap<KeyCode, Vec<ActionId>>,
    button_index: HashMap<MouseButton, Vec<ActionId>>,
    delta_actions: Vec<ActionId>,
    slots: Vec<ActionSlot>,
}

impl BindingResolver {
    pub fn new(catalog: Arc<ActionCatalog>) -> Self {
        Self::with_scheme(catalog, None)
    }

    /// Restricts resolution to bindings tagged with `scheme`'s binding group.
    pub fn with_scheme(catalog: Arc<ActionCatalog>, scheme: Option<String>) -> Self {
        let mut resolver = Self {
            slots: catalog
                .actions()
                .iter()
                .map(|a| ActionSlot {
                    flags: Activation::NONE,
                    last: a.kind.zero(),
                })
                .collect(),
            catalog,
            scheme,
            held_keys: HashSet::new(),
            held_buttons: HashSet::new(),
            key_index: HashMap::new(),
            button_index: HashMap::new(),
            delta_actions: Vec::new(),
        };
        resolver.build_index();
        resolver
    }

    fn in_scheme(&self, groups: &[String]) -> bool {
        match &self.scheme {
            None => true,
            Some(scheme) => groups.iter().any(|g| g == scheme),
        }
    }

    fn build_index(&mut self) {
        let catalog = self.catalog.clone();

        for action in catalog.actions() {
            for binding in &action.bindings {
                let controls: Vec<_> = match &binding.source {
                    BindingSource::Control(control) if self.in_scheme(&binding.groups) => {
                        vec![control]
                    }
                    BindingSource::Control(_) => Vec::new(),
                    BindingSource::Composite2D(parts) => parts
                        .iter()
                        .filter(|p| self.in_scheme(&p.groups))
                        .map(|p| &p.control)
                        .collect(),
                };

                for control in controls {
                    self.index_control(action.id, control);
                }
            }
        }
    }

    fn index_control(&mut self, action: ActionId, control: &ControlPath) {
        match control {
            ControlPath::Keys(codes) => {
                for code in codes {
                    let entry = self.key_index.entry(*code).or_default();
                    if !entry.contains(&action) {
                        entry.push(action);
                    }
                }
            }
            ControlPath::MouseButton(button) => {
                let entry = self.button_index.entry(*button).or_default();
                if !entry.contains(&action) {
                    entry.push(action);
                }
            }
            ControlPath::MouseDelta => {
                if !self.delta_actions.contains(&action) {
                    self.delta_actions.push(action);
                }
            }
            ControlPath::Gamepad(_) => {}
        }
    }

    pub fn is_active(&self, action: ActionId) -> bool {
        self.slots
            .get(action.0 as usize)
            .is_some_and(|s| s.flags.contains(Activation::ACTIVE))
    }

    pub fn resolve(
        &mut self,
        input: &PhysicalInput,
        is_enabled: impl Fn(ModeId) -> bool,
    ) -> Vec<ActionEvent> {
        let mut events = Vec::new();

        match *input {
            PhysicalInput::Key { code, pressed } => {
                let changed = if pressed {
                    self.held_keys.insert(code)
                } else {
                    self.held_keys.remove(&code)
                };
                // Key repeat or a release we never saw pressed.
                if !changed {
                    return events;
                }
                if let Some(actions) = self.key_index.get(&code).cloned() {
                    for action in actions {
                        self.evaluate(action, &is_enabled, &mut events);
                    }
                }
            }
            PhysicalInput::MouseButton { button, pressed } => {
                let changed = if pressed {
                    self.held_buttons.insert(button)
                } else {
                    self.held_buttons.remove(&button)
                };
                if !changed {
                    return events;
                }
                if let Some(actions) = self.button_index.get(&button).cloned() {
                    for action in actions {
                        self.evaluate(action, &is_enabled, &mut events);
                    }
                }
            }
            PhysicalInput::MouseDelta(delta) => {
                for action in self.delta_actions.clone() {
                    self.apply_delta(action, delta, &is_enabled, &mut events);
                }
            }
        }

        events
    }

    /// Cancels delta-driven activations that saw no movement this frame.
    pub fn end_frame(&mut self, is_enabled: impl Fn(ModeId) -> bool) -> Vec<ActionEvent> {
        let mut events = Vec::new();

        for action in self.delta_actions.clone() {
            let Some(def) = self.catalog.action(action) else {
                continue;
            };
            let zero = def.kind.zero();
            let enabled = is_enabled(def.mode);

            let slot = &mut self.slots[action.0 as usize];
            let moved = slot.flags.contains(Activation::DELTA_FRAME);
            slot.flags.remove(Activation::DELTA_FRAME);

            if slot.flags.contains(Activation::ACTIVE | Activation::DELTA) && !moved {
                slot.flags.remove(Activation::ACTIVE | Activation::DELTA);
                slot.last = zero;
                if enabled {
                    events.push(ActionEvent::canceled(action, zero));
                }
            }
        }

        events
    }

    /// Forgets activations whose mode has been disabled so a later release
    /// does not cancel something the subscriber never saw continue.
    pub fn sync_modes(&mut self, is_enabled: impl Fn(ModeId) -> bool) {
        for def in self.catalog.actions() {
            if is_enabled(def.mode) {
                continue;
            }
            let slot = &mut self.slots[def.id.0 as usize];
            if slot.flags.contains(Activation::ACTIVE) {
                log::debug!("dropping activation of '{}' (mode disabled)", def.name);
                slot.flags = Activation::NONE;
                slot.last = def.kind.zero();
            }
        }
    }

    fn apply_delta(
        &mut self,
        action: ActionId,
        delta: Vec2,
        is_enabled: &impl Fn(ModeId) -> bool,
        events: &mut Vec<ActionEvent>,
    ) {
        let Some(def) = self.catalog.action(action) else {
            return;
        };
        if def.kind != ValueKind::Vector2 || !is_enabled(def.mode) {
            return;
        }

        let value = ActionValue::Vector2(delta);
        let pass_through = def.action_type == ActionType::PassThrough;
        let slot = &mut self.slots[action.0 as usize];
        slot.flags.insert(Activation::DELTA_FRAME);

        if !slot.flags.contains(Activation::ACTIVE) {
            if delta == Vec2::ZERO {
                return;
            }
            slot.flags.insert(Activation::ACTIVE | Activation::DELTA);
            if !pass_through {
                events.push(ActionEvent::started(action, value));
            }
        }

        slot.last = value;
        events.push(ActionEvent::performed(action, value));
    }

    fn evaluate(
        &mut self,
        action: ActionId,
        is_enabled: &impl Fn(ModeId) -> bool,
        events: &mut Vec<ActionEvent>,
    ) {
        let Some(def) = self.catalog.action(action) else {
            return;
        };
        let value = self.current_value(def);
        let zero = def.kind.zero();
        let enabled = is_enabled(def.mode);
        let pass_through = def.action_type == ActionType::PassThrough;

        let slot = &mut self.slots[action.0 as usize];
        let was_active = slot.flags.contains(Activation::ACTIVE);

        if !enabled {
            // Disabled modes never start; a running activation is truncated.
            slot.flags = Activation::NONE;
            slot.last = zero;
            return;
        }

        match (was_active, value.is_pressed()) {
            (false, true) => {
                slot.flags.insert(Activation::ACTIVE);
                // Pass-through actions report value changes only.
                if !pass_through {
                    events.push(ActionEvent::started(action, value));
                }
                events.push(ActionEvent::performed(action, value));
            }
            (true, true) => {
                if value != slot.last {
                    events.push(ActionEvent::performed(action, value));
                }
            }
            (true, false) => {
                slot.flags.remove(Activation::ACTIVE);
                events.push(ActionEvent::canceled(action, zero));
            }
            (false, false) => {}
        }

        slot.last = value;
    }

    fn current_value(&self, def: &ActionDef) -> ActionValue {
        match def.kind {
            ValueKind::Button => ActionValue::Button(def.bindings.iter().any(|b| {
                match &b.source {
                    BindingSource::Control(control) => {
                        self.in_scheme(&b.groups) && self.is_held(control)
                    }
                    BindingSource::Composite2D(parts) => parts
                        .iter()
                        .any(|p| self.in_scheme(&p.groups) && self.is_held(&p.control)),
                }
            })),
            ValueKind::Vector2 => {
                let sum: Vec2 = def
                    .bindings
                    .iter()
                    .filter_map(|b| match &b.source {
                        BindingSource::Composite2D(parts) => Some(
                            parts
                                .iter()
                                .filter(|p| self.in_scheme(&p.groups) && self.is_held(&p.control))
                                .map(|p| p.direction.vector())
                                .sum::<Vec2>()
                                .normalize_or_zero(),
                        ),
                        BindingSource::Control(_) => None,
                    })
                    .sum();

                ActionValue::Vector2(if sum.length_squared() > 1.0 {
                    sum.normalize()
                } else {
                    sum
                })
            }
        }
    }

    fn is_held(&self, control: &ControlPath) -> bool {
        match control {
            ControlPath::Keys(codes) => codes.iter().any(|c| self.held_keys.contains(c)),
            ControlPath::MouseButton(button) => self.held_buttons.contains(button),
            ControlPath::MouseDelta | ControlPath::Gamepad(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::Phase;

    fn resolver() -> (Arc<ActionCatalog>, BindingResolver) {
        let catalog = Arc::new(ActionCatalog::game_inputs().unwrap());
        let resolver = BindingResolver::new(catalog.clone());
        (catalog, resolver)
    }

    fn key(code: KeyCode, pressed: bool) -> PhysicalInput {
        PhysicalInput::Key { code, pressed }
    }

    fn phases(events: &[ActionEvent]) -> Vec<Phase> {
        events.iter().map(|e| e.phase).collect()
    }

    #[test]
    fn test_parse_control_paths() {
        assert_eq!(
            ControlPath::parse("<Keyboard>/space").unwrap(),
            ControlPath::Keys(vec![KeyCode::Space])
        );
        assert_eq!(
            ControlPath::parse("<Keyboard>/shift").unwrap(),
            ControlPath::Keys(vec![KeyCode::ShiftLeft, KeyCode::ShiftRight])
        );
        assert_eq!(
            ControlPath::parse("<Mouse>/delta").unwrap(),
            ControlPath::MouseDelta
        );
        assert_eq!(
            ControlPath::parse("<Gamepad>/buttonSouth").unwrap(),
            ControlPath::Gamepad("buttonSouth".to_string())
        );
        assert!(matches!(
            ControlPath::parse("<Keyboard>/pageFoo"),
            Err(InputError::UnknownControlPath(_))
        ));
        assert!(ControlPath::parse("2DVector").is_err());
        assert!(ControlPath::parse("<Joystick>/trigger").is_err());
    }

    #[test]
    fn test_button_press_and_release() {
        let (catalog, mut resolver) = resolver();
        let jump = catalog.find_action("Player", "Jump").unwrap();

        let events = resolver.resolve(&key(KeyCode::Space, true), |_| true);
        assert_eq!(phases(&events), [Phase::Started, Phase::Performed]);
        assert!(events.iter().all(|e| e.action == jump));
        assert!(resolver.is_active(jump));

        // Key repeat is not a new activation.
        assert!(resolver.resolve(&key(KeyCode::Space, true), |_| true).is_empty());

        let events = resolver.resolve(&key(KeyCode::Space, false), |_| true);
        assert_eq!(phases(&events), [Phase::Canceled]);
        assert_eq!(events[0].value, ActionValue::Button(false));
        assert!(!resolver.is_active(jump));
    }

    #[test]
    fn test_either_shift_sprints() {
        let (catalog, mut resolver) = resolver();
        let sprint = catalog.find_action("Player", "Sprint").unwrap();

        let events = resolver.resolve(&key(KeyCode::ShiftRight, true), |_| true);
        assert_eq!(events[0].action, sprint);

        // Second shift keeps the same activation alive.
        assert!(resolver.resolve(&key(KeyCode::ShiftLeft, true), |_| true).is_empty());
        assert!(resolver.resolve(&key(KeyCode::ShiftRight, false), |_| true).is_empty());

        let events = resolver.resolve(&key(KeyCode::ShiftLeft, false), |_| true);
        assert_eq!(phases(&events), [Phase::Canceled]);
    }

    #[test]
    fn test_wasd_composite() {
        let (_, mut resolver) = resolver();

        let events = resolver.resolve(&key(KeyCode::KeyW, true), |_| true);
        assert_eq!(phases(&events), [Phase::Performed]);
        assert_eq!(events[0].value, ActionValue::Vector2(Vec2::Y));

        let events = resolver.resolve(&key(KeyCode::KeyD, true), |_| true);
        assert_eq!(phases(&events), [Phase::Performed]);
        let diagonal = events[0].value.as_vec2();
        assert!((diagonal.length() - 1.0).abs() < 1e-5);
        assert!(diagonal.x > 0.0 && diagonal.y > 0.0);

        // Opposite keys cancel out but the activation stays until release.
        resolver.resolve(&key(KeyCode::KeyD, false), |_| true);
        let events = resolver.resolve(&key(KeyCode::KeyS, true), |_| true);
        assert_eq!(phases(&events), [Phase::Canceled]);
        assert_eq!(events[0].value, ActionValue::Vector2(Vec2::ZERO));
    }

    #[test]
    fn test_shared_key_resolves_only_enabled_mode() {
        let (catalog, mut resolver) = resolver();
        let player = catalog.find_mode("Player").unwrap().id;
        let pause = catalog.find_action("Player", "Pause").unwrap();

        let events = resolver.resolve(&key(KeyCode::Escape, true), |m| m == player);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.action == pause));
    }

    #[test]
    fn test_sync_modes_forgets_disabled_activations() {
        let (catalog, mut resolver) = resolver();
        let player = catalog.find_mode("Player").unwrap().id;
        let sprint = catalog.find_action("Player", "Sprint").unwrap();

        resolver.resolve(&key(KeyCode::ShiftLeft, true), |_| true);
        assert!(resolver.is_active(sprint));

        resolver.sync_modes(|m| m != player);
        assert!(!resolver.is_active(sprint));

        // The release of a forgotten activation produces nothing.
        assert!(resolver.resolve(&key(KeyCode::ShiftLeft, false), |_| true).is_empty());
    }

    #[test]
    fn test_mouse_delta_drives_look() {
        let (catalog, mut resolver) = resolver();
        let look = catalog.find_action("Player", "Look").unwrap();

        let delta = PhysicalInput::MouseDelta(Vec2::new(3.0, -1.0));
        let events = resolver.resolve(&delta, |_| true);
        assert_eq!(phases(&events), [Phase::Performed]);
        assert_eq!(events[0].action, look);
        assert_eq!(events[0].value, ActionValue::Vector2(Vec2::new(3.0, -1.0)));
        assert!(resolver.is_active(look));

        // Still moving this frame: nothing to cancel.
        assert!(resolver.end_frame(|_| true).is_empty());

        // A frame without movement cancels the activation.
        let events = resolver.end_frame(|_| true);
        assert_eq!(phases(&events), [Phase::Canceled]);
        assert_eq!(events[0].value, ActionValue::Vector2(Vec2::ZERO));
    }

    #[test]
    fn test_value_action_starts_before_performing() {
        let json = r#"{ "name": "Aim", "maps": [ { "name": "Player",
            "actions": [
                { "name": "Look", "type": "Value", "expectedControlType": "Vector2" },
                { "name": "Steer", "type": "Value", "expectedControlType": "Vector2" }
            ],
            "bindings": [
                { "path": "<Mouse>/delta", "action": "Look" },
                { "name": "WASD", "path": "2DVector", "action": "Steer", "isComposite": true },
                { "name": "up", "path": "<Keyboard>/w", "action": "Steer", "isPartOfComposite": true }
            ] } ] }"#;
        let catalog = Arc::new(ActionCatalog::from_json(json).unwrap());
        let mut resolver = BindingResolver::new(catalog);

        let events = resolver.resolve(&PhysicalInput::MouseDelta(Vec2::X), |_| true);
        assert_eq!(phases(&events), [Phase::Started, Phase::Performed]);

        let events = resolver.resolve(&key(KeyCode::KeyW, true), |_| true);
        assert_eq!(phases(&events), [Phase::Started, Phase::Performed]);

        let events = resolver.resolve(&PhysicalInput::MouseDelta(Vec2::Y), |_| true);
        assert_eq!(phases(&events), [Phase::Performed]);
    }

    #[test]
    fn test_control_scheme_mask() {
        let catalog = Arc::new(ActionCatalog::game_inputs().unwrap());
        let mut resolver =
            BindingResolver::with_scheme(catalog, Some("Controller".to_string()));

        // Keyboard bindings are outside the Controller group.
        assert!(resolver.resolve(&key(KeyCode::Space, true), |_| true).is_empty());
        assert!(resolver
            .resolve(&PhysicalInput::MouseDelta(Vec2::ONE), |_| true)
            .is_empty());
    }
}
