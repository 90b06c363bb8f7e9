//! Static description of the action maps (modes) and their actions.
//!
//! The catalog is built once from a JSON action asset and never mutated
//! afterwards. Lookups by name return [`InputError::ModeNotFound`] or
//! [`InputError::ActionNotFound`]; both mean the asset and the code disagree.

use std::{collections::HashSet, path::Path};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::InputError,
    logical::{ActionId, ActionType, ModeId, ValueKind},
    physical::ControlPath,
};

/// The asset shipped with the crate: "Player" and "UI" maps.
pub const GAME_INPUTS_ASSET: &str = include_str!("../assets/game_inputs.json");

const COMPOSITE_2D: &str = "2DVector";

// ---------------------------------------------------------------------------
// On-disk asset format
// ---------------------------------------------------------------------------

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub name: String,
    #[serde(default)]
    pub maps: Vec<MapEntry>,
    #[serde(default)]
    pub control_schemes: Vec<ControlScheme>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MapEntry {
    pub name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
    #[serde(default)]
    pub bindings: Vec<BindingEntry>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub expected_control_type: String,
    #[serde(default)]
    pub processors: String,
    #[serde(default)]
    pub interactions: String,
    #[serde(default)]
    pub initial_state_check: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BindingEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    pub path: String,
    #[serde(default)]
    pub interactions: String,
    #[serde(default)]
    pub processors: String,
    #[serde(default)]
    pub groups: String,
    pub action: String,
    #[serde(default)]
    pub is_composite: bool,
    #[serde(default)]
    pub is_part_of_composite: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ControlScheme {
    pub name: String,
    pub binding_group: String,
    #[serde(default)]
    pub devices: Vec<DeviceRequirement>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequirement {
    pub device_path: String,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default, rename = "isOR")]
    pub is_or: bool,
}

// ---------------------------------------------------------------------------
// Built catalog
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::Y,
            Direction::Down => Vec2::NEG_Y,
            Direction::Left => Vec2::NEG_X,
            Direction::Right => Vec2::X,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompositePart {
    pub direction: Direction,
    pub control: ControlPath,
    pub groups: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BindingSource {
    Control(ControlPath),
    Composite2D(Vec<CompositePart>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub asset_id: Option<Uuid>,
    pub source: BindingSource,
    pub groups: Vec<String>,
    /// Kept verbatim; processors are never evaluated.
    pub processors: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ActionDef {
    pub id: ActionId,
    pub mode: ModeId,
    pub name: String,
    pub asset_id: Option<Uuid>,
    pub action_type: ActionType,
    pub kind: ValueKind,
    pub bindings: Vec<Binding>,
}

#[derive(Clone, Debug)]
pub struct ModeDef {
    pub id: ModeId,
    pub name: String,
    pub asset_id: Option<Uuid>,
    pub actions: Vec<ActionId>,
}

#[derive(Clone, Debug)]
pub struct ActionCatalog {
    name: String,
    modes: Vec<ModeDef>,
    actions: Vec<ActionDef>,
    control_schemes: Vec<ControlScheme>,
}

impl ActionCatalog {
    /// The bundled "GameInputs" asset.
    pub fn game_inputs() -> Result<Self, InputError> {
        Self::from_json(GAME_INPUTS_ASSET)
    }

    pub fn from_json(json: &str) -> Result<Self, InputError> {
        let asset: AssetFile = serde_json::from_str(json)?;
        Self::from_asset(asset)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("loading input asset from {}", path.display());
        Self::from_json(&json)
    }

    pub fn from_asset(asset: AssetFile) -> Result<Self, InputError> {
        let mut catalog = Self {
            name: asset.name,
            modes: Vec::with_capacity(asset.maps.len()),
            actions: Vec::new(),
            control_schemes: asset.control_schemes,
        };

        let mut mode_names = HashSet::new();
        for map in asset.maps {
            if !mode_names.insert(map.name.clone()) {
                return Err(InputError::Duplicate {
                    what: "action map",
                    name: map.name,
                });
            }
            catalog.add_map(map)?;
        }

        log::debug!(
            "built input catalog '{}': {} maps, {} actions",
            catalog.name,
            catalog.modes.len(),
            catalog.actions.len()
        );

        Ok(catalog)
    }

    fn add_map(&mut self, map: MapEntry) -> Result<(), InputError> {
        let mode_id = ModeId(self.modes.len() as u32);
        let first_action = self.actions.len();

        let mut action_ids = Vec::with_capacity(map.actions.len());
        for entry in map.actions {
            if self.actions[first_action..]
                .iter()
                .any(|a| a.name == entry.name)
            {
                return Err(InputError::Duplicate {
                    what: "action",
                    name: format!("{}/{}", map.name, entry.name),
                });
            }

            let id = ActionId(self.actions.len() as u32);
            let kind = value_kind(&entry)?;
            self.actions.push(ActionDef {
                id,
                mode: mode_id,
                name: entry.name,
                asset_id: entry.id,
                action_type: entry.action_type,
                kind,
                bindings: Vec::new(),
            });
            action_ids.push(id);
        }

        for entry in map.bindings {
            let Some(action) = self.actions[first_action..]
                .iter_mut()
                .find(|a| a.name == entry.action)
            else {
                return Err(InputError::ActionNotFound {
                    mode: map.name.clone(),
                    action: entry.action,
                });
            };
            attach_binding(action, entry)?;
        }

        self.modes.push(ModeDef {
            id: mode_id,
            name: map.name,
            asset_id: map.id,
            actions: action_ids,
        });

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modes(&self) -> &[ModeDef] {
        &self.modes
    }

    pub fn actions(&self) -> &[ActionDef] {
        &self.actions
    }

    pub fn mode(&self, id: ModeId) -> Option<&ModeDef> {
        self.modes.get(id.0 as usize)
    }

    pub fn action(&self, id: ActionId) -> Option<&ActionDef> {
        self.actions.get(id.0 as usize)
    }

    pub fn find_mode(&self, name: &str) -> Result<&ModeDef, InputError> {
        self.modes
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| InputError::ModeNotFound(name.to_string()))
    }

    pub fn find_action(&self, mode: &str, action: &str) -> Result<ActionId, InputError> {
        let mode_def = self.find_mode(mode)?;
        mode_def
            .actions
            .iter()
            .copied()
            .find(|id| {
                self.action(*id)
                    .is_some_and(|def| def.name == action)
            })
            .ok_or_else(|| InputError::ActionNotFound {
                mode: mode.to_string(),
                action: action.to_string(),
            })
    }

    pub fn mode_actions(&self, mode: ModeId) -> impl Iterator<Item = &ActionDef> + '_ {
        self.mode(mode)
            .into_iter()
            .flat_map(|m| m.actions.iter())
            .filter_map(|id| self.action(*id))
    }

    pub fn control_schemes(&self) -> &[ControlScheme] {
        &self.control_schemes
    }

    pub fn control_scheme(&self, name: &str) -> Option<&ControlScheme> {
        self.control_schemes.iter().find(|s| s.name == name)
    }
}

fn value_kind(entry: &ActionEntry) -> Result<ValueKind, InputError> {
    match entry.expected_control_type.as_str() {
        "" | "Button" => Ok(ValueKind::Button),
        "Vector2" | "Stick" | "Dpad" => Ok(ValueKind::Vector2),
        other => Err(InputError::UnsupportedControlType {
            action: entry.name.clone(),
            control_type: other.to_string(),
        }),
    }
}

fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits on commas outside parentheses: `A,B(x=1,y=2)` is two processors.
fn split_processors(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&raw[start..]);

    out.into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn attach_binding(action: &mut ActionDef, entry: BindingEntry) -> Result<(), InputError> {
    let groups = split_list(&entry.groups, ';');

    if entry.is_part_of_composite {
        let Some(BindingSource::Composite2D(parts)) =
            action.bindings.last_mut().map(|b| &mut b.source)
        else {
            return Err(InputError::InvalidBinding {
                action: action.name.clone(),
                reason: format!("part '{}' has no composite before it", entry.name),
            });
        };

        let direction =
            Direction::parse(&entry.name).ok_or_else(|| InputError::InvalidBinding {
                action: action.name.clone(),
                reason: format!("unknown composite part '{}'", entry.name),
            })?;

        parts.push(CompositePart {
            direction,
            control: ControlPath::parse(&entry.path)?,
            groups,
        });
        return Ok(());
    }

    let source = if entry.is_composite {
        if entry.path != COMPOSITE_2D {
            return Err(InputError::InvalidBinding {
                action: action.name.clone(),
                reason: format!("unsupported composite '{}'", entry.path),
            });
        }
        if action.kind != ValueKind::Vector2 {
            return Err(InputError::InvalidBinding {
                action: action.name.clone(),
                reason: "2D composite on a non-vector action".to_string(),
            });
        }
        BindingSource::Composite2D(Vec::new())
    } else {
        BindingSource::Control(ControlPath::parse(&entry.path)?)
    };

    action.bindings.push(Binding {
        asset_id: entry.id,
        source,
        groups,
        processors: split_processors(&entry.processors),
    });

    Ok(())
}
