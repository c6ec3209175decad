use std::any::{Any, TypeId};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::view::ViewHandle;

/// Per-aspect data attached to an entity.
///
/// Components are leased from a [`ComponentPool`](crate::pool::ComponentPool)
/// and reset before they go back. A freshly leased instance always equals
/// `Default::default()`, so `reset` must restore every field; the provided
/// implementation does exactly that.
pub trait Component: Any + fmt::Debug + Default {
    /// Restore the documented pooled state.
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Object-safe view of a [`Component`], used for type-erased storage.
pub trait AnyComponent: Any + fmt::Debug {
    /// Run the component's reset routine.
    fn reset_erased(&mut self);
    /// Borrow as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrow as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// `TypeId` of the concrete component type.
    fn component_type(&self) -> TypeId;
    /// Short type name, for diagnostics.
    fn component_name(&self) -> &'static str;
}

impl<T: Component> AnyComponent for T {
    fn reset_erased(&mut self) {
        Component::reset(self);
    }

    fn component_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_name(&self) -> &'static str {
        short_type_name::<T>()
    }
}

/// Strip the module path from a type name (`mf_core::component::Position` ->
/// `Position`).
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// World-space position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// East-west coordinate.
    pub x: f32,
    /// North-south coordinate.
    pub y: f32,
    /// Height above the map plane.
    pub z: f32,
}

impl Position {
    /// Position at `(x, y, z)`.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance, for range checks without a sqrt.
    pub fn distance_squared(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

impl Component for Position {}

/// Orientation as a unit quaternion. Resets to identity, not to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Quaternion `x` part.
    pub x: f32,
    /// Quaternion `y` part.
    pub y: f32,
    /// Quaternion `z` part.
    pub z: f32,
    /// Quaternion scalar part.
    pub w: f32,
}

impl Rotation {
    /// No rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `radians` around the vertical axis.
    pub fn from_yaw(radians: f32) -> Self {
        let half = radians * 0.5;
        Self {
            x: 0.0,
            y: half.sin(),
            z: 0.0,
            w: half.cos(),
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Rotation {}

/// Movement in world units per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// Units per second along x.
    pub x: f32,
    /// Units per second along y.
    pub y: f32,
    /// Units per second along z.
    pub z: f32,
}

impl Velocity {
    /// Velocity of `(x, y, z)` units per second.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Component for Velocity {}

// ---------------------------------------------------------------------------
// View binding
// ---------------------------------------------------------------------------

/// Link between an entity and its external visual representation.
///
/// Either `handle` is already set (the view was created elsewhere), or
/// `resource_path` names a resource the view bridge can instantiate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewBinding {
    /// Resource the view bridge resolves into a view.
    pub resource_path: Option<String>,
    /// The bound view, once attached.
    pub handle: Option<ViewHandle>,
}

impl ViewBinding {
    /// An unbound binding for `path`.
    pub fn from_resource(path: impl Into<String>) -> Self {
        Self {
            resource_path: Some(path.into()),
            handle: None,
        }
    }

    /// Whether a view handle has been assigned.
    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }
}

impl Component for ViewBinding {}

/// When enabled, destroying the entity also releases its bound view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDestroy {
    /// Release the view when the entity is destroyed.
    pub enabled: bool,
}

impl Component for AutoDestroy {}

// ---------------------------------------------------------------------------
// Gameplay state
// ---------------------------------------------------------------------------

/// Boolean flag set shared by most map entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFlags {
    /// Whether logic systems act on the entity.
    pub active: bool,
    /// Whether the entity's view is shown.
    pub visible: bool,
    /// Whether the player can interact with the entity.
    pub interactable: bool,
}

impl Default for StateFlags {
    fn default() -> Self {
        Self {
            active: true,
            visible: true,
            interactable: false,
        }
    }
}

impl Component for StateFlags {}

/// Hit points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Remaining hit points.
    pub current: u32,
    /// Hit points when fully healed.
    pub max: u32,
}

impl Health {
    /// Health at `max`.
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// True once no hit points remain.
    pub fn is_dead(&self) -> bool {
        self.current == 0
    }
}

impl Component for Health {}

/// Contents of a treasure box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loot {
    /// Gold inside.
    pub gold: u32,
    /// Whether the box has been looted.
    pub opened: bool,
}

impl Component for Loot {}

/// Radius around a trap that triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerZone {
    /// Trigger radius in world units.
    pub radius: f32,
    /// Whether the trap fires when entered.
    pub armed: bool,
}

impl Default for TriggerZone {
    fn default() -> Self {
        Self {
            radius: 0.0,
            armed: true,
        }
    }
}

impl Component for TriggerZone {}
