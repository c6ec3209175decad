//! Concrete entity kinds.
//!
//! A kind decides what an entity is made of: it stamps the
//! [`EntityType`], attaches the kind's components, and runs a one-shot
//! `init` hook once they are in place. The world does the rest.

use std::fmt;

use crate::component::{
    AutoDestroy, Component, Health, Loot, Position, Rotation, StateFlags, TriggerZone, Velocity,
    ViewBinding,
};
use crate::entity::{Entity, EntityType};
use crate::error::EcsResult;
use crate::pool::ComponentPool;
use crate::view::ViewHandle;

/// Recipe for one kind of entity.
pub trait EntityKind: fmt::Debug {
    /// The type tag every entity of this kind carries.
    fn entity_type(&self) -> EntityType;

    /// Attach this kind's components.
    fn build(&self, _entity: &mut EntityBuilder<'_>) -> EcsResult<()> {
        Ok(())
    }

    /// Kind-specific setup, run once after `build`.
    fn init(&self, _entity: &mut Entity) -> EcsResult<()> {
        Ok(())
    }
}

/// Attaches pooled components to an entity under construction.
pub struct EntityBuilder<'a> {
    pub(crate) entity: &'a mut Entity,
    pub(crate) pool: &'a mut ComponentPool,
}

impl<'a> EntityBuilder<'a> {
    pub(crate) fn new(entity: &'a mut Entity, pool: &'a mut ComponentPool) -> Self {
        Self { entity, pool }
    }

    /// Lease a `T`, attach it, and initialise it with `init`.
    pub fn add<T: Component>(&mut self, init: impl FnOnce(&mut T)) -> EcsResult<&mut Self> {
        init(self.entity.add_component::<T>(self.pool)?);
        Ok(self)
    }

    /// Attach a `T` in its reset state.
    pub fn add_default<T: Component>(&mut self) -> EcsResult<&mut Self> {
        self.entity.add_component::<T>(self.pool)?;
        Ok(self)
    }

    /// The entity being built.
    pub fn entity(&self) -> &Entity {
        self.entity
    }
}

fn attach_view(b: &mut EntityBuilder<'_>, resource: Option<&str>) -> EcsResult<()> {
    if let Some(path) = resource {
        b.add::<ViewBinding>(|v| v.resource_path = Some(path.to_string()))?
            .add::<AutoDestroy>(|a| a.enabled = true)?;
    }
    Ok(())
}

/// The map camera.
#[derive(Debug, Clone, Default)]
pub struct Camera {
    /// Where the camera sits.
    pub position: Position,
    /// Heading around the vertical axis, in radians.
    pub yaw: f32,
}

impl EntityKind for Camera {
    fn entity_type(&self) -> EntityType {
        EntityType::Camera
    }

    fn build(&self, b: &mut EntityBuilder<'_>) -> EcsResult<()> {
        b.add::<Position>(|p| *p = self.position)?
            .add::<Rotation>(|r| *r = Rotation::from_yaw(self.yaw))?;
        Ok(())
    }
}

/// Map-level controller. Carries only state flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapGame;

impl EntityKind for MapGame {
    fn entity_type(&self) -> EntityType {
        EntityType::MapGame
    }

    fn build(&self, b: &mut EntityBuilder<'_>) -> EcsResult<()> {
        b.add_default::<StateFlags>()?;
        Ok(())
    }
}

/// A hostile creature that wanders the map.
#[derive(Debug, Clone, Default)]
pub struct Monster {
    /// Spawn point.
    pub position: Position,
    /// Initial velocity. The monster faces along it.
    pub velocity: Velocity,
    /// Starting and maximum hit points.
    pub health: u32,
    /// View resource to bind, if any.
    pub resource: Option<String>,
}

impl Monster {
    /// A stationary monster at `(x, y)` with default health.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Position::new(x, y, 0.0),
            health: 10,
            ..Self::default()
        }
    }

    /// Set the initial velocity on the map plane.
    pub fn with_velocity(mut self, x: f32, y: f32) -> Self {
        self.velocity = Velocity::new(x, y, 0.0);
        self
    }

    /// Set starting and maximum hit points.
    pub fn with_health(mut self, health: u32) -> Self {
        self.health = health;
        self
    }

    /// Bind a view instantiated from `resource`.
    pub fn with_view(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

impl EntityKind for Monster {
    fn entity_type(&self) -> EntityType {
        EntityType::Monster
    }

    fn build(&self, b: &mut EntityBuilder<'_>) -> EcsResult<()> {
        b.add::<Position>(|p| *p = self.position)?
            .add_default::<Rotation>()?
            .add::<Velocity>(|v| *v = self.velocity)?
            .add::<Health>(|h| *h = Health::full(self.health))?
            .add_default::<StateFlags>()?;
        attach_view(b, self.resource.as_deref())
    }

    /// Face the direction of travel.
    fn init(&self, entity: &mut Entity) -> EcsResult<()> {
        let Velocity { x, y, .. } = self.velocity;
        if (x != 0.0 || y != 0.0)
            && let Some(rot) = entity.component_mut::<Rotation>()
        {
            *rot = Rotation::from_yaw(y.atan2(x));
        }
        Ok(())
    }
}

/// The player character. Always interactable.
#[derive(Debug, Clone, Default)]
pub struct Player {
    /// Spawn point.
    pub position: Position,
    /// Starting and maximum hit points.
    pub health: u32,
    /// View resource to bind, if any.
    pub resource: Option<String>,
}

impl Player {
    /// A player at `(x, y)` with default health.
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Position::new(x, y, 0.0),
            health: 100,
            resource: None,
        }
    }

    /// Bind a view instantiated from `resource`.
    pub fn with_view(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

impl EntityKind for Player {
    fn entity_type(&self) -> EntityType {
        EntityType::Player
    }

    fn build(&self, b: &mut EntityBuilder<'_>) -> EcsResult<()> {
        b.add::<Position>(|p| *p = self.position)?
            .add_default::<Rotation>()?
            .add_default::<Velocity>()?
            .add::<Health>(|h| *h = Health::full(self.health))?
            .add_default::<StateFlags>()?;
        attach_view(b, self.resource.as_deref())
    }

    fn init(&self, entity: &mut Entity) -> EcsResult<()> {
        if let Some(flags) = entity.component_mut::<StateFlags>() {
            flags.interactable = true;
        }
        Ok(())
    }
}

/// A hazard that fires when something enters its radius.
#[derive(Debug, Clone, Default)]
pub struct Trap {
    /// Centre of the trigger zone.
    pub position: Position,
    /// Trigger radius. A zero radius leaves the trap disarmed.
    pub radius: f32,
}

impl Trap {
    /// A trap at `(x, y)` with the given radius.
    pub fn at(x: f32, y: f32, radius: f32) -> Self {
        Self {
            position: Position::new(x, y, 0.0),
            radius,
        }
    }
}

impl EntityKind for Trap {
    fn entity_type(&self) -> EntityType {
        EntityType::Trap
    }

    fn build(&self, b: &mut EntityBuilder<'_>) -> EcsResult<()> {
        b.add::<Position>(|p| *p = self.position)?
            .add::<TriggerZone>(|z| z.radius = self.radius)?
            .add_default::<StateFlags>()?;
        Ok(())
    }

    /// A trap with no reach is never armed.
    fn init(&self, entity: &mut Entity) -> EcsResult<()> {
        if let Some(zone) = entity.component_mut::<TriggerZone>() {
            zone.armed = zone.radius > 0.0;
        }
        Ok(())
    }
}

/// A box holding gold.
#[derive(Debug, Clone, Default)]
pub struct TreasureBox {
    /// Where the box sits.
    pub position: Position,
    /// Gold inside.
    pub gold: u32,
}

impl TreasureBox {
    /// A closed box at `(x, y)` holding `gold`.
    pub fn at(x: f32, y: f32, gold: u32) -> Self {
        Self {
            position: Position::new(x, y, 0.0),
            gold,
        }
    }
}

impl EntityKind for TreasureBox {
    fn entity_type(&self) -> EntityType {
        EntityType::TreasureBox
    }

    fn build(&self, b: &mut EntityBuilder<'_>) -> EcsResult<()> {
        b.add::<Position>(|p| *p = self.position)?
            .add::<Loot>(|l| l.gold = self.gold)?
            .add::<StateFlags>(|f| f.interactable = true)?;
        Ok(())
    }
}

/// Scenery wrapping a view that already exists. Whether destroying the
/// prop also destroys the view is up to `auto_destroy`.
#[derive(Debug, Clone)]
pub struct Prop {
    /// Where the prop sits.
    pub position: Position,
    /// The existing view.
    pub handle: ViewHandle,
    /// Release the view when the prop is destroyed.
    pub auto_destroy: bool,
}

impl Prop {
    /// A prop at the origin wrapping `handle`.
    pub fn bound(handle: ViewHandle, auto_destroy: bool) -> Self {
        Self {
            position: Position::default(),
            handle,
            auto_destroy,
        }
    }
}

impl EntityKind for Prop {
    fn entity_type(&self) -> EntityType {
        EntityType::Prop
    }

    fn build(&self, b: &mut EntityBuilder<'_>) -> EcsResult<()> {
        b.add::<Position>(|p| *p = self.position)?
            .add::<ViewBinding>(|v| v.handle = Some(self.handle))?
            .add::<AutoDestroy>(|a| a.enabled = self.auto_destroy)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;

    fn construct(kind: &dyn EntityKind) -> (Entity, ComponentPool) {
        let mut pool = ComponentPool::new();
        let mut entity = Entity::new(EntityId(1), kind.entity_type());
        kind.build(&mut EntityBuilder::new(&mut entity, &mut pool))
            .unwrap();
        kind.init(&mut entity).unwrap();
        (entity, pool)
    }

    #[test]
    fn monster_components() {
        let (e, _) = construct(&Monster::at(2.0, 3.0).with_health(7));
        assert_eq!(e.entity_type(), EntityType::Monster);
        assert_eq!(e.component::<Position>(), Some(&Position::new(2.0, 3.0, 0.0)));
        assert_eq!(e.component::<Health>(), Some(&Health::full(7)));
        assert!(!e.has::<ViewBinding>());
    }

    #[test]
    fn monster_faces_velocity() {
        let (e, _) = construct(&Monster::at(0.0, 0.0).with_velocity(0.0, 1.0));
        let rot = e.component::<Rotation>().unwrap();
        assert!((rot.y - std::f32::consts::FRAC_PI_4.sin()).abs() < 1e-6);
    }

    #[test]
    fn view_resource_implies_auto_destroy() {
        let (e, _) = construct(&Player::at(0.0, 0.0).with_view("prefabs/player"));
        assert_eq!(
            e.component::<ViewBinding>().unwrap().resource_path.as_deref(),
            Some("prefabs/player")
        );
        assert!(e.component::<AutoDestroy>().unwrap().enabled);
        assert!(e.component::<StateFlags>().unwrap().interactable);
    }

    #[test]
    fn zero_radius_trap_is_disarmed() {
        let (armed, _) = construct(&Trap::at(0.0, 0.0, 1.5));
        let (inert, _) = construct(&Trap::at(0.0, 0.0, 0.0));
        assert!(armed.component::<TriggerZone>().unwrap().armed);
        assert!(!inert.component::<TriggerZone>().unwrap().armed);
    }

    #[test]
    fn duplicate_in_build_is_reported() {
        let mut pool = ComponentPool::new();
        let mut entity = Entity::new(EntityId(1), EntityType::Prop);
        let mut b = EntityBuilder::new(&mut entity, &mut pool);
        b.add_default::<Position>().unwrap();
        assert!(b.add_default::<Position>().is_err());
        assert_eq!(b.entity().component_count(), 1);
    }
}
