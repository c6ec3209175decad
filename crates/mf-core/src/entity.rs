use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::component::{AutoDestroy, Component, ViewBinding, short_type_name};
use crate::error::{EcsError, EcsResult};
use crate::pool::{ComponentPool, Leased};
use crate::view::ViewBridge;

/// Identity of an entity, unique among the entities a world has ever
/// created. Ids are handed out by the world and never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The concrete kind of an entity. Stamped once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// The map camera.
    Camera,
    /// The map-level game controller.
    MapGame,
    /// A hostile creature.
    Monster,
    /// The player character.
    Player,
    /// A map hazard with a trigger zone.
    Trap,
    /// A lootable container.
    TreasureBox,
    /// Static decoration with no behaviour.
    Prop,
}

impl EntityType {
    /// Every variant, in declaration order.
    pub const ALL: [EntityType; 7] = [
        Self::Camera,
        Self::MapGame,
        Self::Monster,
        Self::Player,
        Self::Trap,
        Self::TreasureBox,
        Self::Prop,
    ];
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::MapGame => write!(f, "map_game"),
            Self::Monster => write!(f, "monster"),
            Self::Player => write!(f, "player"),
            Self::Trap => write!(f, "trap"),
            Self::TreasureBox => write!(f, "treasure_box"),
            Self::Prop => write!(f, "prop"),
        }
    }
}

/// A simulation object: identity, type tag, and at most one component per
/// component type.
///
/// Components are leased from the owning world's [`ComponentPool`] and go
/// back to it when the entity is destroyed. Only the world attaches and
/// detaches components, so every lease an entity holds is the world's.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    entity_type: EntityType,
    initialized: bool,
    components: HashMap<TypeId, Leased>,
    // Attach order, for deterministic release and listing.
    order: Vec<TypeId>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, entity_type: EntityType) -> Self {
        Self {
            id,
            entity_type,
            initialized: false,
            components: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// This entity's id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The type stamped at creation.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Whether the kind's init hook has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Record that the kind's init hook ran. A second call is a usage error.
    pub fn mark_initialized(&mut self) -> EcsResult<()> {
        if self.initialized {
            warn!(entity = %self.id, "init hook invoked twice");
            return Err(EcsError::AlreadyInitialized(self.id));
        }
        self.initialized = true;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    /// Lease a `T` from `pool` and attach it. Fails without leasing anything
    /// if a `T` is already attached.
    pub(crate) fn add_component<T: Component>(
        &mut self,
        pool: &mut ComponentPool,
    ) -> EcsResult<&mut T> {
        let type_id = TypeId::of::<T>();
        if self.components.contains_key(&type_id) {
            warn!(entity = %self.id, component = short_type_name::<T>(), "duplicate component rejected");
            return Err(EcsError::DuplicateComponent {
                entity: self.id,
                component: short_type_name::<T>(),
            });
        }

        self.order.push(type_id);
        let leased = self
            .components
            .entry(type_id)
            .or_insert_with(|| pool.lease::<T>());
        leased.get_mut::<T>().ok_or(EcsError::ComponentNotFound {
            entity: self.id,
            component: short_type_name::<T>(),
        })
    }

    /// The attached `T`, if any.
    pub fn component<T: Component>(&self) -> Option<&T> {
        self.components.get(&TypeId::of::<T>())?.get::<T>()
    }

    /// Mutable access to the attached `T`, if any.
    pub fn component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut(&TypeId::of::<T>())?.get_mut::<T>()
    }

    /// Like [`Entity::component`], but a missing component is an error.
    pub fn require<T: Component>(&self) -> EcsResult<&T> {
        self.component::<T>().ok_or(EcsError::ComponentNotFound {
            entity: self.id,
            component: short_type_name::<T>(),
        })
    }

    /// Whether a `T` is attached.
    pub fn has<T: Component>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<T>())
    }

    /// Detach the `T` and return it to `pool`. If `pool` would refuse the
    /// lease, the component stays attached.
    pub(crate) fn remove_component<T: Component>(
        &mut self,
        pool: &mut ComponentPool,
    ) -> EcsResult<()> {
        let type_id = TypeId::of::<T>();
        let Some(leased) = self.components.get(&type_id) else {
            return Err(EcsError::ComponentNotFound {
                entity: self.id,
                component: short_type_name::<T>(),
            });
        };
        pool.check_release(leased.ticket())?;

        let Some(leased) = self.components.remove(&type_id) else {
            return Ok(());
        };
        self.order.retain(|t| *t != type_id);
        pool.release(leased)
    }

    /// Short type names of attached components, in attach order.
    pub fn component_names(&self) -> Vec<&'static str> {
        self.order
            .iter()
            .filter_map(|t| self.components.get(t))
            .map(|leased| leased.erased().component_name())
            .collect()
    }

    /// Number of attached components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // -----------------------------------------------------------------------
    // Destruction
    // -----------------------------------------------------------------------

    /// Destruction hook.
    ///
    /// Releases every owned component back to `pool`. A bound entity (one
    /// whose [`ViewBinding`] holds a handle) also releases its view, but only
    /// when its [`AutoDestroy`] component is enabled.
    pub(crate) fn on_destroy(
        &mut self,
        pool: &mut ComponentPool,
        views: &mut dyn ViewBridge,
    ) -> EcsResult<()> {
        let auto_destroy = self.component::<AutoDestroy>().is_some_and(|a| a.enabled);
        if auto_destroy
            && let Some(handle) = self.component::<ViewBinding>().and_then(|b| b.handle)
        {
            debug!(entity = %self.id, %handle, "releasing bound view");
            views.release(handle);
        }

        self.release_components(pool)
    }

    /// Release every component back to `pool`, last attached first. Keeps
    /// going past a lease the pool refuses, leaves that component attached,
    /// and reports the first failure.
    pub(crate) fn release_components(&mut self, pool: &mut ComponentPool) -> EcsResult<()> {
        let mut first_err = None;
        let mut kept = Vec::new();
        for type_id in std::mem::take(&mut self.order).into_iter().rev() {
            let Some(ticket) = self.components.get(&type_id).map(Leased::ticket) else {
                continue;
            };
            if let Err(e) = pool.check_release(ticket) {
                first_err.get_or_insert(e);
                kept.push(type_id);
                continue;
            }
            if let Some(leased) = self.components.remove(&type_id)
                && let Err(e) = pool.release(leased)
            {
                first_err.get_or_insert(e);
            }
        }
        kept.reverse();
        self.order = kept;
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Position, Velocity};
    use crate::pool::PoolStats;
    use crate::view::{HeadlessViews, ViewHandle};

    fn monster() -> Entity {
        Entity::new(EntityId(7), EntityType::Monster)
    }

    #[test]
    fn entity_id_display() {
        assert_eq!(EntityId(42).to_string(), "#42");
    }

    #[test]
    fn entity_type_display_is_snake_case() {
        assert_eq!(EntityType::TreasureBox.to_string(), "treasure_box");
        assert_eq!(EntityType::MapGame.to_string(), "map_game");
    }

    #[test]
    fn add_and_get_component() {
        let mut pool = ComponentPool::new();
        let mut e = monster();
        e.add_component::<Position>(&mut pool).unwrap().x = 3.0;
        assert_eq!(e.component::<Position>().unwrap().x, 3.0);
        assert!(e.has::<Position>());
        assert!(!e.has::<Velocity>());
        assert!(e.component::<Velocity>().is_none());
    }

    #[test]
    fn duplicate_component_rejected_without_mutation() {
        let mut pool = ComponentPool::new();
        let mut e = monster();
        e.add_component::<Position>(&mut pool).unwrap().x = 3.0;

        let err = e.add_component::<Position>(&mut pool).unwrap_err();
        assert_eq!(
            err,
            EcsError::DuplicateComponent {
                entity: EntityId(7),
                component: "Position"
            }
        );
        assert_eq!(e.component::<Position>().unwrap().x, 3.0);
        assert_eq!(e.component_count(), 1);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn require_missing_component_fails() {
        let e = monster();
        assert!(matches!(
            e.require::<Velocity>(),
            Err(EcsError::ComponentNotFound { component: "Velocity", .. })
        ));
    }

    #[test]
    fn remove_component_returns_it_to_pool() {
        let mut pool = ComponentPool::new();
        let mut e = monster();
        e.add_component::<Position>(&mut pool).unwrap();
        e.remove_component::<Position>(&mut pool).unwrap();
        assert!(!e.has::<Position>());
        assert_eq!(pool.idle::<Position>(), 1);
        assert!(e.remove_component::<Position>(&mut pool).is_err());
    }

    #[test]
    fn remove_into_foreign_pool_keeps_component() {
        let mut pool = ComponentPool::new();
        let mut other = ComponentPool::new();
        let mut e = monster();
        e.add_component::<Velocity>(&mut pool).unwrap().x = 2.0;

        let err = e.remove_component::<Velocity>(&mut other).unwrap_err();
        assert!(matches!(err, EcsError::ForeignRelease { .. }));
        assert_eq!(e.component::<Velocity>().unwrap().x, 2.0);
        assert_eq!(other.stats(), PoolStats::default());
        assert_eq!(pool.outstanding(), 1);

        e.remove_component::<Velocity>(&mut pool).unwrap();
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn release_into_foreign_pool_keeps_refused_leases() {
        let mut pool = ComponentPool::new();
        let mut other = ComponentPool::new();
        let mut e = monster();
        e.add_component::<Position>(&mut pool).unwrap();
        e.add_component::<Velocity>(&mut pool).unwrap();

        assert!(e.release_components(&mut other).is_err());
        assert_eq!(e.component_names(), vec!["Position", "Velocity"]);

        e.release_components(&mut pool).unwrap();
        assert_eq!(e.component_count(), 0);
        assert_eq!(
            pool.stats(),
            PoolStats {
                constructed: 2,
                idle: 2,
                outstanding: 0
            }
        );
    }

    #[test]
    fn init_only_once() {
        let mut e = monster();
        e.mark_initialized().unwrap();
        assert_eq!(e.mark_initialized(), Err(EcsError::AlreadyInitialized(EntityId(7))));
    }

    #[test]
    fn component_names_in_attach_order() {
        let mut pool = ComponentPool::new();
        let mut e = monster();
        e.add_component::<Velocity>(&mut pool).unwrap();
        e.add_component::<Position>(&mut pool).unwrap();
        assert_eq!(e.component_names(), vec!["Velocity", "Position"]);
    }

    #[test]
    fn on_destroy_releases_everything() {
        let mut pool = ComponentPool::new();
        let mut views = HeadlessViews::new();
        let mut e = monster();
        e.add_component::<Position>(&mut pool).unwrap();
        e.add_component::<Velocity>(&mut pool).unwrap();

        e.on_destroy(&mut pool, &mut views).unwrap();
        assert_eq!(e.component_count(), 0);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.stats().idle, 2);
    }

    #[test]
    fn on_destroy_releases_view_only_when_auto_destroy() {
        let mut pool = ComponentPool::new();
        let mut views = HeadlessViews::new();

        let mut kept = monster();
        kept.add_component::<ViewBinding>(&mut pool).unwrap().handle = Some(ViewHandle(1));
        kept.on_destroy(&mut pool, &mut views).unwrap();
        assert_eq!(views.released(), 0);

        let mut owned = monster();
        owned.add_component::<ViewBinding>(&mut pool).unwrap().handle = Some(ViewHandle(2));
        owned.add_component::<AutoDestroy>(&mut pool).unwrap().enabled = true;
        owned.on_destroy(&mut pool, &mut views).unwrap();
        assert_eq!(views.released(), 1);
    }
}
