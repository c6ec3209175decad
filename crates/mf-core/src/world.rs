use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, trace_span, warn};

use crate::component::{Component, short_type_name};
use crate::context::{Command, CommandQueue, SystemContext};
use crate::entity::{Entity, EntityId, EntityType};
use crate::error::{EcsError, EcsResult};
use crate::event::{EventBus, EventLog, Subscriptions, WorldEvent};
use crate::kind::{EntityBuilder, EntityKind};
use crate::pool::{ComponentPool, PoolStats};
use crate::registry::EntityRegistry;
use crate::system::{DetachedSystem, System, SystemId, SystemState};
use crate::view::{HeadlessViews, ViewBridge};

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);

/// Upper bound on command/event rounds after a single operation.
const MAX_FLUSH_ROUNDS: usize = 64;

/// Process-unique handle to a world. Systems hold this instead of a
/// reference back to the world that owns them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WorldId(pub u32);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world{}", self.0)
    }
}

/// Construction parameters for a [`World`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Name used in logs and reports.
    pub name: String,
    /// Events kept in the history log (0 = unlimited).
    pub event_history: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "world".to_string(),
            event_history: 256,
        }
    }
}

impl WorldConfig {
    /// Defaults with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set how many events the history keeps.
    pub fn with_event_history(mut self, event_history: usize) -> Self {
        self.event_history = event_history;
        self
    }
}

/// The tick phases a world dispatches to its systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Render,
    Logic,
    Fixed,
    Late,
}

#[derive(Debug)]
struct SystemSlot {
    state: SystemState,
    system: Box<dyn System>,
}

/// The aggregate root. Owns every entity, every system, the component
/// pool, and the view bridge.
///
/// Systems run in registration order for every phase. Structural changes
/// requested from inside a hook are applied once the whole pass is done,
/// followed by delivery of the world events the pass produced.
#[derive(Debug)]
pub struct World {
    id: WorldId,
    name: String,
    entities: EntityRegistry,
    systems: Vec<SystemSlot>,
    last_system: u32,
    pool: ComponentPool,
    views: Box<dyn ViewBridge>,
    commands: CommandQueue,
    events: EventBus,
}

impl World {
    /// An empty world with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(WorldConfig::new(name))
    }

    /// An empty world with the headless view bridge.
    pub fn with_config(config: WorldConfig) -> Self {
        let id = WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed));
        info!(world = %id, name = %config.name, "world created");
        Self {
            id,
            name: config.name,
            entities: EntityRegistry::default(),
            systems: Vec::new(),
            last_system: 0,
            pool: ComponentPool::new(),
            views: Box::new(HeadlessViews::new()),
            commands: CommandQueue::default(),
            events: EventBus::new(config.event_history),
        }
    }

    /// Replace the view bridge. Intended for use before any entity exists.
    pub fn with_views(mut self, views: impl ViewBridge + 'static) -> Self {
        self.views = Box::new(views);
        self
    }

    /// This world's id.
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// This world's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------------
    // Systems
    // -----------------------------------------------------------------------

    /// Register `system` at the end of the dispatch order and offer it
    /// every existing entity.
    pub fn create_system<S: System + 'static>(&mut self, system: S) -> SystemId {
        self.last_system += 1;
        let id = SystemId(self.last_system);
        let mut system: Box<dyn System> = Box::new(system);
        let state = SystemState::new(id, system.name(), self.id);

        let mut subs = Subscriptions::default();
        system.add_events(&mut subs);
        self.events.subscribe(id, subs);

        debug!(world = %self.id, system = %id, name = state.name(), "system registered");
        self.systems.push(SystemSlot { state, system });
        let index = self.systems.len() - 1;
        self.with_system(index, |sys, ctx| sys.on_add_to_world(ctx));

        for entity in self.entities.ids().to_vec() {
            self.offer_to(index, entity);
        }
        self.flush();
        id
    }

    /// Take `id` out of the world. Members leave in reverse insertion
    /// order, each with `on_remove`, before `on_remove_from_world` runs.
    pub fn remove_system(&mut self, id: SystemId) -> EcsResult<DetachedSystem> {
        let detached = self.detach_system(id)?;
        self.flush();
        Ok(detached)
    }

    fn detach_system(&mut self, id: SystemId) -> EcsResult<DetachedSystem> {
        let index = self.index_of(id).ok_or(EcsError::SystemNotFound(id))?;
        if let Some(slot) = self.systems.get_mut(index) {
            slot.system.remove_events();
        }
        self.events.unsubscribe(id);

        while let Some(entity) = self
            .systems
            .get(index)
            .and_then(|slot| slot.state.members().last())
        {
            self.with_system(index, |sys, ctx| sys.on_remove(ctx, entity));
            if let Some(slot) = self.systems.get_mut(index) {
                slot.state.remove_member(entity);
            }
        }

        self.with_system(index, |sys, ctx| sys.on_remove_from_world(ctx));
        let SystemSlot { mut state, system } = self.systems.remove(index);
        state.detach();
        debug!(world = %self.id, system = %id, name = state.name(), "system removed");
        Ok(DetachedSystem { state, system })
    }

    /// Turn a system's phase hooks on or off.
    pub fn set_system_enabled(&mut self, id: SystemId, enabled: bool) -> EcsResult<()> {
        let slot = self
            .systems
            .iter_mut()
            .find(|s| s.state.id() == id)
            .ok_or(EcsError::SystemNotFound(id))?;
        slot.state.set_enabled(enabled);
        Ok(())
    }

    /// First registered system of type `S`.
    pub fn system<S: System + 'static>(&self) -> Option<&S> {
        self.systems
            .iter()
            .find_map(|s| s.system.as_any().downcast_ref::<S>())
    }

    /// Mutable access to the first registered system of type `S`.
    pub fn system_mut<S: System + 'static>(&mut self) -> Option<&mut S> {
        self.systems
            .iter_mut()
            .find_map(|s| s.system.as_any_mut().downcast_mut::<S>())
    }

    /// Bookkeeping for system `id`.
    pub fn system_state(&self, id: SystemId) -> EcsResult<&SystemState> {
        self.systems
            .iter()
            .find(|s| s.state.id() == id)
            .map(|s| &s.state)
            .ok_or(EcsError::SystemNotFound(id))
    }

    /// Current membership of `id`, in insertion order.
    pub fn members(&self, id: SystemId) -> EcsResult<&[EntityId]> {
        Ok(self.system_state(id)?.members().ids())
    }

    /// Registered systems in dispatch order.
    pub fn system_ids(&self) -> Vec<SystemId> {
        self.systems.iter().map(|s| s.state.id()).collect()
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Add `entity` to `system` directly, bypassing the filter. Returns
    /// false if either is unknown or the entity is already a member.
    pub fn add_system_entity(&mut self, system: SystemId, entity: EntityId) -> bool {
        let Some(index) = self.index_of(system) else {
            warn!(%system, %entity, "membership add on unknown system");
            return false;
        };
        if !self.entities.contains(entity) {
            warn!(%system, %entity, "membership add of unknown entity");
            return false;
        }
        let added = self
            .systems
            .get_mut(index)
            .is_some_and(|slot| slot.state.add_member(entity));
        if added {
            self.with_system(index, |sys, ctx| sys.on_add(ctx, entity));
            self.flush();
        }
        added
    }

    /// Remove `entity` from `system` directly. Returns false if it was not
    /// a member.
    pub fn remove_system_entity(&mut self, system: SystemId, entity: EntityId) -> bool {
        let Some(index) = self.index_of(system) else {
            warn!(%system, %entity, "membership remove on unknown system");
            return false;
        };
        let is_member = self
            .systems
            .get(index)
            .is_some_and(|slot| slot.state.members().contains(entity));
        if is_member {
            self.with_system(index, |sys, ctx| sys.on_remove(ctx, entity));
        }
        let removed = self
            .systems
            .get_mut(index)
            .is_some_and(|slot| slot.state.remove_member(entity));
        if removed {
            self.flush();
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Build an entity of `kind`, register it, and offer it to every
    /// system. Matching systems have seen `on_add` by the time this
    /// returns.
    pub fn create_entity<K: EntityKind>(&mut self, kind: K) -> EcsResult<EntityId> {
        let id = self.entities.reserve_id();
        self.construct(id, &kind)?;
        self.flush();
        Ok(id)
    }

    fn construct(&mut self, id: EntityId, kind: &dyn EntityKind) -> EcsResult<()> {
        let mut entity = Entity::new(id, kind.entity_type());
        let built = kind
            .build(&mut EntityBuilder::new(&mut entity, &mut self.pool))
            .and_then(|()| kind.init(&mut entity))
            .and_then(|()| entity.mark_initialized());
        if let Err(e) = built {
            warn!(entity = %id, error = %e, "entity construction failed");
            if let Err(release) = entity.release_components(&mut self.pool) {
                warn!(entity = %id, error = %release, "releasing partial entity failed");
            }
            return Err(e);
        }

        let entity_type = entity.entity_type();
        self.entities.insert(entity);
        debug!(entity = %id, %entity_type, "entity created");
        self.events
            .publish(WorldEvent::EntityCreated { entity: id, entity_type });

        for index in 0..self.systems.len() {
            self.offer_to(index, id);
        }
        Ok(())
    }

    /// Remove `id` from every system holding it, release its components,
    /// and drop it from the registry.
    pub fn destroy_entity(&mut self, id: EntityId) -> EcsResult<()> {
        let result = self.teardown_entity(id);
        self.flush();
        result
    }

    fn teardown_entity(&mut self, id: EntityId) -> EcsResult<()> {
        if !self.entities.contains(id) {
            return Err(EcsError::EntityNotFound(id));
        }

        for index in 0..self.systems.len() {
            let holds = self
                .systems
                .get(index)
                .is_some_and(|slot| slot.state.members().contains(id));
            if holds {
                self.with_system(index, |sys, ctx| sys.on_remove(ctx, id));
                if let Some(slot) = self.systems.get_mut(index) {
                    slot.state.remove_member(id);
                }
            }
        }

        let entity = self
            .entities
            .get_mut(id)
            .ok_or(EcsError::EntityNotFound(id))?;
        let entity_type = entity.entity_type();
        let released = entity.on_destroy(&mut self.pool, self.views.as_mut());
        self.entities.remove(id);
        debug!(entity = %id, %entity_type, "entity destroyed");
        self.events
            .publish(WorldEvent::EntityDestroyed { entity: id, entity_type });
        released
    }

    /// Attach a `T` to `id`, initialise it with `init`, and re-run every
    /// filter for the entity.
    pub fn add_component<T: Component>(
        &mut self,
        id: EntityId,
        init: impl FnOnce(&mut T),
    ) -> EcsResult<()> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(EcsError::EntityNotFound(id))?;
        init(entity.add_component::<T>(&mut self.pool)?);
        self.events.publish(WorldEvent::ComponentAdded {
            entity: id,
            component: short_type_name::<T>(),
        });
        self.refresh(id);
        self.flush();
        Ok(())
    }

    /// Detach the `T` from `id` and re-run every filter for the entity.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> EcsResult<()> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(EcsError::EntityNotFound(id))?;
        entity.remove_component::<T>(&mut self.pool)?;
        self.events.publish(WorldEvent::ComponentRemoved {
            entity: id,
            component: short_type_name::<T>(),
        });
        self.refresh(id);
        self.flush();
        Ok(())
    }

    /// Look up a live entity.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutable access to an entity's component data. Attaching or detaching
    /// components goes through [`World::add_component`] and
    /// [`World::remove_component`].
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// A component of `id`, if both exist.
    pub fn component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(id)?.component::<T>()
    }

    /// Live entities in creation order.
    pub fn entity_ids(&self) -> &[EntityId] {
        self.entities.ids()
    }

    /// Live entities of one type, in creation order.
    pub fn entities_of_type(&self, entity_type: EntityType) -> &[EntityId] {
        self.entities.of_type(entity_type)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Totals for the world's component pool.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// History of published world events.
    pub fn events(&self) -> &EventLog {
        self.events.log()
    }

    /// The world's view bridge.
    pub fn views(&self) -> &dyn ViewBridge {
        self.views.as_ref()
    }

    /// The view bridge as its concrete type.
    pub fn views_as<V: ViewBridge + 'static>(&self) -> Option<&V> {
        self.views.as_any().downcast_ref::<V>()
    }

    // -----------------------------------------------------------------------
    // Tick dispatch
    // -----------------------------------------------------------------------

    /// Render pass: `pre_process`, `process` per member, then
    /// `post_process`, one system at a time.
    pub fn update(&mut self, dt: f32) -> EcsResult<()> {
        self.run_phase(Phase::Render, dt)
    }

    /// One fixed logic frame of `dt` seconds.
    pub fn logic_update(&mut self, dt: f32) -> EcsResult<()> {
        self.run_phase(Phase::Logic, dt)
    }

    /// One physics step of `dt` seconds.
    pub fn fixed_update(&mut self, dt: f32) -> EcsResult<()> {
        self.run_phase(Phase::Fixed, dt)
    }

    /// Late pass, run after the render pass.
    pub fn late_update(&mut self, dt: f32) -> EcsResult<()> {
        self.run_phase(Phase::Late, dt)
    }

    fn run_phase(&mut self, phase: Phase, dt: f32) -> EcsResult<()> {
        let _span = trace_span!("phase", world = %self.id, ?phase).entered();
        let mut first_err = None;

        // Commands are deferred, so the system list is fixed for the pass.
        for index in 0..self.systems.len() {
            let Some(slot) = self.systems.get(index) else {
                break;
            };
            if !slot.state.is_enabled() {
                trace!(system = %slot.state.id(), "skipping disabled system");
                continue;
            }
            let result = self.with_system(index, |sys, ctx| match phase {
                Phase::Render => {
                    let members = ctx.members;
                    sys.pre_process(ctx, dt)?;
                    for &entity in members {
                        sys.process(ctx, entity, dt)?;
                    }
                    sys.post_process(ctx, dt)
                }
                Phase::Logic => sys.logic_update(ctx, dt),
                Phase::Fixed => sys.fixed_update(ctx, dt),
                Phase::Late => sys.late_update(ctx, dt),
            });
            if let Some(Err(e)) = result {
                let name = self.systems.get(index).map_or("?", |s| s.state.name());
                warn!(system = name, ?phase, error = %e, "system phase failed");
                first_err.get_or_insert(e);
            }
        }

        self.flush();
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Destroy every entity, newest first, then remove every system,
    /// newest first. Commands queued by the teardown hooks are discarded.
    pub fn shutdown(&mut self) {
        info!(world = %self.id, entities = self.entities.len(), systems = self.systems.len(), "world shutting down");
        for id in self.entities.ids().to_vec().into_iter().rev() {
            if let Err(e) = self.teardown_entity(id) {
                warn!(entity = %id, error = %e, "entity teardown failed");
            }
        }
        for id in self.system_ids().into_iter().rev() {
            if let Err(e) = self.detach_system(id) {
                warn!(system = %id, error = %e, "system teardown failed");
            }
        }

        let mut discarded = 0usize;
        while self.commands.pop().is_some() {
            discarded += 1;
        }
        self.events.take_pending();
        if discarded > 0 {
            debug!(world = %self.id, discarded, "discarded commands queued during shutdown");
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn index_of(&self, id: SystemId) -> Option<usize> {
        self.systems.iter().position(|s| s.state.id() == id)
    }

    /// Run `f` against the system at `index` with a context borrowing the
    /// rest of the world. The context's member list is a snapshot.
    fn with_system<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut dyn System, &mut SystemContext<'_>) -> R,
    ) -> Option<R> {
        let Self {
            id,
            name,
            entities,
            systems,
            pool,
            views,
            commands,
            events,
            ..
        } = self;
        let slot = systems.get_mut(index)?;
        let members = slot.state.members().ids().to_vec();
        let mut ctx = SystemContext {
            world_id: *id,
            world_name: name.as_str(),
            system: slot.state.id(),
            members: &members,
            entities,
            pool,
            views: views.as_mut(),
            commands,
            events,
        };
        Some(f(slot.system.as_mut(), &mut ctx))
    }

    /// Add `entity` to the system at `index` if its filter accepts it.
    fn offer_to(&mut self, index: usize, entity: EntityId) {
        let Some(e) = self.entities.get(entity) else {
            return;
        };
        let accepted = self
            .systems
            .get_mut(index)
            .is_some_and(|slot| slot.system.filter(e) && slot.state.add_member(entity));
        if accepted {
            trace!(%entity, index, "entity joined system");
            self.with_system(index, |sys, ctx| sys.on_add(ctx, entity));
        }
    }

    /// Re-run every filter for `entity` and fix up membership both ways.
    fn refresh(&mut self, entity: EntityId) {
        for index in 0..self.systems.len() {
            let Some(e) = self.entities.get(entity) else {
                return;
            };
            let Some(slot) = self.systems.get(index) else {
                break;
            };
            let matches = slot.system.filter(e);
            let member = slot.state.members().contains(entity);

            if matches && !member {
                self.offer_to(index, entity);
            } else if !matches && member {
                self.with_system(index, |sys, ctx| sys.on_remove(ctx, entity));
                if let Some(slot) = self.systems.get_mut(index) {
                    slot.state.remove_member(entity);
                }
            }
        }
    }

    fn apply(&mut self, command: Command) {
        let outcome = match command {
            Command::Spawn { id, kind } => self.construct(id, kind.as_ref()),
            Command::Destroy(id) => self.teardown_entity(id),
            Command::Refresh(id) => {
                self.refresh(id);
                Ok(())
            }
            Command::SetEnabled(id, enabled) => self.set_system_enabled(id, enabled),
            Command::RemoveSystem(id) => self.detach_system(id).map(|_| ()),
        };
        if let Err(e) = outcome {
            warn!(world = %self.id, error = %e, "deferred command failed");
        }
    }

    fn deliver_events(&mut self) {
        for event in self.events.take_pending() {
            for system in self.events.subscribers_of(event.topic()) {
                if let Some(index) = self.index_of(system) {
                    self.with_system(index, |sys, ctx| sys.on_event(ctx, &event));
                }
            }
        }
    }

    /// Apply queued commands, then deliver queued events, until both are
    /// empty.
    fn flush(&mut self) {
        for _ in 0..MAX_FLUSH_ROUNDS {
            if self.commands.is_empty() && !self.events.has_pending() {
                return;
            }
            while let Some(command) = self.commands.pop() {
                self.apply(command);
            }
            self.deliver_events();
        }
        if !self.commands.is_empty() || self.events.has_pending() {
            warn!(world = %self.id, rounds = MAX_FLUSH_ROUNDS, "command/event cascade did not settle");
        }
    }
}
