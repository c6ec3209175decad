use std::collections::VecDeque;

use crate::component::{Component, short_type_name};
use crate::entity::{Entity, EntityId, EntityType};
use crate::error::{EcsError, EcsResult};
use crate::event::{EventBus, WorldEvent};
use crate::kind::EntityKind;
use crate::pool::ComponentPool;
use crate::registry::EntityRegistry;
use crate::system::SystemId;
use crate::view::ViewBridge;
use crate::world::WorldId;

/// Structural change requested from inside a hook.
#[derive(Debug)]
pub(crate) enum Command {
    Spawn { id: EntityId, kind: Box<dyn EntityKind> },
    Destroy(EntityId),
    /// Re-run every filter against the entity.
    Refresh(EntityId),
    SetEnabled(SystemId, bool),
    RemoveSystem(SystemId),
}

/// Commands queued during a pass, applied by the world once the pass ends.
#[derive(Debug, Default)]
pub(crate) struct CommandQueue {
    commands: VecDeque<Command>,
}

impl CommandQueue {
    pub(crate) fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    pub(crate) fn pop(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// The world as seen from inside a system hook.
///
/// Entity and component data can be read and written directly. Attaching
/// or detaching a component also happens immediately, but the membership
/// refresh it triggers is deferred. Spawning, destroying and system
/// changes are queued and applied after every system has finished the
/// current pass, so dispatch within a pass always sees a stable system
/// list.
pub struct SystemContext<'a> {
    pub(crate) world_id: WorldId,
    pub(crate) world_name: &'a str,
    pub(crate) system: SystemId,
    pub(crate) members: &'a [EntityId],
    pub(crate) entities: &'a mut EntityRegistry,
    pub(crate) pool: &'a mut ComponentPool,
    pub(crate) views: &'a mut dyn ViewBridge,
    pub(crate) commands: &'a mut CommandQueue,
    pub(crate) events: &'a mut EventBus,
}

impl SystemContext<'_> {
    /// Id of the world running the hook.
    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    /// Name of the world running the hook.
    pub fn world_name(&self) -> &str {
        self.world_name
    }

    /// The system this hook belongs to.
    pub fn system_id(&self) -> SystemId {
        self.system
    }

    /// Snapshot of this system's membership, taken when the hook started.
    pub fn members(&self) -> &[EntityId] {
        self.members
    }

    /// Look up an entity of this world.
    pub fn entity(&self, id: EntityId) -> EcsResult<&Entity> {
        self.entities.get(id).ok_or(EcsError::EntityNotFound(id))
    }

    /// Mutable access to an entity's component data.
    pub fn entity_mut(&mut self, id: EntityId) -> EcsResult<&mut Entity> {
        self.entities.get_mut(id).ok_or(EcsError::EntityNotFound(id))
    }

    /// A component of `id`, if both exist.
    pub fn component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(id)?.component::<T>()
    }

    /// Mutable access to a component of `id`, if both exist.
    pub fn component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(id)?.component_mut::<T>()
    }

    /// Ids of live entities of one type, in creation order.
    pub fn entities_of_type(&self, entity_type: EntityType) -> &[EntityId] {
        self.entities.of_type(entity_type)
    }

    /// Attach a `T` right away and initialise it with `init`. Membership
    /// is refreshed once the current pass ends.
    pub fn add_component<T: Component>(
        &mut self,
        id: EntityId,
        init: impl FnOnce(&mut T),
    ) -> EcsResult<()> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(EcsError::EntityNotFound(id))?;
        init(entity.add_component::<T>(self.pool)?);
        self.events.publish(WorldEvent::ComponentAdded {
            entity: id,
            component: short_type_name::<T>(),
        });
        self.commands.push(Command::Refresh(id));
        Ok(())
    }

    /// Detach the `T` right away. Membership is refreshed once the current
    /// pass ends, so systems that lose the entity still see it in
    /// `on_remove` without the component.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> EcsResult<()> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(EcsError::EntityNotFound(id))?;
        entity.remove_component::<T>(self.pool)?;
        self.events.publish(WorldEvent::ComponentRemoved {
            entity: id,
            component: short_type_name::<T>(),
        });
        self.commands.push(Command::Refresh(id));
        Ok(())
    }

    /// Queue creation of an entity. The id is reserved now; the entity
    /// exists once the current pass ends.
    pub fn spawn<K: EntityKind + 'static>(&mut self, kind: K) -> EntityId {
        let id = self.entities.reserve_id();
        self.commands.push(Command::Spawn {
            id,
            kind: Box::new(kind),
        });
        id
    }

    /// Queue destruction of an entity.
    pub fn destroy(&mut self, id: EntityId) {
        self.commands.push(Command::Destroy(id));
    }

    /// Queue enabling or disabling a system.
    pub fn set_system_enabled(&mut self, system: SystemId, enabled: bool) {
        self.commands.push(Command::SetEnabled(system, enabled));
    }

    /// Queue removal of a system, possibly the calling one. A system
    /// removed this way still finishes the current pass.
    pub fn remove_system(&mut self, system: SystemId) {
        self.commands.push(Command::RemoveSystem(system));
    }

    /// Publish a custom event to subscribed systems.
    pub fn emit(&mut self, label: impl Into<String>, entities: Vec<EntityId>) {
        self.events.publish(WorldEvent::Custom {
            label: label.into(),
            entities,
        });
    }

    /// The world's view bridge.
    pub fn views(&mut self) -> &mut dyn ViewBridge {
        &mut *self.views
    }
}
