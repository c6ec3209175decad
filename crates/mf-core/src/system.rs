use std::any::Any;
use std::fmt;

use tracing::warn;

use crate::context::SystemContext;
use crate::entity::{Entity, EntityId};
use crate::error::{EcsError, EcsResult};
use crate::event::{Subscriptions, WorldEvent};
use crate::world::WorldId;

/// Handle to a system registered with a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub u32);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sys{}", self.0)
    }
}

/// Logic operating over the entities its [`filter`](System::filter) selects.
///
/// Every hook but `name` and the downcasting helpers has a no-op default,
/// so a system implements only the phases it needs. Phase hooks return a
/// result; the world logs a failure, lets the remaining systems finish the
/// pass, and then hands the first error back to its caller.
///
/// Membership is owned by the world. Hooks read it through
/// [`SystemContext::members`] and change it only indirectly, by mutating
/// components or queueing structural commands.
pub trait System: fmt::Debug {
    /// Human-readable name for this system.
    fn name(&self) -> &str;

    /// Whether `entity` belongs to this system. Must not have side effects.
    fn filter(&self, _entity: &Entity) -> bool {
        false
    }

    /// Declare the world events this system wants delivered to `on_event`.
    fn add_events(&mut self, _subs: &mut Subscriptions) {}

    /// Counterpart of `add_events`, called first during removal.
    fn remove_events(&mut self) {}

    /// The system was registered with a world.
    fn on_add_to_world(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// The system is leaving its world. Members have already been removed.
    fn on_remove_from_world(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// `entity` just joined the membership.
    fn on_add(&mut self, _ctx: &mut SystemContext<'_>, _entity: EntityId) {}

    /// `entity` is about to leave the membership. Its components are still
    /// attached.
    fn on_remove(&mut self, _ctx: &mut SystemContext<'_>, _entity: EntityId) {}

    /// Runs once per render pass, before `process`.
    fn pre_process(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        Ok(())
    }

    /// Called once per member, in membership order, between `pre_process`
    /// and `post_process`.
    fn process(
        &mut self,
        _ctx: &mut SystemContext<'_>,
        _entity: EntityId,
        _dt: f32,
    ) -> EcsResult<()> {
        Ok(())
    }

    /// Runs once per render pass, after `process`.
    fn post_process(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        Ok(())
    }

    /// One fixed logic frame. `dt` is always the same value.
    fn logic_update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        Ok(())
    }

    /// One physics step.
    fn fixed_update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        Ok(())
    }

    /// Runs after the render pass of every frame.
    fn late_update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        Ok(())
    }

    /// A subscribed world event.
    fn on_event(&mut self, _ctx: &mut SystemContext<'_>, _event: &WorldEvent) {}

    /// Support downcasting to concrete types for cross-system communication.
    fn as_any(&self) -> &dyn Any;

    /// Support downcasting to concrete types for cross-system communication.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Ordered, duplicate-free list of the entities a system holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    ids: Vec<EntityId>,
}

impl Membership {
    /// Append `id`. Returns false if it is already a member.
    pub fn add(&mut self, id: EntityId) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove `id`, keeping the order of the rest. Returns false if it was
    /// not a member.
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.ids.iter().position(|e| *e == id) {
            Some(index) => {
                self.ids.remove(index);
                true
            }
            None => false,
        }
    }

    /// Most recently added member. Removing members one at a time from
    /// here empties the list in reverse insertion order.
    pub fn last(&self) -> Option<EntityId> {
        self.ids.last().copied()
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    /// Members in insertion order.
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when there are no members.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Bookkeeping the world keeps for each registered system.
#[derive(Debug, Clone)]
pub struct SystemState {
    id: SystemId,
    name: String,
    owner: Option<WorldId>,
    enabled: bool,
    members: Membership,
}

impl SystemState {
    pub(crate) fn new(id: SystemId, name: impl Into<String>, owner: WorldId) -> Self {
        Self {
            id,
            name: name.into(),
            owner: Some(owner),
            enabled: true,
            members: Membership::default(),
        }
    }

    /// The id the world assigned.
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// The system's name, captured at registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The world this system is registered with. Fails once the system
    /// has been removed.
    pub fn owner_world(&self) -> EcsResult<WorldId> {
        self.owner
            .ok_or_else(|| EcsError::SystemDetached(self.name.clone()))
    }

    /// Whether phase hooks run. Events are delivered either way.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current members.
    pub fn members(&self) -> &Membership {
        &self.members
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn add_member(&mut self, id: EntityId) -> bool {
        let added = self.members.add(id);
        if !added {
            warn!(system = %self.name, entity = %id, "entity is already a member");
        }
        added
    }

    pub(crate) fn remove_member(&mut self, id: EntityId) -> bool {
        let removed = self.members.remove(id);
        if !removed {
            warn!(system = %self.name, entity = %id, "entity is not a member");
        }
        removed
    }

    /// Final step of removal: clear the owner and force-disable.
    pub(crate) fn detach(&mut self) {
        self.owner = None;
        self.enabled = false;
    }
}

/// A system taken out of its world by `World::remove_system`.
#[derive(Debug)]
pub struct DetachedSystem {
    pub(crate) state: SystemState,
    pub(crate) system: Box<dyn System>,
}

impl DetachedSystem {
    /// The system's name.
    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Always `Err(EcsError::SystemDetached)`.
    pub fn owner_world(&self) -> EcsResult<WorldId> {
        self.state.owner_world()
    }

    /// Always false once detached.
    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Bookkeeping as it stood at removal.
    pub fn state(&self) -> &SystemState {
        &self.state
    }

    /// Borrow the system as its concrete type.
    pub fn downcast_ref<S: System + 'static>(&self) -> Option<&S> {
        self.system.as_any().downcast_ref::<S>()
    }

    /// Take the system back.
    pub fn into_inner(self) -> Box<dyn System> {
        self.system
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_rejects_duplicates() {
        let mut m = Membership::default();
        assert!(m.add(EntityId(1)));
        assert!(m.add(EntityId(2)));
        assert!(!m.add(EntityId(1)));
        assert_eq!(m.ids(), &[EntityId(1), EntityId(2)]);
    }

    #[test]
    fn membership_remove_keeps_order() {
        let mut m = Membership::default();
        for i in 1..=4 {
            m.add(EntityId(i));
        }
        assert!(m.remove(EntityId(2)));
        assert!(!m.remove(EntityId(2)));
        assert_eq!(m.ids(), &[EntityId(1), EntityId(3), EntityId(4)]);
    }

    #[test]
    fn popping_from_last_empties_in_reverse() {
        let mut m = Membership::default();
        for i in 1..=3 {
            m.add(EntityId(i));
        }
        let mut order = Vec::new();
        while let Some(id) = m.last() {
            m.remove(id);
            order.push(id);
        }
        assert_eq!(order, vec![EntityId(3), EntityId(2), EntityId(1)]);
        assert!(m.is_empty());
    }

    #[test]
    fn detached_state_reports_error() {
        let mut state = SystemState::new(SystemId(3), "movement", WorldId(9));
        assert_eq!(state.owner_world(), Ok(WorldId(9)));
        assert!(state.is_enabled());

        state.detach();
        assert_eq!(
            state.owner_world(),
            Err(EcsError::SystemDetached("movement".into()))
        );
        assert!(!state.is_enabled());
    }

    #[test]
    fn state_member_edits_report_misuse() {
        let mut state = SystemState::new(SystemId(1), "s", WorldId(1));
        assert!(state.add_member(EntityId(5)));
        assert!(!state.add_member(EntityId(5)));
        assert_eq!(state.members().len(), 1);
        assert!(state.remove_member(EntityId(5)));
        assert!(!state.remove_member(EntityId(5)));
    }
}
