//! Boundary to the presentation layer.
//!
//! The simulation never creates or renders views itself. It asks a
//! [`ViewBridge`] to resolve resources, group views under containers and
//! receive one-way state snapshots. [`HeadlessViews`] is the bridge used
//! when nothing is rendered, and [`ViewSyncSystem`] is the system that
//! drives whichever bridge the world was given.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::component::{Position, Rotation, StateFlags, ViewBinding};
use crate::context::SystemContext;
use crate::entity::{Entity, EntityId, EntityType};
use crate::error::EcsResult;
use crate::system::System;

/// Opaque reference to an external view object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewHandle(pub u64);

impl fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view{}", self.0)
    }
}

/// Entity state pushed to a view. Data only flows entity to view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewSnapshot {
    /// The entity the view shows.
    pub entity: EntityId,
    /// Its type.
    pub entity_type: EntityType,
    /// Position, if the entity has one.
    pub position: Option<Position>,
    /// Rotation, if the entity has one.
    pub rotation: Option<Rotation>,
    /// False only when the entity's state flags hide it.
    pub visible: bool,
}

impl ViewSnapshot {
    /// Read the current state of `entity`.
    pub fn capture(entity: &Entity) -> Self {
        Self {
            entity: entity.id(),
            entity_type: entity.entity_type(),
            position: entity.component::<Position>().copied(),
            rotation: entity.component::<Rotation>().copied(),
            visible: entity.component::<StateFlags>().is_none_or(|f| f.visible),
        }
    }
}

/// Capabilities the simulation consumes from the presentation layer.
pub trait ViewBridge: fmt::Debug {
    /// Instantiate the resource at `path`. `None` if it cannot be found.
    fn resolve_resource(&mut self, path: &str) -> Option<ViewHandle>;

    /// Logical container views of `entity_type` are grouped under.
    fn container_for(&self, entity_type: EntityType) -> String {
        entity_type.to_string()
    }

    /// Bind `handle` to `entity` under `container`.
    fn attach(
        &mut self,
        handle: ViewHandle,
        entity: EntityId,
        entity_type: EntityType,
        container: &str,
    );

    /// Push the latest entity state to a bound view.
    fn sync(&mut self, _handle: ViewHandle, _snapshot: &ViewSnapshot) {}

    /// Destroy the view behind `handle`.
    fn release(&mut self, handle: ViewHandle);

    /// Support downcasting to the concrete bridge.
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attachment {
    entity: EntityId,
    container: String,
}

/// In-memory bridge. Hands out sequential handles and records what the
/// simulation asked for.
#[derive(Debug, Default)]
pub struct HeadlessViews {
    last_handle: u64,
    missing: HashSet<String>,
    live: HashMap<ViewHandle, Attachment>,
    snapshots: HashMap<ViewHandle, ViewSnapshot>,
    syncs: u64,
    released: usize,
}

impl HeadlessViews {
    /// A bridge that resolves every resource.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` unresolvable.
    pub fn with_missing_resource(mut self, path: impl Into<String>) -> Self {
        self.missing.insert(path.into());
        self
    }

    /// Views currently attached.
    pub fn attached(&self) -> usize {
        self.live.len()
    }

    /// Views currently attached under `container`.
    pub fn attached_in(&self, container: &str) -> usize {
        self.live
            .values()
            .filter(|a| a.container == container)
            .count()
    }

    /// The entity `handle` is attached to.
    pub fn entity_of(&self, handle: ViewHandle) -> Option<EntityId> {
        self.live.get(&handle).map(|a| a.entity)
    }

    /// Last snapshot pushed to `handle`.
    pub fn snapshot(&self, handle: ViewHandle) -> Option<&ViewSnapshot> {
        self.snapshots.get(&handle)
    }

    /// Snapshots pushed so far.
    pub fn syncs(&self) -> u64 {
        self.syncs
    }

    /// Views released so far.
    pub fn released(&self) -> usize {
        self.released
    }
}

impl ViewBridge for HeadlessViews {
    fn resolve_resource(&mut self, path: &str) -> Option<ViewHandle> {
        if self.missing.contains(path) {
            return None;
        }
        self.last_handle += 1;
        Some(ViewHandle(self.last_handle))
    }

    fn attach(
        &mut self,
        handle: ViewHandle,
        entity: EntityId,
        _entity_type: EntityType,
        container: &str,
    ) {
        self.live.insert(
            handle,
            Attachment {
                entity,
                container: container.to_string(),
            },
        );
    }

    fn sync(&mut self, handle: ViewHandle, snapshot: &ViewSnapshot) {
        self.syncs += 1;
        self.snapshots.insert(handle, *snapshot);
    }

    fn release(&mut self, handle: ViewHandle) {
        self.live.remove(&handle);
        self.snapshots.remove(&handle);
        self.released += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Binds views to entities carrying a [`ViewBinding`] and keeps them in
/// sync after every render pass.
#[derive(Debug, Default)]
pub struct ViewSyncSystem {
    bound: usize,
    synced: u64,
}

impl ViewSyncSystem {
    /// A system with nothing bound yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Views bound so far.
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Snapshots pushed so far.
    pub fn synced(&self) -> u64 {
        self.synced
    }
}

impl System for ViewSyncSystem {
    fn name(&self) -> &str {
        "view-sync"
    }

    fn filter(&self, entity: &Entity) -> bool {
        entity.has::<ViewBinding>()
    }

    fn on_add(&mut self, ctx: &mut SystemContext<'_>, entity: EntityId) {
        let Ok(e) = ctx.entity(entity) else {
            return;
        };
        let entity_type = e.entity_type();
        let Some(binding) = e.component::<ViewBinding>().cloned() else {
            return;
        };

        let handle = match (binding.handle, binding.resource_path) {
            (Some(handle), _) => handle,
            (None, Some(path)) => match ctx.views().resolve_resource(&path) {
                Some(handle) => handle,
                None => {
                    warn!(%entity, %path, "view resource not found");
                    return;
                }
            },
            (None, None) => return,
        };

        if let Some(b) = ctx.component_mut::<ViewBinding>(entity) {
            b.handle = Some(handle);
        }
        let container = ctx.views().container_for(entity_type);
        ctx.views().attach(handle, entity, entity_type, &container);
        debug!(%entity, %handle, %container, "view bound");
        self.bound += 1;
    }

    fn late_update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
        let members = ctx.members().to_vec();
        for id in members {
            let Some((handle, snapshot)) = ctx.entity(id).ok().and_then(|e| {
                let handle = e.component::<ViewBinding>()?.handle?;
                Some((handle, ViewSnapshot::capture(e)))
            }) else {
                continue;
            };
            ctx.views().sync(handle, &snapshot);
            self.synced += 1;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_handles_are_sequential() {
        let mut views = HeadlessViews::new();
        assert_eq!(views.resolve_resource("a"), Some(ViewHandle(1)));
        assert_eq!(views.resolve_resource("b"), Some(ViewHandle(2)));
    }

    #[test]
    fn missing_resource_does_not_resolve() {
        let mut views = HeadlessViews::new().with_missing_resource("prefabs/ghost");
        assert_eq!(views.resolve_resource("prefabs/ghost"), None);
    }

    #[test]
    fn default_container_is_type_name() {
        let views = HeadlessViews::new();
        assert_eq!(views.container_for(EntityType::TreasureBox), "treasure_box");
    }

    #[test]
    fn attach_and_release() {
        let mut views = HeadlessViews::new();
        let handle = views.resolve_resource("m").unwrap();
        views.attach(handle, EntityId(4), EntityType::Monster, "monster");
        assert_eq!(views.attached_in("monster"), 1);
        assert_eq!(views.entity_of(handle), Some(EntityId(4)));

        views.release(handle);
        assert_eq!(views.attached(), 0);
        assert_eq!(views.released(), 1);
    }

    #[test]
    fn snapshot_defaults_to_visible() {
        let e = Entity::new(EntityId(1), EntityType::Prop);
        let snap = ViewSnapshot::capture(&e);
        assert!(snap.visible);
        assert_eq!(snap.position, None);
    }
}
