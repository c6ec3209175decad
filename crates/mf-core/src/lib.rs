//! Core types for Mapforge: pooled components, entities, systems, and the
//! world that owns them.
//!
//! A [`World`] holds every [`Entity`] and every [`System`]. Entities are
//! built from an [`EntityKind`] and carry components leased from the
//! world's [`ComponentPool`]. Systems pick their members with a filter and
//! are dispatched in registration order. Timing lives in `mf-simulation`;
//! this crate only runs the phases it is asked to run.

/// Built-in component types and the `Component` trait.
pub mod component;
/// The view of the world handed to system hooks.
pub mod context;
/// Entity identifiers, type tags, and the entity itself.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// World lifecycle events and the event history.
pub mod event;
/// Concrete entity kinds and the builder they populate.
pub mod kind;
/// Free-list recycling of component instances.
pub mod pool;
mod registry;
/// The trait all systems implement, plus membership bookkeeping.
pub mod system;
/// Boundary to the presentation layer.
pub mod view;
/// The aggregate root owning entities and systems.
pub mod world;

/// Re-export of the component trait.
pub use component::Component;
/// Re-export of [`context::SystemContext`].
pub use context::SystemContext;
/// Re-export core entity types.
pub use entity::{Entity, EntityId, EntityType};
/// Re-export error types.
pub use error::{EcsError, EcsResult};
/// Re-export event types.
pub use event::{EventLog, EventTopic, Subscriptions, WorldEvent};
/// Re-export entity kind types.
pub use kind::{EntityBuilder, EntityKind};
/// Re-export pool types.
pub use pool::{ComponentPool, PoolStats};
/// Re-export system types.
pub use system::{DetachedSystem, Membership, System, SystemId, SystemState};
/// Re-export view boundary types.
pub use view::{HeadlessViews, ViewBridge, ViewHandle, ViewSnapshot, ViewSyncSystem};
/// Re-export world types.
pub use world::{World, WorldConfig, WorldId};
