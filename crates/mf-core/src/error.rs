use crate::entity::EntityId;
use crate::pool::LeaseTicket;
use crate::system::SystemId;

/// Alias for `Result<T, EcsError>`.
pub type EcsResult<T> = Result<T, EcsError>;

/// Usage-contract violations raised by the world, entities, and pools.
///
/// None of these are transient: the same call sequence always produces the
/// same error, and the world is left unchanged by the failing call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The requested entity is not registered in this world.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The entity already carries a component of this type.
    #[error("entity {entity} already has a {component} component")]
    DuplicateComponent {
        /// The entity the component was added to.
        entity: EntityId,
        /// Short type name of the component.
        component: &'static str,
    },

    /// The entity carries no component of this type.
    #[error("entity {entity} has no {component} component")]
    ComponentNotFound {
        /// The entity that was queried.
        entity: EntityId,
        /// Short type name of the component.
        component: &'static str,
    },

    /// The entity's init hook already ran.
    #[error("entity {0} is already initialized")]
    AlreadyInitialized(EntityId),

    /// A leased component was returned to a pool that did not lease it.
    #[error("lease {ticket} released into pool {pool}, which did not lease it")]
    ForeignRelease {
        /// The ticket carried by the released instance.
        ticket: LeaseTicket,
        /// The pool that rejected it.
        pool: u32,
    },

    /// A lease was released while not outstanding.
    #[error("lease {0} released twice")]
    DoubleRelease(LeaseTicket),

    /// No system with this id is registered.
    #[error("system not found: {0}")]
    SystemNotFound(SystemId),

    /// The system was removed from its world and has no owner any more.
    #[error("system \"{0}\" is detached from its world")]
    SystemDetached(String),
}
