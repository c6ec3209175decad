use std::any::Any;

use mf_core::component::{Position, StateFlags, Velocity};
use mf_core::{EcsResult, Entity, EntityId, System, SystemContext};
use tracing::trace;

/// Integrates position by velocity once per logic frame.
///
/// Runs on the fixed logic tick only, so distance travelled depends on
/// simulated time and never on the render frame rate.
#[derive(Debug, Default)]
pub struct MovementSystem {
    steps: u64,
}

impl MovementSystem {
    /// A system that has not run yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logic frames this system has run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    // Members stripped earlier in the same pass stay listed until the pass
    // ends; they are skipped.
    fn integrate(ctx: &mut SystemContext<'_>, entity: EntityId, dt: f32) {
        let Ok(e) = ctx.entity_mut(entity) else {
            return;
        };
        let Some(vel) = e.component::<Velocity>().copied() else {
            trace!(%entity, "member without velocity skipped");
            return;
        };
        let Some(pos) = e.component_mut::<Position>() else {
            trace!(%entity, "member without position skipped");
            return;
        };
        pos.x += vel.x * dt;
        pos.y += vel.y * dt;
        pos.z += vel.z * dt;
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn filter(&self, entity: &Entity) -> bool {
        entity.has::<Position>()
            && entity.has::<Velocity>()
            && entity.component::<StateFlags>().is_none_or(|f| f.active)
    }

    fn logic_update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> EcsResult<()> {
        self.steps += 1;
        let members = ctx.members().to_vec();
        for entity in members {
            Self::integrate(ctx, entity, dt);
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
