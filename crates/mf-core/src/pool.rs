//! Component recycling.
//!
//! A [`ComponentPool`] keeps one free list per component type. Leasing pops an
//! idle instance or constructs a new one; releasing resets the instance and
//! pushes it back. Every lease carries a [`LeaseTicket`], so releasing into
//! the wrong pool, or releasing a lease that is no longer outstanding, is
//! reported instead of silently corrupting the free lists.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{trace, warn};

use crate::component::{AnyComponent, Component, short_type_name};
use crate::error::{EcsError, EcsResult};

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies one outstanding lease: the pool that issued it plus a sequence
/// number unique within that pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseTicket {
    pool: u32,
    seq: u64,
}

impl LeaseTicket {
    /// Id of the issuing pool.
    pub fn pool(self) -> u32 {
        self.pool
    }

    /// Sequence number within the issuing pool.
    pub fn seq(self) -> u64 {
        self.seq
    }
}

impl fmt::Display for LeaseTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pool, self.seq)
    }
}

/// A component instance on loan from a pool.
#[derive(Debug)]
pub struct Leased {
    ticket: LeaseTicket,
    value: Box<dyn AnyComponent>,
}

impl Leased {
    /// The lease's ticket.
    pub fn ticket(&self) -> LeaseTicket {
        self.ticket
    }

    /// Short type name of the leased component.
    pub fn component_name(&self) -> &'static str {
        self.value.component_name()
    }

    /// `TypeId` of the leased component.
    pub fn component_type(&self) -> TypeId {
        self.value.component_type()
    }

    /// Borrow the component as `T`. `None` if it is another type.
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow the component as `T`. `None` if it is another type.
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.value.as_any_mut().downcast_mut::<T>()
    }

    pub(crate) fn erased(&self) -> &dyn AnyComponent {
        self.value.as_ref()
    }
}

#[derive(Debug, Default)]
struct Bucket {
    idle: Vec<Box<dyn AnyComponent>>,
    constructed: usize,
}

/// Totals across every component type in a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances ever constructed.
    pub constructed: usize,
    /// Instances waiting on a free list.
    pub idle: usize,
    /// Leases not yet released.
    pub outstanding: usize,
}

/// Free-list arena keyed by component type.
#[derive(Debug)]
pub struct ComponentPool {
    id: u32,
    buckets: HashMap<TypeId, Bucket>,
    outstanding: HashSet<LeaseTicket>,
    next_seq: u64,
}

impl ComponentPool {
    /// An empty pool with a fresh id.
    pub fn new() -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            buckets: HashMap::new(),
            outstanding: HashSet::new(),
            next_seq: 0,
        }
    }

    /// This pool's id, stamped into every ticket it issues.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Lease a `T` in its reset state. Reuses an idle instance when one is
    /// available; only an empty free list causes a construction.
    pub fn lease<T: Component>(&mut self) -> Leased {
        let bucket = self.buckets.entry(TypeId::of::<T>()).or_default();
        let value = match bucket.idle.pop() {
            Some(value) => value,
            None => {
                bucket.constructed += 1;
                Box::new(T::default()) as Box<dyn AnyComponent>
            }
        };

        self.next_seq += 1;
        let ticket = LeaseTicket {
            pool: self.id,
            seq: self.next_seq,
        };
        self.outstanding.insert(ticket);
        trace!(%ticket, component = short_type_name::<T>(), "component leased");
        Leased { ticket, value }
    }

    /// Reset `leased` and return it to its free list.
    ///
    /// Fails with [`EcsError::ForeignRelease`] if another pool issued the
    /// lease, and with [`EcsError::DoubleRelease`] if the lease is not
    /// outstanding. Neither failure touches the pool.
    pub fn release(&mut self, leased: Leased) -> EcsResult<()> {
        let Leased { ticket, mut value } = leased;
        if let Err(e) = self.check_release(ticket) {
            warn!(%ticket, pool = self.id, component = value.component_name(), error = %e, "component release rejected");
            return Err(e);
        }

        self.outstanding.remove(&ticket);
        value.reset_erased();
        trace!(%ticket, component = value.component_name(), "component released");
        self.buckets
            .entry(value.component_type())
            .or_default()
            .idle
            .push(value);
        Ok(())
    }

    /// Whether [`ComponentPool::release`] would accept a lease with `ticket`.
    /// Lets an owner keep hold of a lease the pool would refuse.
    pub fn check_release(&self, ticket: LeaseTicket) -> EcsResult<()> {
        if ticket.pool != self.id {
            return Err(EcsError::ForeignRelease {
                ticket,
                pool: self.id,
            });
        }
        if !self.outstanding.contains(&ticket) {
            return Err(EcsError::DoubleRelease(ticket));
        }
        Ok(())
    }

    /// Number of `T` instances this pool has ever constructed.
    pub fn constructed<T: Component>(&self) -> usize {
        self.buckets
            .get(&TypeId::of::<T>())
            .map_or(0, |b| b.constructed)
    }

    /// Number of idle `T` instances ready to be leased.
    pub fn idle<T: Component>(&self) -> usize {
        self.buckets
            .get(&TypeId::of::<T>())
            .map_or(0, |b| b.idle.len())
    }

    /// Number of leases not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Whether `ticket` was issued here and is still out.
    pub fn is_outstanding(&self, ticket: LeaseTicket) -> bool {
        self.outstanding.contains(&ticket)
    }

    /// Totals across every component type.
    pub fn stats(&self) -> PoolStats {
        let (constructed, idle) = self
            .buckets
            .values()
            .fold((0, 0), |(c, i), b| (c + b.constructed, i + b.idle.len()));
        PoolStats {
            constructed,
            idle,
            outstanding: self.outstanding.len(),
        }
    }
}

impl Default for ComponentPool {
    fn default() -> Self {
        Self::new()
    }
}
