//! Entity-Component-System core of the live map engine.
//!
//! The host loop owns an [`EcsController`] and calls [`EcsController::update`]
//! once per frame. Systems read and mutate entities through the
//! [`ComponentStore`] handed to them in an [`EcsContext`].

pub mod config;
pub mod ecs;
pub mod error;

// Re-exports
pub use config::{EcsConfig, RemovedEntityPolicy};
pub use ecs::{
    Component, ComponentKind, ComponentStore, ComponentsBuilder, EcsContext, EcsController,
    Entity, EntityId, FnSystem, MetricsSnapshot, System, SystemMetrics, SystemState,
    SystemTiming, system_fn,
};
pub use error::{EcsError, Result};
