pub mod entity;
pub mod component;
pub mod storage;
pub mod store;
pub mod handle;
pub mod deferred;
pub mod system;
pub mod metrics;
pub mod controller;

pub use entity::EntityId;
pub use component::{Component, ComponentKind};
pub use storage::ComponentStorage;
pub use store::ComponentStore;
pub use handle::{Entity, ComponentsBuilder};
pub use deferred::DeferredQueue;
pub use system::{System, SystemState, EcsContext, FnSystem, system_fn};
pub use metrics::{SystemMetrics, SystemTiming, MetricsSnapshot};
pub use controller::EcsController;
