//! Systems and the per-call context handed to them.
//!
//! A system is registered once with the [`EcsController`](super::EcsController)
//! and then driven through a fixed lifecycle:
//!
//! `Uninitialized -> Initialized -> Updating* -> Destroyed`
//!
//! `init` runs exactly once before the first `update`, `destroy` exactly once
//! on disposal. Systems run strictly in registration order and see every
//! mutation made by the systems before them in the same tick.
//!
//! Closures can be registered through [`system_fn`].

use super::component::{Component, ComponentKind, short_type_name};
use super::deferred::DeferredQueue;
use super::entity::EntityId;
use super::handle::Entity;
use super::store::ComponentStore;
use crate::error::Result;

/// システムのライフサイクル状態（コントローラが管理する）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Uninitialized,
    Initialized,
    Updating,
    Destroyed,
}

/// システム
///
/// `C`はホスト側のコンテキスト（描画やビューポートなど、ECS外の協調オブジェクト）
pub trait System<C> {
    /// ログ・計測用の名前（デフォルトは型名）
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn init(&mut self, _ctx: &mut EcsContext<'_, C>) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, ctx: &mut EcsContext<'_, C>, dt: f64) -> Result<()>;

    fn destroy(&mut self) {}
}

/// `init`/`update`に渡されるコンテキスト
///
/// `store`と`host`は公開フィールドなので同時に借用できる
pub struct EcsContext<'a, C> {
    pub store: &'a mut ComponentStore,
    pub host: &'a mut C,
    tick: u64,
    deferred: &'a mut DeferredQueue,
}

impl<'a, C> EcsContext<'a, C> {
    pub(crate) fn new(
        store: &'a mut ComponentStore,
        host: &'a mut C,
        tick: u64,
        deferred: &'a mut DeferredQueue,
    ) -> Self {
        Self {
            store,
            host,
            tick,
            deferred,
        }
    }

    /// 現在のティック（`init`中は0）
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// このシステムの次回`update`の先頭でコールバックを実行する
    /// その時点でEntityがパージ済みなら実行しない
    pub fn run_later<F>(&mut self, entity: EntityId, callback: F)
    where
        F: FnOnce(Entity<'_>) -> Result<()> + 'static,
    {
        self.deferred.push(entity, callback);
    }

    /// 遅延実行待ちのコールバック数
    pub fn pending_callbacks(&self) -> usize {
        self.deferred.len()
    }

    pub fn create_entity(&mut self, name: impl Into<String>) -> Entity<'_> {
        let id = self.store.create_entity(name);
        Entity::new(id, self.store)
    }

    pub fn entity(&mut self, id: EntityId) -> Result<Entity<'_>> {
        self.store.entity(id)
    }

    pub fn get_entity_by_id(&mut self, id: EntityId) -> Result<Entity<'_>> {
        self.store.get_entity_by_id(id)
    }

    pub fn get_singleton<T: Component>(&self) -> Result<&T> {
        self.store.get_singleton::<T>()
    }

    pub fn get_singleton_mut<T: Component>(&mut self) -> Result<&mut T> {
        self.store.get_singleton_mut::<T>()
    }

    pub fn get_singleton_entity(&self, kind: ComponentKind) -> Result<EntityId> {
        self.store.get_singleton_entity(kind)
    }

    pub fn get_entities_by_id(&self, ids: &[EntityId]) -> Vec<EntityId> {
        self.store.get_entities_by_id(ids)
    }
}

/// クロージャをシステムとして扱うラッパー
pub struct FnSystem<F> {
    name: String,
    func: F,
}

/// クロージャからシステムを作る
///
/// 引数の型は推論できないため明示すること:
/// `system_fn("tick", |ctx: &mut EcsContext<'_, Host>, dt: f64| { ... })`
pub fn system_fn<C, F>(name: impl Into<String>, func: F) -> FnSystem<F>
where
    F: FnMut(&mut EcsContext<'_, C>, f64) -> Result<()>,
{
    FnSystem {
        name: name.into(),
        func,
    }
}

impl<C, F> System<C> for FnSystem<F>
where
    F: FnMut(&mut EcsContext<'_, C>, f64) -> Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, ctx: &mut EcsContext<'_, C>, dt: f64) -> Result<()> {
        (self.func)(ctx, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Zoom(f64);
    impl Component for Zoom {}

    struct CameraSystem;

    impl System<Vec<String>> for CameraSystem {
        fn update(&mut self, ctx: &mut EcsContext<'_, Vec<String>>, _dt: f64) -> Result<()> {
            let zoom = ctx.get_singleton::<Zoom>()?.0;
            ctx.host.push(format!("zoom {}", zoom));
            Ok(())
        }
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert_eq!(System::<Vec<String>>::name(&CameraSystem), "CameraSystem");
    }

    #[test]
    fn test_fn_system_name_and_update() {
        let mut store = ComponentStore::new();
        let mut host = 0u32;
        let mut deferred = DeferredQueue::new();

        let mut system = system_fn("Counter", |ctx: &mut EcsContext<'_, u32>, _dt: f64| {
            *ctx.host += 1;
            Ok(())
        });
        assert_eq!(System::<u32>::name(&system), "Counter");

        let mut ctx = EcsContext::new(&mut store, &mut host, 1, &mut deferred);
        system.update(&mut ctx, 0.016).unwrap();
        system.update(&mut ctx, 0.016).unwrap();
        assert_eq!(host, 2);
    }

    #[test]
    fn test_context_helpers() {
        let mut store = ComponentStore::new();
        let mut host = Vec::new();
        let mut deferred = DeferredQueue::new();
        let mut ctx = EcsContext::new(&mut store, &mut host, 7, &mut deferred);

        assert_eq!(ctx.tick(), 7);

        let camera = ctx.create_entity("camera").id();
        ctx.entity(camera).unwrap().add_component(Zoom(3.0)).unwrap();
        assert_eq!(ctx.get_singleton_entity(ComponentKind::of::<Zoom>()).unwrap(), camera);

        ctx.get_singleton_mut::<Zoom>().unwrap().0 = 4.0;
        CameraSystem.update(&mut ctx, 0.0).unwrap();
        assert_eq!(ctx.get_entities_by_id(&[camera]), vec![camera]);
        assert_eq!(ctx.get_entity_by_id(camera).unwrap().name(), "camera");

        ctx.run_later(camera, |mut e| {
            e.remove();
            Ok(())
        });
        assert_eq!(ctx.pending_callbacks(), 1);

        assert_eq!(host, vec!["zoom 4".to_string()]);
        assert_eq!(deferred.len(), 1);
    }
}
