use std::fmt;

use super::component::{Component, ComponentKind};
use super::entity::EntityId;
use super::store::ComponentStore;
use crate::error::{EcsError, Result};

/// Entityハンドル
/// IDとストアへの可変参照の組。操作はすべてストアへ委譲する
pub struct Entity<'a> {
    id: EntityId,
    store: &'a mut ComponentStore,
}

impl<'a> Entity<'a> {
    pub(crate) fn new(id: EntityId, store: &'a mut ComponentStore) -> Self {
        Self { id, store }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.store.entity_name(self.id).unwrap_or_default()
    }

    pub fn get<T: Component>(&self) -> Result<&T> {
        self.store.get::<T>(self.id)
    }

    pub fn get_mut<T: Component>(&mut self) -> Result<&mut T> {
        self.store.get_mut::<T>(self.id)
    }

    pub fn try_get<T: Component>(&self) -> Option<&T> {
        self.store.try_get::<T>(self.id)
    }

    pub fn try_get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.store.try_get_mut::<T>(self.id)
    }

    /// コンポーネントを取得し、無ければ`factory`で作って追加する
    pub fn provide<T, F>(&mut self, factory: F) -> Result<&mut T>
    where
        T: Component,
        F: FnOnce() -> T,
    {
        if !self.store.contains_component::<T>(self.id) {
            self.store.add_component(self.id, factory())?;
        }
        self.store.get_mut::<T>(self.id)
    }

    pub fn contains<T: Component>(&self) -> bool {
        self.store.contains_component::<T>(self.id)
    }

    pub fn contains_all(&self, kinds: &[ComponentKind]) -> bool {
        self.store.contains_all(self.id, kinds)
    }

    pub fn add_component<T: Component>(&mut self, component: T) -> Result<&mut Self> {
        self.store.add_component(self.id, component)?;
        Ok(self)
    }

    pub fn set_component<T: Component>(&mut self, component: T) -> Result<&mut Self> {
        self.store.set_component(self.id, component)?;
        Ok(self)
    }

    pub fn remove_component<T: Component>(&mut self) -> Result<Option<T>> {
        self.store.remove_component::<T>(self.id)
    }

    /// 削除マークを付ける。実際のパージはティック終了時
    pub fn remove(&mut self) {
        self.store.mark_removed(self.id);
    }

    pub fn is_removed(&self) -> bool {
        self.store.is_removed(self.id)
    }

    /// 複数のコンポーネントをまとめて追加
    ///
    /// ```
    /// # use livemap_core::{Component, ComponentStore};
    /// # struct Position(f64, f64);
    /// # impl Component for Position {}
    /// # struct Visible;
    /// # impl Component for Visible {}
    /// let mut store = ComponentStore::new();
    /// let id = store.create_entity("marker");
    /// store
    ///     .entity(id)?
    ///     .add_components(|c| {
    ///         c.add(Position(1.0, 2.0)).add(Visible);
    ///     })?;
    /// assert_eq!(store.count::<Visible>(), 1);
    /// # Ok::<(), livemap_core::EcsError>(())
    /// ```
    ///
    /// 追加前に全体を検証するため、失敗した場合は1つも追加されない
    pub fn add_components<F>(&mut self, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut ComponentsBuilder),
    {
        let mut builder = ComponentsBuilder::default();
        build(&mut builder);
        builder.apply(self.store, self.id)?;
        Ok(self)
    }

    /// 下層のストア
    pub fn store(&mut self) -> &mut ComponentStore {
        self.store
    }
}

impl PartialEq for Entity<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl PartialEq<EntityId> for Entity<'_> {
    fn eq(&self, other: &EntityId) -> bool {
        self.id == *other
    }
}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("removed", &self.is_removed())
            .finish()
    }
}

type Attach = Box<dyn FnOnce(&mut ComponentStore, EntityId) -> Result<()>>;

/// `Entity::add_components`に渡されるビルダー
#[derive(Default)]
pub struct ComponentsBuilder {
    pending: Vec<(ComponentKind, Attach)>,
}

impl ComponentsBuilder {
    pub fn add<T: Component>(&mut self, component: T) -> &mut Self {
        self.pending.push((
            ComponentKind::of::<T>(),
            Box::new(move |store, id| store.add_component(id, component)),
        ));
        self
    }

    fn apply(self, store: &mut ComponentStore, id: EntityId) -> Result<()> {
        for (index, (kind, _)) in self.pending.iter().enumerate() {
            let repeated = self.pending[..index].iter().any(|(seen, _)| seen == kind);
            if repeated || store.has_component_kind(id, *kind) {
                return Err(EcsError::DuplicateComponent {
                    entity: id,
                    component: kind.to_string(),
                });
            }
        }

        for (_, attach) in self.pending {
            attach(store, id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EcsConfig, RemovedEntityPolicy};

    #[derive(Debug, PartialEq)]
    struct Label(&'static str);
    impl Component for Label {}

    #[derive(Debug, PartialEq, Default)]
    struct Counter(u32);
    impl Component for Counter {}

    #[test]
    fn test_handle_delegates_to_store() {
        let mut store = ComponentStore::new();
        let id = store.create_entity("pin");

        let mut entity = store.entity(id).unwrap();
        assert_eq!(entity.id(), id);
        assert_eq!(entity.name(), "pin");

        entity.add_component(Label("a")).unwrap();
        assert!(entity.contains::<Label>());
        assert_eq!(entity.get::<Label>().unwrap(), &Label("a"));
        assert!(entity.get::<Counter>().is_err());
        assert!(entity.try_get::<Counter>().is_none());

        entity.set_component(Label("b")).unwrap();
        assert_eq!(entity.try_get::<Label>(), Some(&Label("b")));

        assert_eq!(entity.remove_component::<Label>().unwrap(), Some(Label("b")));
        assert!(!entity.contains::<Label>());
    }

    #[test]
    fn test_chained_adds() {
        let mut store = ComponentStore::new();
        let id = store.create_entity("e");
        store
            .entity(id)
            .unwrap()
            .add_component(Label("x"))
            .unwrap()
            .add_component(Counter(1))
            .unwrap();

        assert!(store.contains_all(
            id,
            &[ComponentKind::of::<Label>(), ComponentKind::of::<Counter>()]
        ));
    }

    #[test]
    fn test_provide() {
        let mut store = ComponentStore::new();
        let id = store.create_entity("e");
        let mut entity = store.entity(id).unwrap();

        entity.provide(Counter::default).unwrap().0 += 1;
        entity.provide(|| Counter(100)).unwrap().0 += 1;

        assert_eq!(entity.get::<Counter>().unwrap(), &Counter(2));
    }

    #[test]
    fn test_remove_marks_only() {
        let mut store = ComponentStore::new();
        let id = store.create_entity("e");
        {
            let mut entity = store.entity(id).unwrap();
            entity.add_component(Counter(1)).unwrap();
            entity.remove();
            assert!(entity.is_removed());
            // スイープまでは値を読める
            assert_eq!(entity.get::<Counter>().unwrap(), &Counter(1));
        }
        assert!(store.contains_entity(id));
        assert!(store.query::<Counter>().is_empty());
    }

    #[test]
    fn test_equality() {
        let mut store = ComponentStore::new();
        let a = store.create_entity("a");
        let b = store.create_entity("b");

        let handle = store.entity(a).unwrap();
        assert_eq!(handle, a);
        assert!(handle != b);
    }

    #[test]
    fn test_add_components_batch() {
        let mut store = ComponentStore::new();
        let id = store.create_entity("e");
        store
            .entity(id)
            .unwrap()
            .add_components(|c| {
                c.add(Label("x")).add(Counter(3));
            })
            .unwrap();

        assert_eq!(store.get::<Counter>(id).unwrap(), &Counter(3));
        assert_eq!(store.get::<Label>(id).unwrap(), &Label("x"));
    }

    #[test]
    fn test_add_components_atomic_on_duplicate() {
        let mut store = ComponentStore::new();
        let id = store.create_entity("e");
        store.add_component(id, Counter(1)).unwrap();

        let err = store
            .entity(id)
            .unwrap()
            .add_components(|c| {
                c.add(Label("x")).add(Counter(2));
            })
            .unwrap_err();

        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert!(!store.contains_component::<Label>(id));
        assert_eq!(store.get::<Counter>(id).unwrap(), &Counter(1));
    }

    #[test]
    fn test_add_components_repeated_kind() {
        let mut store = ComponentStore::new();
        let id = store.create_entity("e");

        let mut entity = store.entity(id).unwrap();
        let result = entity
            .add_components(|c| {
                c.add(Counter(1)).add(Counter(2));
            })
            .map(|_| ());

        assert!(matches!(result, Err(EcsError::DuplicateComponent { .. })));
        assert!(!store.contains_component::<Counter>(id));
    }

    #[test]
    fn test_add_components_rejected_on_marked_entity() {
        let config = EcsConfig::default().with_removed_entity_policy(RemovedEntityPolicy::Reject);
        let mut store = ComponentStore::with_config(config);
        let id = store.create_entity("e");
        store.mark_removed(id);

        let mut entity = store.entity(id).unwrap();
        let result = entity
            .add_components(|c| {
                c.add(Counter(1));
            })
            .map(|_| ());
        assert!(matches!(result, Err(EcsError::RemovedEntity(_))));
        assert!(!store.contains_component::<Counter>(id));
    }

    #[test]
    fn test_debug_format() {
        let mut store = ComponentStore::new();
        let id = store.create_entity("debug-me");
        let entity = store.entity(id).unwrap();
        let text = format!("{:?}", entity);
        assert!(text.contains("debug-me"));
        assert!(text.contains("removed: false"));
    }
}
