use std::any::{Any, TypeId};
use std::collections::HashMap;

use log::trace;

use super::component::{Component, ComponentKind};
use super::entity::EntityId;
use super::handle::Entity;
use super::storage::ComponentStorage;
use crate::config::{EcsConfig, RemovedEntityPolicy};
use crate::error::{EcsError, Result};

/// Entityの管理情報
struct EntityMeta {
    /// デバッグ用の名前
    name: String,
    /// 削除マーク（スイープまで保持）
    removed: bool,
    /// 保持しているコンポーネントの種類（スイープ時の逆引き削除用）
    kinds: Vec<ComponentKind>,
}

/// 型消去されたストレージのトレイト
trait AnyStorage {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, entity: EntityId) -> bool;
    fn contains(&self, entity: EntityId) -> bool;
    fn entities(&self) -> &[EntityId];
}

impl<T: Component> AnyStorage for ComponentStorage<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn remove(&mut self, entity: EntityId) -> bool {
        ComponentStorage::remove(self, entity).is_some()
    }
    fn contains(&self, entity: EntityId) -> bool {
        ComponentStorage::contains(self, entity)
    }
    fn entities(&self) -> &[EntityId] {
        ComponentStorage::entities(self)
    }
}

/// ECSのメインコンテナ
/// 全てのEntity/Componentを所有する
///
/// - `entities`: id -> Entity（主記憶。各Entityが持つ種類の集合もここ）
/// - `storages`: 種類 -> 型付きストレージ（値と、その種類を持つEntityの逆引き）
/// - `removed`: 削除マーク済みでスイープ待ちのEntity
///
/// 削除はマークのみで、実際のパージは`sweep_removed`で行う。
/// マーク後はクエリに現れないが、`contains_entity`はスイープまでtrueを返す。
pub struct ComponentStore {
    config: EcsConfig,
    next_id: EntityId,
    entities: HashMap<EntityId, EntityMeta>,
    storages: HashMap<TypeId, Box<dyn AnyStorage>>,
    removed: Vec<EntityId>,
}

impl ComponentStore {
    /// 新しいストアを作成
    pub fn new() -> Self {
        Self::with_config(EcsConfig::default())
    }

    /// 設定を指定してストアを作成
    pub fn with_config(config: EcsConfig) -> Self {
        Self {
            config,
            next_id: EntityId::new(1),
            entities: HashMap::new(),
            storages: HashMap::new(),
            removed: Vec::new(),
        }
    }

    pub fn config(&self) -> &EcsConfig {
        &self.config
    }

    // ========================================================================
    // Entity lifecycle
    // ========================================================================

    /// 新規Entityを生成
    /// IDは単調増加し、再利用されない
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.next_id;
        self.next_id = id.next();

        let name = name.into();
        trace!("create entity {} \"{}\"", id, name);
        self.entities.insert(
            id,
            EntityMeta {
                name,
                removed: false,
                kinds: Vec::new(),
            },
        );
        id
    }

    /// Entityのハンドルを取得
    /// 削除マーク済みでもスイープ前なら取得できる
    pub fn entity(&mut self, id: EntityId) -> Result<Entity<'_>> {
        if !self.contains_entity(id) {
            return Err(EcsError::UnknownOrRemovedEntity(id));
        }
        Ok(Entity::new(id, self))
    }

    /// IDから生存Entityのハンドルを取得
    /// 未発行・パージ済み・削除マーク済みの場合は失敗（`entity`と違い削除マーク済みも拒否する）
    pub fn get_entity_by_id(&mut self, id: EntityId) -> Result<Entity<'_>> {
        if !self.is_live(id) {
            return Err(EcsError::UnknownOrRemovedEntity(id));
        }
        Ok(Entity::new(id, self))
    }

    /// 指定IDのうち生存しているものだけを返す（順序は維持）
    pub fn get_entities_by_id(&self, ids: &[EntityId]) -> Vec<EntityId> {
        ids.iter().copied().filter(|&id| self.is_live(id)).collect()
    }

    /// 名前で生存Entityを探す（同名が複数あれば最も古いもの）
    pub fn find_entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .filter(|(_, meta)| !meta.removed && meta.name == name)
            .map(|(&id, _)| id)
            .min()
    }

    /// Entityの名前
    pub fn entity_name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).map(|meta| meta.name.as_str())
    }

    /// Entityに削除マークを付ける
    /// 新たにマークした場合true（冪等）
    pub fn mark_removed(&mut self, id: EntityId) -> bool {
        match self.entities.get_mut(&id) {
            Some(meta) if !meta.removed => {
                meta.removed = true;
                self.removed.push(id);
                true
            }
            _ => false,
        }
    }

    /// 削除マーク済みEntityを全インデックスからパージする
    /// 1ティックに1回、全システムの更新後に呼ぶこと
    pub fn sweep_removed(&mut self) -> usize {
        let removed = std::mem::take(&mut self.removed);

        for id in &removed {
            let Some(meta) = self.entities.remove(id) else {
                continue;
            };
            for kind in &meta.kinds {
                if let Some(storage) = self.storages.get_mut(&kind.type_id()) {
                    storage.remove(*id);
                }
            }
        }

        if !removed.is_empty() {
            trace!("swept {} entities", removed.len());
        }
        removed.len()
    }

    /// Entityがストアに存在するか（スイープまでは削除マーク済みでもtrue）
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// 削除マーク済みか
    pub fn is_removed(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|meta| meta.removed)
    }

    /// パージされていないEntity数
    pub fn entities_count(&self) -> usize {
        self.entities.len()
    }

    /// スイープ待ちのEntity数
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// コンポーネントを追加
    /// 同じ種類を既に持っている場合は失敗し、何も変更しない
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> Result<()> {
        self.check_mutable(entity)?;

        if self.contains_component::<T>(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: ComponentKind::of::<T>().to_string(),
            });
        }

        self.get_or_create_storage::<T>().insert(entity, component);
        if let Some(meta) = self.entities.get_mut(&entity) {
            meta.kinds.push(ComponentKind::of::<T>());
        }
        Ok(())
    }

    /// コンポーネントを設定（既存があれば置き換え）
    pub fn set_component<T: Component>(&mut self, entity: EntityId, component: T) -> Result<()> {
        self.check_mutable(entity)?;

        let replaced = self.get_or_create_storage::<T>().insert(entity, component);
        if replaced.is_none() {
            if let Some(meta) = self.entities.get_mut(&entity) {
                meta.kinds.push(ComponentKind::of::<T>());
            }
        }
        Ok(())
    }

    /// コンポーネントを削除
    /// 持っていない場合は`Ok(None)`
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Result<Option<T>> {
        self.check_mutable(entity)?;

        let removed = self
            .get_storage_mut::<T>()
            .and_then(|storage| storage.remove(entity));
        if removed.is_some() {
            self.forget_kind(entity, ComponentKind::of::<T>());
        }
        Ok(removed)
    }

    /// 種類を指定してコンポーネントを削除（型消去版）
    pub fn remove_component_kind(&mut self, entity: EntityId, kind: ComponentKind) -> Result<bool> {
        self.check_mutable(entity)?;

        let removed = self
            .storages
            .get_mut(&kind.type_id())
            .is_some_and(|storage| storage.remove(entity));
        if removed {
            self.forget_kind(entity, kind);
        }
        Ok(removed)
    }

    /// コンポーネントを取得（不変参照）
    pub fn get<T: Component>(&self, entity: EntityId) -> Result<&T> {
        if !self.contains_entity(entity) {
            return Err(EcsError::UnknownOrRemovedEntity(entity));
        }
        self.try_get::<T>(entity)
            .ok_or_else(|| Self::component_not_found::<T>(entity))
    }

    /// コンポーネントを取得（可変参照）
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Result<&mut T> {
        if !self.contains_entity(entity) {
            return Err(EcsError::UnknownOrRemovedEntity(entity));
        }
        self.try_get_mut::<T>(entity)
            .ok_or_else(|| Self::component_not_found::<T>(entity))
    }

    /// コンポーネントを取得（存在しなければNone）
    pub fn try_get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.get_storage::<T>()?.get(entity)
    }

    /// コンポーネントを可変で取得（存在しなければNone）
    pub fn try_get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.get_storage_mut::<T>()?.get_mut(entity)
    }

    /// Entityが指定コンポーネントを持つか
    pub fn contains_component<T: Component>(&self, entity: EntityId) -> bool {
        self.get_storage::<T>()
            .is_some_and(|storage| storage.contains(entity))
    }

    /// Entityが指定した種類を持つか（型消去版）
    pub fn has_component_kind(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.storages
            .get(&kind.type_id())
            .is_some_and(|storage| storage.contains(entity))
    }

    /// Entityが指定した種類を全て持つか
    pub fn contains_all(&self, entity: EntityId, kinds: &[ComponentKind]) -> bool {
        kinds.iter().all(|&kind| self.has_component_kind(entity, kind))
    }

    /// 指定した種類を持つ生存Entityが1つでもあるか
    pub fn contains_kind(&self, kind: ComponentKind) -> bool {
        self.storages.get(&kind.type_id()).is_some_and(|storage| {
            storage.entities().iter().any(|&id| self.is_live(id))
        })
    }

    /// 指定コンポーネントを持つ生存Entity数
    pub fn count<T: Component>(&self) -> usize {
        self.get_storage::<T>().map_or(0, |storage| {
            storage.entities().iter().filter(|&&id| self.is_live(id)).count()
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// 指定した種類を持つ生存Entity
    /// 順序は逆引きインデックスの内部順（attach順、削除を挟むと不定）
    pub fn query_entities(&self, kind: ComponentKind) -> Vec<EntityId> {
        self.storages.get(&kind.type_id()).map_or_else(Vec::new, |storage| {
            storage
                .entities()
                .iter()
                .copied()
                .filter(|&id| self.is_live(id))
                .collect()
        })
    }

    /// 指定した種類を全て持つ生存Entity
    /// 先頭の種類の集合を残りの種類で絞り込む（順序は先頭の種類の逆引き順）
    pub fn query_entities_all(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        let Some((first, rest)) = kinds.split_first() else {
            return Vec::new();
        };

        let mut others = Vec::with_capacity(rest.len());
        for kind in rest {
            match self.storages.get(&kind.type_id()) {
                Some(storage) => others.push(storage),
                None => return Vec::new(),
            }
        }

        self.query_entities(*first)
            .into_iter()
            .filter(|&id| others.iter().all(|storage| storage.contains(id)))
            .collect()
    }

    /// 型を指定したクエリ
    pub fn query<T: Component>(&self) -> Vec<EntityId> {
        self.query_entities(ComponentKind::of::<T>())
    }

    /// 指定したコンポーネントを持つ生存Entityとコンポーネントをイテレート
    pub fn iter_with<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.get_storage::<T>()
            .into_iter()
            .flat_map(|storage| storage.iter())
            .filter(move |(id, _)| self.is_live(*id))
    }

    /// 指定したコンポーネントを持つ生存Entityとコンポーネントを可変イテレート
    pub fn iter_with_mut<T: Component>(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        let entities = &self.entities;
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<ComponentStorage<T>>())
            .into_iter()
            .flat_map(|storage| storage.iter_mut())
            .filter(move |(id, _)| entities.get(id).is_some_and(|meta| !meta.removed))
    }

    /// 指定した種類を持つ唯一のEntity
    pub fn get_singleton_entity(&self, kind: ComponentKind) -> Result<EntityId> {
        self.get_singleton_entity_all(&[kind])
    }

    /// 指定した種類を全て持つ唯一のEntity
    /// 0件なら`NotFound`、2件以上なら`NotSingleton`
    pub fn get_singleton_entity_all(&self, kinds: &[ComponentKind]) -> Result<EntityId> {
        let matches = self.query_entities_all(kinds);
        match matches.as_slice() {
            [single] => Ok(*single),
            [] => Err(EcsError::NotFound {
                components: kinds_label(kinds),
            }),
            _ => Err(EcsError::NotSingleton {
                components: kinds_label(kinds),
                count: matches.len(),
            }),
        }
    }

    /// シングルトンEntityのコンポーネント
    pub fn get_singleton<T: Component>(&self) -> Result<&T> {
        let entity = self.get_singleton_entity(ComponentKind::of::<T>())?;
        self.get::<T>(entity)
    }

    /// シングルトンEntityのコンポーネント（可変）
    pub fn get_singleton_mut<T: Component>(&mut self) -> Result<&mut T> {
        let entity = self.get_singleton_entity(ComponentKind::of::<T>())?;
        self.get_mut::<T>(entity)
    }

    /// シングルトンEntityのコンポーネント（誰も持っていなければNone）
    /// 複数のEntityが持っている場合は`NotSingleton`
    pub fn try_get_singleton<T: Component>(&self) -> Result<Option<&T>> {
        match self.get_singleton::<T>() {
            Ok(component) => Ok(Some(component)),
            Err(EcsError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// 生存Entity（パージ前かつ削除マークなし）か
    fn is_live(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|meta| !meta.removed)
    }

    /// 変更可能なEntityか確認
    fn check_mutable(&self, id: EntityId) -> Result<()> {
        match self.entities.get(&id) {
            None => Err(EcsError::UnknownOrRemovedEntity(id)),
            Some(meta)
                if meta.removed
                    && self.config.removed_entity_policy == RemovedEntityPolicy::Reject =>
            {
                Err(EcsError::RemovedEntity(id))
            }
            Some(_) => Ok(()),
        }
    }

    fn forget_kind(&mut self, entity: EntityId, kind: ComponentKind) {
        if let Some(meta) = self.entities.get_mut(&entity) {
            meta.kinds.retain(|&held| held != kind);
        }
    }

    fn component_not_found<T: Component>(entity: EntityId) -> EcsError {
        EcsError::ComponentNotFound {
            entity,
            component: ComponentKind::of::<T>().to_string(),
        }
    }

    /// 型に対応するストレージを取得または作成
    fn get_or_create_storage<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let type_id = TypeId::of::<T>();

        self.storages
            .entry(type_id)
            .or_insert_with(|| Box::new(ComponentStorage::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
            .expect("type mismatch in storage")
    }

    /// 型に対応するストレージを取得（不変）
    fn get_storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        let type_id = TypeId::of::<T>();
        self.storages
            .get(&type_id)?
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
    }

    /// 型に対応するストレージを取得（可変）
    fn get_storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        let type_id = TypeId::of::<T>();
        self.storages
            .get_mut(&type_id)?
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
    }
}

impl Default for ComponentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn kinds_label(kinds: &[ComponentKind]) -> String {
    kinds
        .iter()
        .map(ComponentKind::short_name)
        .collect::<Vec<_>>()
        .join(", ")
}
