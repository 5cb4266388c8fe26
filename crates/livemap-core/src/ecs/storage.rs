use std::collections::HashMap;

use super::component::Component;
use super::entity::EntityId;

/// SparseSetベースのコンポーネントストレージ（1種類につき1つ）
/// - dense: 実際のデータ配列（連続メモリでキャッシュ効率が良い）
/// - entities: denseと対応するEntityIdの配列。この種類の逆引きインデックスを兼ねる
/// - sparse: EntityId -> denseのインデックスへのマッピング
///
/// EntityIdは再利用されず単調増加するため、sparseは配列ではなくHashMapで持つ。
/// entitiesはattach順に並ぶが、削除はswap_removeなので順序は保証しない。
pub struct ComponentStorage<T: Component> {
    dense: Vec<T>,
    entities: Vec<EntityId>,
    sparse: HashMap<EntityId, usize>,
}

impl<T: Component> ComponentStorage<T> {
    /// 新しいストレージを作成
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            entities: Vec::new(),
            sparse: HashMap::new(),
        }
    }

    /// コンポーネントを挿入（既存の場合は上書きし、古い値を返す）
    pub fn insert(&mut self, entity: EntityId, component: T) -> Option<T> {
        if let Some(&dense_index) = self.sparse.get(&entity) {
            // 既存のコンポーネントを上書き
            return Some(std::mem::replace(&mut self.dense[dense_index], component));
        }

        // 新規追加
        let dense_index = self.dense.len();
        self.dense.push(component);
        self.entities.push(entity);
        self.sparse.insert(entity, dense_index);
        None
    }

    /// コンポーネントを取得（不変参照）
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.sparse
            .get(&entity)
            .map(|&dense_index| &self.dense[dense_index])
    }

    /// コンポーネントを取得（可変参照）
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.sparse
            .get(&entity)
            .map(|&dense_index| &mut self.dense[dense_index])
    }

    /// コンポーネントを削除
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let dense_index = self.sparse.remove(&entity)?;

        // 最後の要素と交換して削除（O(1)削除）
        let last_index = self.dense.len() - 1;
        if dense_index != last_index {
            // 最後の要素のsparseを更新
            let last_entity = self.entities[last_index];
            self.sparse.insert(last_entity, dense_index);
        }

        self.entities.swap_remove(dense_index);
        Some(self.dense.swap_remove(dense_index))
    }

    /// 全コンポーネントをイテレート
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// 全コンポーネントを可変イテレート
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    /// このコンポーネントを持つEntity（逆引きインデックス）
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// ストレージ内のコンポーネント数
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// ストレージが空かどうか
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// 指定Entityがコンポーネントを持つか
    pub fn contains(&self, entity: EntityId) -> bool {
        self.sparse.contains_key(&entity)
    }
}

impl<T: Component> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}
