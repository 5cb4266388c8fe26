use log::trace;

use super::entity::EntityId;
use super::handle::Entity;
use super::store::ComponentStore;
use crate::error::Result;

type Callback = Box<dyn FnOnce(Entity<'_>) -> Result<()>>;

/// システムごとの遅延実行キュー（`run_later`）
/// 所有するシステムの次回`update`の直前に消化される
#[derive(Default)]
pub struct DeferredQueue {
    tasks: Vec<(EntityId, Callback)>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entityに対するコールバックを積む
    pub fn push<F>(&mut self, entity: EntityId, callback: F)
    where
        F: FnOnce(Entity<'_>) -> Result<()> + 'static,
    {
        self.tasks.push((entity, Box::new(callback)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 積まれたコールバックを順に実行し、実行した数を返す
    ///
    /// Entityがストアに残っている場合のみ実行する（削除マーク済みでもスイープ前なら実行）。
    /// 失敗した時点で残りは破棄される。
    pub fn run(&mut self, store: &mut ComponentStore) -> Result<usize> {
        let tasks = std::mem::take(&mut self.tasks);
        let mut executed = 0;

        for (id, callback) in tasks {
            if !store.contains_entity(id) {
                trace!("skip deferred callback for purged entity {}", id);
                continue;
            }
            callback(Entity::new(id, store))?;
            executed += 1;
        }
        Ok(executed)
    }
}
