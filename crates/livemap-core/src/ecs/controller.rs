use std::time::Instant;

use log::{debug, error, warn};

use super::deferred::DeferredQueue;
use super::metrics::SystemMetrics;
use super::store::ComponentStore;
use super::system::{EcsContext, System, SystemState};
use crate::error::Result;

struct SystemSlot<C> {
    system: Box<dyn System<C>>,
    deferred: DeferredQueue,
    state: SystemState,
}

/// システムを登録順に駆動するスケジューラ
///
/// 1ティック（`update`）の流れ:
/// 1. ティックを進める
/// 2. 各システムについて、遅延実行キューを消化してから`update`
/// 3. 全システムの後に削除マーク済みEntityを1回だけスイープ
///
/// システムのエラーはそのまま呼び出し元へ返す（そのティックの残りとスイープは実行しない）。
pub struct EcsController<C> {
    store: ComponentStore,
    host: C,
    systems: Vec<SystemSlot<C>>,
    tick: u64,
    metrics: SystemMetrics,
    disposed: bool,
}

impl<C> EcsController<C> {
    /// コントローラを作成し、登録順に各システムの`init`を呼ぶ
    pub fn new(store: ComponentStore, host: C, systems: Vec<Box<dyn System<C>>>) -> Result<Self> {
        let mut controller = Self {
            store,
            host,
            systems: systems
                .into_iter()
                .map(|system| SystemSlot {
                    system,
                    deferred: DeferredQueue::new(),
                    state: SystemState::Uninitialized,
                })
                .collect(),
            tick: 0,
            metrics: SystemMetrics::new(),
            disposed: false,
        };
        controller.init_systems()?;
        Ok(controller)
    }

    fn init_systems(&mut self) -> Result<()> {
        let Self {
            store,
            host,
            systems,
            tick,
            ..
        } = self;

        for slot in systems.iter_mut() {
            let SystemSlot {
                system,
                deferred,
                state,
            } = slot;

            let mut ctx = EcsContext::new(store, host, *tick, deferred);
            if let Err(err) = system.init(&mut ctx) {
                error!("system `{}` failed to initialize: {}", system.name(), err);
                return Err(err);
            }
            *state = SystemState::Initialized;
            debug!("system `{}` initialized", system.name());
        }
        Ok(())
    }

    /// 1ティック進める
    ///
    /// `dt`は前フレームからの経過秒数で、そのまま各システムへ渡す
    pub fn update(&mut self, dt: f64) -> Result<()> {
        if self.disposed {
            warn!("update called on a disposed controller");
            return Ok(());
        }

        self.tick += 1;
        let started_at = Instant::now();
        let metrics_enabled = self.store.config().metrics_enabled;
        let threshold_ms = self.store.config().slow_system_threshold_ms;

        let Self {
            store,
            host,
            systems,
            tick,
            metrics,
            ..
        } = self;

        if metrics_enabled {
            metrics.begin_tick(*tick, started_at);
        }

        for slot in systems.iter_mut() {
            let SystemSlot {
                system,
                deferred,
                state,
            } = slot;

            let system_started = Instant::now();
            if let Err(err) = run_system(system.as_mut(), deferred, store, host, *tick, dt) {
                error!("system `{}` failed on tick {}: {}", system.name(), tick, err);
                return Err(err);
            }
            *state = SystemState::Updating;

            if metrics_enabled {
                let elapsed_ms = system_started.elapsed().as_secs_f64() * 1000.0;
                if elapsed_ms > threshold_ms {
                    warn!(
                        "system `{}` took {:.2} ms on tick {} (threshold {:.2} ms)",
                        system.name(),
                        elapsed_ms,
                        tick,
                        threshold_ms
                    );
                }
                metrics.record(system.name(), elapsed_ms);
            }
        }

        let purged = store.sweep_removed();
        if metrics_enabled {
            metrics.end_tick(store.entities_count(), purged);
        }
        Ok(())
    }

    /// 登録順に各システムの`destroy`を呼ぶ（2回目以降は何もしない）
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        for slot in &mut self.systems {
            if matches!(slot.state, SystemState::Initialized | SystemState::Updating) {
                slot.system.destroy();
                debug!("system `{}` destroyed", slot.system.name());
            }
            slot.state = SystemState::Destroyed;
        }
        debug!("controller disposed after {} ticks", self.tick);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// 完了したティック数
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ComponentStore {
        &mut self.store
    }

    pub fn host(&self) -> &C {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut C {
        &mut self.host
    }

    pub fn metrics(&self) -> &SystemMetrics {
        &self.metrics
    }

    /// 登録順のシステム名
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|slot| slot.system.name()).collect()
    }

    pub fn system_state(&self, index: usize) -> Option<SystemState> {
        self.systems.get(index).map(|slot| slot.state)
    }
}

/// 遅延実行キューを消化してから`update`を呼ぶ
fn run_system<C>(
    system: &mut dyn System<C>,
    deferred: &mut DeferredQueue,
    store: &mut ComponentStore,
    host: &mut C,
    tick: u64,
    dt: f64,
) -> Result<()> {
    deferred.run(store)?;
    let mut ctx = EcsContext::new(store, host, tick, deferred);
    system.update(&mut ctx, dt)
}

impl<C> Drop for EcsController<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
