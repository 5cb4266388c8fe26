use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::Result;

/// 1システム・1ティック分の更新時間
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemTiming {
    pub name: String,
    pub duration_ms: f64,
}

/// 直近ティックの計測結果
#[derive(Debug, Default)]
pub struct SystemMetrics {
    tick: u64,
    tick_started_at: Option<Instant>,
    frame_duration: Duration,
    timings: Vec<SystemTiming>,
    entities_count: usize,
    purged_count: usize,
}

impl SystemMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin_tick(&mut self, tick: u64, started_at: Instant) {
        self.tick = tick;
        self.tick_started_at = Some(started_at);
        self.timings.clear();
    }

    pub(crate) fn record(&mut self, name: &str, duration_ms: f64) {
        self.timings.push(SystemTiming {
            name: name.to_string(),
            duration_ms,
        });
    }

    pub(crate) fn end_tick(&mut self, entities_count: usize, purged_count: usize) {
        self.frame_duration = self
            .tick_started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.entities_count = entities_count;
        self.purged_count = purged_count;
    }

    /// 計測したティック（未計測なら0）
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tick_started_at(&self) -> Option<Instant> {
        self.tick_started_at
    }

    /// 遅延実行・更新・スイープを含むティック全体の時間
    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// 登録順のシステムごとの時間
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }

    /// 全システムの更新時間の合計（ミリ秒）
    pub fn total_update_ms(&self) -> f64 {
        self.timings.iter().map(|t| t.duration_ms).sum()
    }

    /// 最も遅かったシステム
    pub fn slowest_system(&self) -> Option<(&str, f64)> {
        self.timings
            .iter()
            .max_by(|a, b| a.duration_ms.total_cmp(&b.duration_ms))
            .map(|t| (t.name.as_str(), t.duration_ms))
    }

    /// スイープ後のEntity数
    pub fn entities_count(&self) -> usize {
        self.entities_count
    }

    /// このティックでパージされたEntity数
    pub fn purged_count(&self) -> usize {
        self.purged_count
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let slowest = self.slowest_system();
        MetricsSnapshot {
            tick: self.tick,
            frame_ms: self.frame_duration.as_secs_f64() * 1000.0,
            total_update_ms: self.total_update_ms(),
            slowest_system: slowest.map(|(name, _)| name.to_string()),
            slowest_system_ms: slowest.map_or(0.0, |(_, ms)| ms),
            entities_count: self.entities_count,
            purged_count: self.purged_count,
            timings: self.timings.clone(),
        }
    }
}

/// ログやデバッグ表示向けの計測結果
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub frame_ms: f64,
    pub total_update_ms: f64,
    pub slowest_system: Option<String>,
    pub slowest_system_ms: f64,
    pub entities_count: usize,
    pub purged_count: usize,
    pub timings: Vec<SystemTiming>,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SystemMetrics {
        let mut metrics = SystemMetrics::new();
        metrics.begin_tick(3, Instant::now());
        metrics.record("Input", 0.5);
        metrics.record("Render", 4.0);
        metrics.record("Animation", 1.5);
        metrics.end_tick(10, 2);
        metrics
    }

    #[test]
    fn test_empty() {
        let metrics = SystemMetrics::new();
        assert_eq!(metrics.tick(), 0);
        assert!(metrics.tick_started_at().is_none());
        assert!(metrics.slowest_system().is_none());
        assert_eq!(metrics.total_update_ms(), 0.0);
    }

    #[test]
    fn test_aggregates() {
        let metrics = sample();
        assert_eq!(metrics.tick(), 3);
        assert_eq!(metrics.timings().len(), 3);
        assert_eq!(metrics.total_update_ms(), 6.0);
        assert_eq!(metrics.slowest_system(), Some(("Render", 4.0)));
        assert_eq!(metrics.entities_count(), 10);
        assert_eq!(metrics.purged_count(), 2);
    }

    #[test]
    fn test_begin_tick_resets_timings() {
        let mut metrics = sample();
        metrics.begin_tick(4, Instant::now());
        assert!(metrics.timings().is_empty());
        assert_eq!(metrics.tick(), 4);
    }

    #[test]
    fn test_snapshot_json() {
        let json = sample().snapshot().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["tick"], 3);
        assert_eq!(value["slowest_system"], "Render");
        assert_eq!(value["timings"][1]["name"], "Render");
        assert_eq!(value["timings"].as_array().unwrap().len(), 3);
    }
}
