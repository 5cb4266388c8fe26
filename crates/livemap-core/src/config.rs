//! Runtime configuration for the ECS core.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 削除マーク済み（スイープ前）のEntityに対する変更の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovedEntityPolicy {
    /// スイープまでは通常どおり変更を受け付ける
    #[default]
    Allow,
    /// 変更を`EcsError::RemovedEntity`で拒否する
    Reject,
}

/// ECS設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// 削除マーク済みEntityへの変更ポリシー
    pub removed_entity_policy: RemovedEntityPolicy,

    /// システムごとの更新時間を計測するか
    pub metrics_enabled: bool,

    /// これを超えたシステムは警告ログを出す（ミリ秒）
    pub slow_system_threshold_ms: f64,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            removed_entity_policy: RemovedEntityPolicy::Allow,
            metrics_enabled: true,
            slow_system_threshold_ms: 16.0,
        }
    }
}

impl EcsConfig {
    /// JSON文字列から読み込む（省略したフィールドはデフォルト値）
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 削除ポリシーを設定
    pub fn with_removed_entity_policy(mut self, policy: RemovedEntityPolicy) -> Self {
        self.removed_entity_policy = policy;
        self
    }

    /// 計測の有効/無効を設定
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}
