//! Error types for the ECS core

use thiserror::Error;

use crate::ecs::EntityId;

/// ECS操作のエラー
///
/// いずれもプログラミング上の誤りを表し、実行時に回復する想定はない。
/// 失敗した操作はストアを変更しない。
#[derive(Debug, Error)]
pub enum EcsError {
    #[error("entity {entity} already has component {component}")]
    DuplicateComponent { entity: EntityId, component: String },

    #[error("entity {entity} has no component {component}")]
    ComponentNotFound { entity: EntityId, component: String },

    #[error("no entity with components [{components}]")]
    NotFound { components: String },

    #[error("expected a single entity with components [{components}], found {count}")]
    NotSingleton { components: String, count: usize },

    #[error("entity {0} is unknown or removed")]
    UnknownOrRemovedEntity(EntityId),

    #[error("entity {0} is marked for removal and cannot be modified")]
    RemovedEntity(EntityId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("system `{system}` failed: {message}")]
    System { system: String, message: String },
}

impl EcsError {
    /// システム固有のエラーを作成
    pub fn system(system: impl Into<String>, message: impl Into<String>) -> Self {
        EcsError::System {
            system: system.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        EcsError::Config(err.to_string())
    }
}

/// Result type alias for ECS operations
pub type Result<T> = std::result::Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = EcsError::DuplicateComponent {
            entity: EntityId::new(3),
            component: "Position".to_string(),
        };
        assert_eq!(err.to_string(), "entity #3 already has component Position");

        let err = EcsError::NotSingleton {
            components: "A, B".to_string(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "expected a single entity with components [A, B], found 2"
        );
    }

    #[test]
    fn test_system_error() {
        let err = EcsError::system("Animation", "bad curve");
        assert_eq!(err.to_string(), "system `Animation` failed: bad curve");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: EcsError = json_err.into();
        assert!(matches!(err, EcsError::Config(_)));
    }
}
