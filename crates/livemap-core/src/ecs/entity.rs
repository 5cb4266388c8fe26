use std::fmt;

/// Entity識別子
/// - ComponentStoreが生成順に単調増加で割り当てる
/// - 削除後も再利用しない（世代番号は不要）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// 生の値からEntityIdを作成
    /// 通常はComponentStore::create_entityを使うこと
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 生の値を取得
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// 次のIDを返す
    #[inline]
    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_raw() {
        let id = EntityId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(u64::from(id), 42);
    }

    #[test]
    fn test_equality_and_order() {
        let a = EntityId::new(1);
        let b = EntityId::new(1);
        let c = EntityId::new(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }

    #[test]
    fn test_next() {
        assert_eq!(EntityId::new(7).next(), EntityId::new(8));
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId::new(5).to_string(), "#5");
    }
}
