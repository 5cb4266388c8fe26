use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 全コンポーネントが実装すべきマーカートレイト
/// - `'static`: コンポーネントは参照を持たない
/// - 識別子を持たないデータのみの値で、ちょうど1つのEntityに所有される
/// - シングルスレッド前提のため`Send + Sync`は要求しない
pub trait Component: 'static {}

/// コンポーネントの種類（型）
/// 複数種類を指定するクエリやエラーメッセージで使う
#[derive(Clone, Copy)]
pub struct ComponentKind {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    /// 型からComponentKindを作成
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// TypeIdを取得
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 完全修飾の型名
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// モジュールパスを除いた型名（ログ用）
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

// 同一性はTypeIdのみで判定する
impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKind {}

impl Hash for ComponentKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// `a::b::Foo<c::Bar>` -> `Foo<c::Bar>`
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}
