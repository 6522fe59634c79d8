//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ReconcileId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は reconcile ごとの ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数ワーカーから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_reconcile_id(&self) -> ReconcileId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を使うと timestamp 部分が固定されます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_reconcile_id(&self) -> ReconcileId {
        // epoch 以前の時刻は 0 に丸める
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        ReconcileId::from(ulid)
    }
}
