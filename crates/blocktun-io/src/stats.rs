//! ループごとの統計情報

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::Direction;

/// 1 つのループの統計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    /// 処理したデータグラム数（送信: 読んだ数、受信: 書いた数）
    pub datagrams: u64,
    /// 処理したパケット数（送信: 送った数、受信: 読んだ数）
    pub packets: u64,
    /// 破棄したパケット数（理由別）
    pub dropped: BTreeMap<&'static str, u64>,
    /// 一時的なトランスポートエラーの回数
    pub transient_errors: u64,
    /// 組み立て途中で追い出されたデータグラム数
    pub evictions: u64,
}

impl LoopStats {
    pub fn record_drop(&mut self, reason: &'static str) {
        *self.dropped.entry(reason).or_default() += 1;
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.values().sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// ループ終了時のサマリーを 1 行で出力する
    pub(crate) fn log_summary(&self, direction: Direction, iface: &str) {
        match self.to_json() {
            Ok(json) => info!(%direction, %iface, stats = %json, "loop finished"),
            Err(e) => info!(%direction, %iface, error = %e, "loop finished (stats unavailable)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_drop_counts_by_reason() {
        let mut stats = LoopStats::default();
        stats.record_drop("too_short");
        stats.record_drop("too_short");
        stats.record_drop("size_mismatch");

        assert_eq!(stats.dropped["too_short"], 2);
        assert_eq!(stats.total_dropped(), 3);
    }

    #[test]
    fn test_to_json() {
        let mut stats = LoopStats {
            datagrams: 2,
            packets: 5,
            ..Default::default()
        };
        stats.record_drop("cipher");

        let json: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
        assert_eq!(json["datagrams"], 2);
        assert_eq!(json["packets"], 5);
        assert_eq!(json["dropped"]["cipher"], 1);
        assert_eq!(json["evictions"], 0);
    }
}
