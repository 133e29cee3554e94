//! blocktun-packet エラー型

use thiserror::Error;

/// パケット層のエラー
///
/// 受信側のバリアントはすべてプロトコル違反で、該当パケットを破棄すれば済む。
/// 他の組み立て中データグラムには影響しない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// パケットがヘッダー + 最小ペイロードより短い
    #[error("Packet too short: {len} bytes")]
    TooShort { len: usize },
    /// 宣言された Len から求めたパケット長と実際の長さが一致しない
    #[error("Bad packet size: {actual} != {expected}")]
    SizeMismatch { actual: usize, expected: usize },
    /// Len が設定上の最大ペイロードを超えている
    #[error("Fragment payload {len} exceeds max payload {max}")]
    PayloadTooLong { len: usize, max: usize },
    /// FragN >= FragNum
    #[error("Bad header: fragment index {frag_n} out of range for {frag_num} fragments")]
    FragmentIndexOutOfRange { frag_n: u8, frag_num: u8 },
    /// FragNum がスロットの Fragment 容量を超えている
    #[error("Bad header: {frag_num} fragments exceed slot capacity {capacity}")]
    TooManyFragments { frag_num: u8, capacity: usize },
    /// 組み立て中の FragNum と食い違う
    #[error("Bad header: id {id} announced {frag_num} fragments, reassembly expects {expected}")]
    FragmentCountMismatch { id: u64, frag_num: u8, expected: u8 },
    /// 送信データグラムが読み取りバッファの上限を超えている
    #[error("Datagram of {len} bytes exceeds the {max} byte limit")]
    DatagramTooLarge { len: usize, max: usize },
    /// 設定が不正（max_payload / block_size）
    #[error("Invalid packet configuration: {0}")]
    InvalidConfig(&'static str),
}

impl PacketError {
    /// 統計・ログ用の短い理由名
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketError::TooShort { .. } => "too_short",
            PacketError::SizeMismatch { .. } => "size_mismatch",
            PacketError::PayloadTooLong { .. } => "payload_too_long",
            PacketError::FragmentIndexOutOfRange { .. } => "fragment_index",
            PacketError::TooManyFragments { .. } => "too_many_fragments",
            PacketError::FragmentCountMismatch { .. } => "fragment_count",
            PacketError::DatagramTooLarge { .. } => "datagram_too_large",
            PacketError::InvalidConfig(_) => "invalid_config",
        }
    }
}
