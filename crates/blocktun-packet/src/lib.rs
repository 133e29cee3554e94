//! # blocktun-packet
//!
//! トンネルのパケット層の実装。
//!
//! 仮想インターフェースのデータグラムを、暗号のブロック長に揃えたパケットに
//! 分割・再組み立てする。
//!
//! ## パケットの Wire Format
//!
//! ```text
//! [id: u64 LE][frag_n: u8][frag_num: u8][len: u16 LE][payload: len][zero padding]
//! |<------------------ align_up(12 + len, block_size) ------------------------->|
//! ```
//!
//! 暗号化/復号はパケット全体（パディング込み）に対して `blocktun-crypto` が行う。

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod align;
pub mod defrag;
pub mod error;
pub mod fragment;
pub mod header;

pub use align::align_up;
pub use defrag::{check_min_len, DefragTable, Reassembly};
pub use error::PacketError;
pub use fragment::{FragmentPlan, Fragmenter};
pub use header::{Header, HEADER_LEN};

/// インターフェースから読むデータグラムの最大長（読み取りバッファ長）
pub const MAX_DATAGRAM_LEN: usize = 8192;

/// 妥当なパケットが持つ最小ペイロード長（IPv4 ヘッダー長）
pub const MIN_PAYLOAD_LEN: usize = 20;

/// 受信パケットの最小長
pub const MIN_PACKET_LEN: usize = HEADER_LEN + MIN_PAYLOAD_LEN;

/// デフラグテーブルのスロット数
pub const DEFRAG_SLOTS: usize = 3;

/// 1 データグラムあたりの最大 Fragment 数
///
/// `MAX_DATAGRAM_LEN` のデータグラムを `max_pay` で分割したときの Fragment 数。
pub fn slot_capacity(max_pay: usize) -> usize {
    MAX_DATAGRAM_LEN.div_ceil(max_pay)
}

/// `max_pay` と `block_size` の組み合わせを検証する
///
/// 検証を通れば、どのデータグラムの Fragment 数も 8 ビットに、
/// Fragment のペイロード長も 16 ビットに収まる。
pub fn validate_config(max_pay: usize, block_size: usize) -> Result<(), PacketError> {
    if block_size == 0 {
        return Err(PacketError::InvalidConfig("block size must be non-zero"));
    }
    if max_pay == 0 {
        return Err(PacketError::InvalidConfig("max payload must be non-zero"));
    }
    if max_pay > u16::MAX as usize {
        return Err(PacketError::InvalidConfig("max payload must fit in 16 bits"));
    }
    if slot_capacity(max_pay) > u8::MAX as usize {
        return Err(PacketError::InvalidConfig(
            "max payload too small: a full datagram would need more than 255 fragments",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_capacity() {
        assert_eq!(slot_capacity(500), 17);
        assert_eq!(slot_capacity(8192), 1);
        assert_eq!(slot_capacity(1400), 6);
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(1400, 16).is_ok());
        assert!(validate_config(u16::MAX as usize, 16).is_ok());
        assert!(validate_config(u16::MAX as usize + 1, 16).is_err());
        assert!(validate_config(32, 16).is_err());
        assert!(validate_config(500, 0).is_err());
    }
}
