//! パケットヘッダー
//!
//! ## Wire Format（12 バイト、すべてリトルエンディアン）
//! ```text
//! [id: u64 LE (8 bytes)]
//! [frag_n: u8]       Fragment 番号（0 始まり）
//! [frag_num: u8]     データグラムの Fragment 総数
//! [len: u16 LE]      この Fragment のペイロード長
//! ```

use crate::error::PacketError;

/// ヘッダー長（id: 8 + frag_n: 1 + frag_num: 1 + len: 2）
pub const HEADER_LEN: usize = 12;

/// パケットヘッダー
///
/// `id` は送信方向ごとのデータグラム番号。ラップアラウンドし得るので
/// 組み立て中のデータグラム同士の区別にしか使わない（リプレイ検出には使わない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// データグラム番号
    pub id: u64,
    /// この Fragment の番号（0 始まり）
    pub frag_n: u8,
    /// Fragment 総数
    pub frag_num: u8,
    /// ペイロード長
    pub len: u16,
}

impl Header {
    /// ヘッダーを 12 バイトの配列に変換する
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..8].copy_from_slice(&self.id.to_le_bytes());
        bytes[8] = self.frag_n;
        bytes[9] = self.frag_num;
        bytes[10..12].copy_from_slice(&self.len.to_le_bytes());
        bytes
    }

    /// `buf` の先頭 12 バイトにヘッダーを書き込む
    ///
    /// # Panics
    /// `buf.len() < HEADER_LEN` の場合（呼び出し側の前提条件）
    pub fn encode(&self, buf: &mut [u8]) {
        buf[..HEADER_LEN].copy_from_slice(&self.to_bytes());
    }

    /// `buf` の先頭 12 バイトからヘッダーを復元する
    ///
    /// フィールドの範囲は検証しない（`DefragTable` が検証する）。
    ///
    /// # エラー
    /// - `PacketError::TooShort`: 12 バイト未満
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::TooShort { len: buf.len() });
        }

        let mut id_bytes = [0u8; 8];
        id_bytes.copy_from_slice(&buf[0..8]);

        Ok(Header {
            id: u64::from_le_bytes(id_bytes),
            frag_n: buf[8],
            frag_num: buf[9],
            len: u16::from_le_bytes([buf[10], buf[11]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_is_little_endian() {
        let header = Header {
            id: 0x0807_0605_0403_0201,
            frag_n: 2,
            frag_num: 3,
            len: 0x0201,
        };
        assert_eq!(
            header.to_bytes(),
            [1, 2, 3, 4, 5, 6, 7, 8, 2, 3, 0x01, 0x02]
        );
    }

    #[test]
    fn test_header_roundtrip() {
        let header = Header {
            id: u64::MAX - 1,
            frag_n: 4,
            frag_num: 5,
            len: 1400,
        };
        let mut buf = [0xFFu8; 20];
        header.encode(&mut buf);

        assert_eq!(Header::decode(&buf).unwrap(), header);
        // ヘッダー以降は書き換えない
        assert_eq!(&buf[HEADER_LEN..], &[0xFFu8; 8]);
    }

    #[test]
    fn test_decode_does_not_validate_ranges() {
        // frag_n >= frag_num でもデコード自体は成功する
        let bytes = Header { id: 1, frag_n: 9, frag_num: 2, len: u16::MAX }.to_bytes();
        let header = Header::decode(&bytes).unwrap();
        assert_eq!(header.frag_n, 9);
        assert_eq!(header.frag_num, 2);
        assert_eq!(header.len, u16::MAX);
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            Header::decode(&[0u8; 11]),
            Err(PacketError::TooShort { len: 11 })
        );
    }
}
