//! データグラムの Fragment 分割
//!
//! 1 つのデータグラムを `max_pay` 以下の Fragment に分割し、
//! 各 Fragment をヘッダー付き・ブロック長に揃えたパケットにする。
//!
//! ```text
//! [header: 12][payload: len][zero padding] = align_up(12 + len, block_size)
//! ```
//!
//! Fragment は `max_pay` で詰めるのではなく、できるだけ均等な長さにする。
//! 最後の Fragment だけが極端に小さくなるのを避けるため。

use alloc::vec;
use alloc::vec::Vec;

use crate::align::align_up;
use crate::error::PacketError;
use crate::header::{Header, HEADER_LEN};
use crate::{validate_config, MAX_DATAGRAM_LEN};

/// 1 データグラム分の分割計画
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentPlan {
    /// Fragment 数 = ceil(n / max_pay)
    pub frag_num: u8,
    /// 1 Fragment あたりのペイロード長 = ceil(n / frag_num)
    ///
    /// 割り切れない場合、最後の Fragment は残りのバイト数になる。
    pub pay_len: usize,
}

impl FragmentPlan {
    /// 長さ `n` のデータグラムの分割計画を求める
    ///
    /// `n == 0` なら Fragment 数 0 の計画を返す。
    ///
    /// # エラー
    /// - `PacketError::InvalidConfig`: `max_pay` が 0
    /// - `PacketError::DatagramTooLarge`: Fragment 数が 8 ビットに収まらない
    pub fn new(n: usize, max_pay: usize) -> Result<Self, PacketError> {
        if max_pay == 0 {
            return Err(PacketError::InvalidConfig("max payload must be non-zero"));
        }
        let frag_num = u8::try_from(n.div_ceil(max_pay)).map_err(|_| {
            PacketError::DatagramTooLarge {
                len: n,
                max: max_pay * u8::MAX as usize,
            }
        })?;
        let pay_len = if frag_num == 0 {
            0
        } else {
            n.div_ceil(frag_num as usize)
        };
        Ok(FragmentPlan { frag_num, pay_len })
    }
}

/// データグラムをパケット列に分割するクラス
///
/// 送信方向ごとに 1 つ持つ。`id` はデータグラムごとに 1 ずつ増える
/// （Fragment ごとではない）。
#[derive(Debug, Clone)]
pub struct Fragmenter {
    /// 次のデータグラムに付ける id
    next_id: u64,
    /// Fragment ペイロードの最大バイト数
    max_pay: usize,
    /// 暗号のブロック長
    block_size: usize,
}

impl Fragmenter {
    /// 新しい Fragmenter を生成する
    ///
    /// # 引数
    /// - `first_id`: 最初のデータグラムの id（暗号学的乱数で初期化すること）
    /// - `max_pay`: Fragment ペイロードの最大バイト数
    /// - `block_size`: 暗号のブロック長
    ///
    /// # エラー
    /// - `PacketError::InvalidConfig`: `MAX_DATAGRAM_LEN` のデータグラムが
    ///   255 Fragment に収まらない、または `block_size` が 0
    pub fn new(first_id: u64, max_pay: usize, block_size: usize) -> Result<Self, PacketError> {
        validate_config(max_pay, block_size)?;
        Ok(Fragmenter {
            next_id: first_id,
            max_pay,
            block_size,
        })
    }

    /// データグラムを暗号化前のパケット列に分割する
    ///
    /// 各パケットは `align_up(12 + len, block_size)` バイトで、
    /// パディング部分は必ずゼロで埋める。
    ///
    /// # 戻り値
    /// FragN 順のパケット列。空のデータグラムでは空の Vec を返し、id は消費しない。
    ///
    /// # エラー
    /// - `PacketError::DatagramTooLarge`: `MAX_DATAGRAM_LEN` を超えている
    pub fn make_packets(&mut self, datagram: &[u8]) -> Result<Vec<Vec<u8>>, PacketError> {
        if datagram.len() > MAX_DATAGRAM_LEN {
            return Err(PacketError::DatagramTooLarge {
                len: datagram.len(),
                max: MAX_DATAGRAM_LEN,
            });
        }
        if datagram.is_empty() {
            return Ok(Vec::new());
        }

        let plan = FragmentPlan::new(datagram.len(), self.max_pay)?;
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let mut packets = Vec::with_capacity(plan.frag_num as usize);
        for (frag_n, payload) in datagram.chunks(plan.pay_len).enumerate() {
            // pay_len <= max_pay <= u16::MAX は validate_config で保証済み
            let header = Header {
                id,
                frag_n: frag_n as u8,
                frag_num: plan.frag_num,
                len: payload.len() as u16,
            };

            let used_len = HEADER_LEN + payload.len();
            let mut pkt = vec![0u8; align_up(used_len, self.block_size)];
            header.encode(&mut pkt);
            pkt[HEADER_LEN..used_len].copy_from_slice(payload);
            packets.push(pkt);
        }
        debug_assert_eq!(packets.len(), plan.frag_num as usize);

        Ok(packets)
    }

    /// 次のデータグラムに付ける id を返す
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Fragment ペイロードの最大バイト数
    pub fn max_pay(&self) -> usize {
        self.max_pay
    }
}
