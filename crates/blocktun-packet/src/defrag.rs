//! Fragment の再組み立て（デフラグテーブル）
//!
//! 固定 3 スロットを LRU 順で管理する。
//!
//! - 見つかったスロット、新しく割り当てたスロットは先頭（最近使用）へ
//! - 見つからなければ末尾のスロットを中身に関係なく追い出して使う
//! - 組み立てが完了したスロットは末尾へ（次の再利用候補）
//!
//! スロットは固定長配列に置き、LRU 順はインデックスの並び `order` で持つ。

use alloc::vec::Vec;

use crate::align::align_up;
use crate::error::PacketError;
use crate::header::{Header, HEADER_LEN};
use crate::{slot_capacity, validate_config, DEFRAG_SLOTS, MIN_PACKET_LEN};

/// `DefragTable::accept` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reassembly {
    /// データグラムが揃った（単一 Fragment の場合は即座に返る）
    Datagram(Vec<u8>),
    /// まだ Fragment が足りない
    Pending {
        /// 容量不足で追い出された組み立て途中のデータグラムの id
        evicted: Option<u64>,
    },
}

/// 受信パケットが最小長を満たすか確認する
///
/// 復号前にも呼べるよう `DefragTable` から独立させている。
pub fn check_min_len(len: usize) -> Result<(), PacketError> {
    if len < MIN_PACKET_LEN {
        return Err(PacketError::TooShort { len });
    }
    Ok(())
}

/// 1 データグラム分の組み立て状態
#[derive(Debug, Clone)]
struct Slot {
    id: u64,
    /// 期待する Fragment 数。0 なら空きスロット
    expected: u8,
    /// FragN → ペイロード（容量 = スロットの Fragment 容量）
    fragments: Vec<Option<Vec<u8>>>,
}

impl Slot {
    fn new(capacity: usize) -> Self {
        Slot {
            id: 0,
            expected: 0,
            fragments: (0..capacity).map(|_| None).collect(),
        }
    }

    fn is_active(&self) -> bool {
        self.expected != 0
    }

    fn start(&mut self, id: u64, expected: u8) {
        self.clear();
        self.id = id;
        self.expected = expected;
    }

    fn clear(&mut self) {
        self.expected = 0;
        self.fragments.iter_mut().for_each(|f| *f = None);
    }

    fn is_complete(&self) -> bool {
        self.fragments[..self.expected as usize]
            .iter()
            .all(Option::is_some)
    }

    /// FragN 順に連結してスロットを空にする
    fn take_datagram(&mut self) -> Vec<u8> {
        let parts = &mut self.fragments[..self.expected as usize];
        let total = parts.iter().flatten().map(Vec::len).sum();
        let mut datagram = Vec::with_capacity(total);
        for part in parts.iter_mut().filter_map(Option::take) {
            datagram.extend_from_slice(&part);
        }
        self.expected = 0;
        datagram
    }
}

/// Fragment を受け取り、データグラムに再組み立てするテーブル
///
/// 受信方向のループ専用。ロック不要。
#[derive(Debug, Clone)]
pub struct DefragTable {
    slots: [Slot; DEFRAG_SLOTS],
    /// LRU 順のスロット番号。`order[0]` が最近使用、末尾が最も古い
    order: [usize; DEFRAG_SLOTS],
    max_pay: usize,
    block_size: usize,
    capacity: usize,
}

impl DefragTable {
    /// 新しい DefragTable を生成する
    ///
    /// # エラー
    /// - `PacketError::InvalidConfig`: `Fragmenter::new` と同じ条件
    pub fn new(max_pay: usize, block_size: usize) -> Result<Self, PacketError> {
        validate_config(max_pay, block_size)?;
        let capacity = slot_capacity(max_pay);
        Ok(DefragTable {
            slots: core::array::from_fn(|_| Slot::new(capacity)),
            order: core::array::from_fn(|i| i),
            max_pay,
            block_size,
            capacity,
        })
    }

    /// 復号済みのパケットを 1 つ処理する
    ///
    /// # 戻り値
    /// - `Reassembly::Datagram`: 完成したデータグラム
    /// - `Reassembly::Pending`: Fragment 待ち
    ///
    /// # エラー
    /// プロトコル違反。パケットは破棄され、テーブルの状態は変わらない。
    pub fn accept(&mut self, packet: &[u8]) -> Result<Reassembly, PacketError> {
        check_min_len(packet.len())?;

        let header = Header::decode(packet)?;
        let len = header.len as usize;
        let expected_len = align_up(HEADER_LEN + len, self.block_size);
        if packet.len() != expected_len {
            return Err(PacketError::SizeMismatch {
                actual: packet.len(),
                expected: expected_len,
            });
        }
        if len > self.max_pay {
            return Err(PacketError::PayloadTooLong {
                len,
                max: self.max_pay,
            });
        }
        let payload = &packet[HEADER_LEN..HEADER_LEN + len];

        // 単一 Fragment: スロットを使わずそのまま返す
        if header.frag_num <= 1 {
            return Ok(Reassembly::Datagram(payload.to_vec()));
        }

        if header.frag_n >= header.frag_num {
            return Err(PacketError::FragmentIndexOutOfRange {
                frag_n: header.frag_n,
                frag_num: header.frag_num,
            });
        }
        if header.frag_num as usize > self.capacity {
            return Err(PacketError::TooManyFragments {
                frag_num: header.frag_num,
                capacity: self.capacity,
            });
        }

        let mut evicted = None;
        let pos = match self.find(header.id) {
            Some(pos) => {
                let slot = &self.slots[self.order[pos]];
                if slot.expected != header.frag_num {
                    return Err(PacketError::FragmentCountMismatch {
                        id: header.id,
                        frag_num: header.frag_num,
                        expected: slot.expected,
                    });
                }
                pos
            }
            None => {
                let tail = DEFRAG_SLOTS - 1;
                let slot = &mut self.slots[self.order[tail]];
                if slot.is_active() {
                    evicted = Some(slot.id);
                }
                slot.start(header.id, header.frag_num);
                tail
            }
        };
        self.promote(pos);

        let slot = &mut self.slots[self.order[0]];
        slot.fragments[header.frag_n as usize] = Some(payload.to_vec());
        if !slot.is_complete() {
            return Ok(Reassembly::Pending { evicted });
        }

        let datagram = slot.take_datagram();
        self.demote(0);
        Ok(Reassembly::Datagram(datagram))
    }

    /// 組み立て中のデータグラム数
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|s| s.is_active()).count()
    }

    /// `id` のデータグラムを組み立て中か
    pub fn is_pending(&self, id: u64) -> bool {
        self.find(id).is_some()
    }

    /// 1 データグラムあたりの最大 Fragment 数
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 組み立て中のスロットを先頭から探し、`order` 上の位置を返す
    fn find(&self, id: u64) -> Option<usize> {
        self.order.iter().position(|&i| {
            let slot = &self.slots[i];
            slot.is_active() && slot.id == id
        })
    }

    fn promote(&mut self, pos: usize) {
        self.order[..=pos].rotate_right(1);
    }

    fn demote(&mut self, pos: usize) {
        self.order[pos..].rotate_left(1);
    }
}
