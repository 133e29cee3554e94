//! 恒等変換（鍵なし運用・テスト用）

use crate::error::CryptoError;
use crate::{check_aligned, Cipher};

/// 何も変換しない Cipher
///
/// ブロック長の制約だけは本物の暗号と同じように課す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainCipher {
    block_size: usize,
}

impl PlainCipher {
    /// # エラー
    /// - `CryptoError::InvalidBlockSize`: `block_size` が 0
    pub fn new(block_size: usize) -> Result<Self, CryptoError> {
        if block_size == 0 {
            return Err(CryptoError::InvalidBlockSize);
        }
        Ok(PlainCipher { block_size })
    }
}

impl Cipher for PlainCipher {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        check_aligned(buf.len(), self.block_size)
    }

    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        check_aligned(buf.len(), self.block_size)
    }
}
