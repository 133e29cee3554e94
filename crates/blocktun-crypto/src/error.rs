//! 暗号エラー型

use thiserror::Error;

/// 暗号操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// 鍵の長さが不正（16バイト以外）
    #[error("Invalid key length (expected 16 bytes)")]
    InvalidKeyLength,
    /// Base64 デコードに失敗
    #[error("Invalid Base64 encoding")]
    InvalidBase64,
    /// バッファ長がブロック長の倍数ではない
    #[error("Buffer length {len} is not a multiple of the block size {block_size}")]
    Unaligned { len: usize, block_size: usize },
    /// ブロック長 0 は使えない
    #[error("Block size must be non-zero")]
    InvalidBlockSize,
}
