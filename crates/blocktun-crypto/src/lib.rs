//! # blocktun-crypto
//!
//! パケット暗号化の変換を提供するクレート。
//! `no_std` + `alloc` 環境で動作する。
//!
//! ## 暗号化の仕様
//!
//! ```text
//! 送信: [header: 12][payload][zero padding] --encrypt--> transport
//! 受信: transport --decrypt--> [header: 12][payload][padding]
//! ```
//!
//! - 入力は常にブロック長の倍数（パケット層が揃える）
//! - 変換は長さを保存する（暗号文 = 平文と同じ長さ）
//! - パケットごとに独立して変換する（パケット損失で同期がずれない）

#![no_std]
extern crate alloc;

mod block;
mod error;
mod plain;

pub use block::Aes128Block;
pub use error::CryptoError;
pub use plain::PlainCipher;

/// パケット単位のブロック暗号変換
///
/// 送信方向と受信方向で別インスタンスを使う（`Clone` で複製する）。
pub trait Cipher: Clone {
    /// ブロック長（バイト）
    fn block_size(&self) -> usize;

    /// `buf` をその場で暗号化する
    ///
    /// # エラー
    /// - `CryptoError::Unaligned`: `buf.len()` がブロック長の倍数でない
    fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError>;

    /// `buf` をその場で復号する
    ///
    /// # エラー
    /// - `CryptoError::Unaligned`: `buf.len()` がブロック長の倍数でない
    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError>;
}

/// バッファ長がブロック長の倍数であることを確認する
pub(crate) fn check_aligned(len: usize, block_size: usize) -> Result<(), CryptoError> {
    if len % block_size != 0 {
        return Err(CryptoError::Unaligned { len, block_size });
    }
    Ok(())
}

/// AES-128 鍵を Base64（URL-safe、パディングなし、22 文字）から復元する
///
/// 前後の空白は無視する（鍵ファイルの末尾改行など）。
pub fn decode_base64_key(encoded: &str) -> Result<[u8; 16], CryptoError> {
    use base64::Engine as _;
    let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded.trim())
        .map_err(|_| CryptoError::InvalidBase64)?;
    <[u8; 16]>::try_from(raw.as_slice()).map_err(|_| CryptoError::InvalidKeyLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_key_valid() {
        let key = decode_base64_key("AAAAAAAAAAAAAAAAAAAAAA\n").unwrap();
        assert_eq!(key, [0u8; 16]);
    }

    #[test]
    fn test_decode_base64_key_invalid_length() {
        assert_eq!(
            decode_base64_key("AAAAAAAAAAAAAA"),
            Err(CryptoError::InvalidKeyLength)
        );
    }

    #[test]
    fn test_decode_base64_key_invalid_chars() {
        assert_eq!(decode_base64_key("!!!!"), Err(CryptoError::InvalidBase64));
    }

    #[test]
    fn test_check_aligned() {
        assert!(check_aligned(0, 16).is_ok());
        assert!(check_aligned(32, 16).is_ok());
        assert_eq!(
            check_aligned(33, 16),
            Err(CryptoError::Unaligned { len: 33, block_size: 16 })
        );
    }
}
