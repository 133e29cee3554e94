//! AES-128 ブロック暗号変換
//!
//! CBC 連鎖、IV はパケットごとにゼロから開始する。
//! パディングはパケット層が付与済みなので、ここでは追加しない。

use core::fmt;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::CryptoError;
use crate::{check_aligned, decode_base64_key, Cipher};

/// AES のブロック長（バイト）
const BLOCK_LEN: usize = 16;

/// AES-128 によるパケット変換
#[derive(Clone)]
pub struct Aes128Block {
    cipher: Aes128,
}

impl Aes128Block {
    /// 16 バイトの raw 鍵から初期化する
    pub fn from_key(key: [u8; 16]) -> Self {
        Aes128Block {
            cipher: Aes128::new((&key).into()),
        }
    }

    /// Base64 鍵（22文字）から初期化する
    ///
    /// # エラー
    /// - `CryptoError::InvalidBase64`: Base64 デコード失敗
    /// - `CryptoError::InvalidKeyLength`: 鍵長が 16 バイト以外
    pub fn from_base64_key(key_b64: &str) -> Result<Self, CryptoError> {
        Ok(Self::from_key(decode_base64_key(key_b64)?))
    }
}

impl fmt::Debug for Aes128Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 鍵スケジュールは出力しない
        f.debug_struct("Aes128Block").finish_non_exhaustive()
    }
}

impl Cipher for Aes128Block {
    fn block_size(&self) -> usize {
        BLOCK_LEN
    }

    fn encrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        check_aligned(buf.len(), BLOCK_LEN)?;

        let mut prev = [0u8; BLOCK_LEN];
        for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            self.cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
            prev.copy_from_slice(chunk);
        }
        Ok(())
    }

    fn decrypt(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        check_aligned(buf.len(), BLOCK_LEN)?;

        let mut prev = [0u8; BLOCK_LEN];
        for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
            let mut saved = [0u8; BLOCK_LEN];
            saved.copy_from_slice(chunk);
            self.cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
            for (b, p) in chunk.iter_mut().zip(prev.iter()) {
                *b ^= p;
            }
            prev = saved;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn make_cipher() -> Aes128Block {
        Aes128Block::from_key([7u8; 16])
    }

    #[test]
    fn test_encrypt_decrypt_preserves_length_and_content() {
        let mut tx = make_cipher();
        let mut rx = tx.clone();

        let original: Vec<u8> = (0u8..64).collect();
        let mut buf = original.clone();

        tx.encrypt(&mut buf).unwrap();
        assert_eq!(buf.len(), original.len());
        assert_ne!(buf, original);

        rx.decrypt(&mut buf).unwrap();
        assert_eq!(buf, original);
    }

    #[test]
    fn test_identical_blocks_encrypt_differently() {
        // CBC 連鎖なので同じ平文ブロックでも暗号文は異なる
        let mut cipher = make_cipher();
        let mut buf = [0xAAu8; 32];
        cipher.encrypt(&mut buf).unwrap();
        assert_ne!(buf[..16], buf[16..]);
    }

    #[test]
    fn test_packets_are_independent() {
        // 先行パケットを取りこぼしても復号できる
        let mut tx = make_cipher();
        let mut rx = make_cipher();

        let mut first = [1u8; 16];
        let mut second = [2u8; 16];
        tx.encrypt(&mut first).unwrap();
        tx.encrypt(&mut second).unwrap();

        rx.decrypt(&mut second).unwrap();
        assert_eq!(second, [2u8; 16]);
    }

    #[test]
    fn test_wrong_key_does_not_decrypt() {
        let mut tx = make_cipher();
        let mut rx = Aes128Block::from_key([8u8; 16]);

        let mut buf = [5u8; 16];
        tx.encrypt(&mut buf).unwrap();
        rx.decrypt(&mut buf).unwrap();
        assert_ne!(buf, [5u8; 16]);
    }

    #[test]
    fn test_unaligned_rejected() {
        let mut cipher = make_cipher();
        let mut buf = [0u8; 20];
        assert_eq!(
            cipher.encrypt(&mut buf),
            Err(CryptoError::Unaligned { len: 20, block_size: 16 })
        );
        assert!(cipher.decrypt(&mut buf).is_err());
    }

    #[test]
    fn test_from_base64_key() {
        assert!(Aes128Block::from_base64_key("AAAAAAAAAAAAAAAAAAAAAA").is_ok());
        assert!(Aes128Block::from_base64_key("AAAA").is_err());
    }
}
