//! トンネル設定
//!
//! 両方向のループが読み取り専用で共有する。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use blocktun_packet::{align_up, validate_config, PacketError, HEADER_LEN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error("config block size {config} does not match cipher block size {cipher}")]
    BlockSizeMismatch { config: usize, cipher: usize },
}

/// トンネル設定
///
/// JSON ファイルから読む場合、省略したフィールドは既定値になる。
/// ```json
/// { "interface_name": "tun0", "max_payload": 1400, "block_size": 16 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// インターフェース名（ログ出力用）
    pub interface_name: String,
    /// Fragment ペイロードの最大バイト数（ヘッダー除く）
    pub max_payload: usize,
    /// 暗号のブロック長
    pub block_size: usize,
}

impl TunnelConfig {
    pub const DEFAULT_MAX_PAYLOAD: usize = 1400;
    pub const DEFAULT_BLOCK_SIZE: usize = 16;

    /// 検証済みの設定を生成する
    pub fn new(
        interface_name: impl Into<String>,
        max_payload: usize,
        block_size: usize,
    ) -> Result<Self, ConfigError> {
        let config = TunnelConfig {
            interface_name: interface_name.into(),
            max_payload,
            block_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// JSON 文字列から読み込んで検証する
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TunnelConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// JSON ファイルから読み込んで検証する
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// `max_payload` と `block_size` の組み合わせを検証する
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self.max_payload, self.block_size)?;
        Ok(())
    }

    /// Cipher のブロック長と一致するか確認する
    pub fn check_block_size(&self, cipher_block_size: usize) -> Result<(), ConfigError> {
        if self.block_size != cipher_block_size {
            return Err(ConfigError::BlockSizeMismatch {
                config: self.block_size,
                cipher: cipher_block_size,
            });
        }
        Ok(())
    }

    /// 正しいパケットの最大長
    pub fn max_packet_len(&self) -> usize {
        align_up(HEADER_LEN + self.max_payload, self.block_size)
    }

    /// 受信バッファ長
    ///
    /// 最大パケット長より 1 ブロック大きくして、長すぎるパケットを
    /// 切り詰めずに長さ不一致として検出できるようにする。
    pub fn recv_buffer_len(&self) -> usize {
        self.max_packet_len() + self.block_size
    }
}

impl Default for TunnelConfig {
    fn default() -> Self {
        TunnelConfig {
            interface_name: String::from("tun0"),
            max_payload: Self::DEFAULT_MAX_PAYLOAD,
            block_size: Self::DEFAULT_BLOCK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TunnelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_packet_len(), 1424);
        assert_eq!(config.recv_buffer_len(), 1440);
    }

    #[test]
    fn test_new_rejects_invalid_max_payload() {
        assert!(matches!(
            TunnelConfig::new("tun0", 10, 16),
            Err(ConfigError::Packet(PacketError::InvalidConfig(_)))
        ));
        assert!(matches!(
            TunnelConfig::new("tun0", 500, 0),
            Err(ConfigError::Packet(_))
        ));
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = TunnelConfig::from_json_str(r#"{ "interface_name": "tun7", "max_payload": 500 }"#)
            .unwrap();
        assert_eq!(config.interface_name, "tun7");
        assert_eq!(config.max_payload, 500);
        assert_eq!(config.block_size, TunnelConfig::DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            TunnelConfig::from_json_str(r#"{ "max_payload": 0 }"#),
            Err(ConfigError::Packet(_))
        ));
        assert!(matches!(
            TunnelConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            TunnelConfig::from_json_file("/nonexistent/blocktun.json"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_block_size_check() {
        let config = TunnelConfig::default();
        assert!(config.check_block_size(16).is_ok());
        assert!(matches!(
            config.check_block_size(8),
            Err(ConfigError::BlockSizeMismatch { config: 16, cipher: 8 })
        ));
    }
}
