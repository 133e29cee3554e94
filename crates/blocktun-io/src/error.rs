//! ループの終了理由と致命的エラー

use blocktun_crypto::CryptoError;
use blocktun_packet::PacketError;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::stream::StreamError;
use crate::Direction;

/// ループの正常終了理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// インターフェースが再組み立てしたデータグラムを不正として拒否した
    OutputRejected,
}

/// 回復しないエラー
///
/// 受け取ったら `terminate` でプロセスを終了する。
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("interface read failed: {0}")]
    InterfaceRead(#[source] StreamError),
    #[error("interface write failed: {0}")]
    InterfaceWrite(#[source] StreamError),
    #[error("transport read failed: {0}")]
    TransportRead(#[source] StreamError),
    #[error("transport write failed: {0}")]
    TransportWrite(#[source] StreamError),
    #[error("cipher failed: {0}")]
    Cipher(#[from] CryptoError),
    #[error("fragmentation failed: {0}")]
    Fragment(#[source] PacketError),
    #[error("random id seed unavailable: {0}")]
    Seed(getrandom::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// 致命的エラーを出力してプロセスを即時終了する
///
/// 途中の状態は回復できないので、継続はしない。
pub fn terminate(direction: Direction, err: &FatalError) -> ! {
    error!(%direction, error = %err, "fatal error, terminating");
    std::process::exit(1)
}
