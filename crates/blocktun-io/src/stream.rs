//! インターフェース/トランスポートの抽象化
//!
//! エラーの分類はアダプターの境界で `StreamErrorKind` に決める。
//! ループ側はこの種別だけを見て対応を選ぶ。

use std::fmt;
use std::io;

use thiserror::Error;

/// ストリームエラーの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// 相手に一時的に届かない（再試行可能）
    PeerUnreachable,
    /// インターフェースがデータグラムを不正として拒否した
    MalformedDatagram,
    /// それ以外（致命的）
    Other,
}

impl StreamErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamErrorKind::PeerUnreachable => "peer unreachable",
            StreamErrorKind::MalformedDatagram => "malformed datagram",
            StreamErrorKind::Other => "I/O error",
        }
    }
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分類済みのストリームエラー
#[derive(Debug, Error)]
#[error("{kind}: {source}")]
pub struct StreamError {
    kind: StreamErrorKind,
    source: io::Error,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, source: io::Error) -> Self {
        StreamError { kind, source }
    }

    /// 致命的なエラーとして包む
    pub fn other(source: io::Error) -> Self {
        Self::new(StreamErrorKind::Other, source)
    }

    pub fn kind(&self) -> StreamErrorKind {
        self.kind
    }

    pub fn io_error(&self) -> &io::Error {
        &self.source
    }
}

/// 仮想ネットワークインターフェース側
///
/// 1 回の読み書きが 1 データグラムに対応する。
pub trait InterfaceStream {
    /// データグラムを 1 つ `buf` に読み込み、長さを返す（ブロッキング）
    fn recv_datagram(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;

    /// 完成したデータグラムを 1 つ書き込む（ブロッキング）
    ///
    /// インターフェースが不正なデータグラムとして拒否した場合は
    /// `StreamErrorKind::MalformedDatagram` を返す。
    fn send_datagram(&mut self, datagram: &[u8]) -> Result<(), StreamError>;
}

/// トランスポート接続側
///
/// 1 回の読み書きが 1 パケットに対応する。
pub trait TransportStream {
    /// パケットを 1 つ `buf` に読み込み、長さを返す（ブロッキング）
    ///
    /// 相手に届かない場合は `StreamErrorKind::PeerUnreachable` を返す。
    fn recv_packet(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;

    /// 暗号化済みパケットを 1 つ送る（ブロッキング）
    ///
    /// 相手に届かない場合は `StreamErrorKind::PeerUnreachable` を返す。
    fn send_packet(&mut self, packet: &[u8]) -> Result<(), StreamError>;
}

/// 書き込みが途中で切れた場合のエラー
pub(crate) fn short_write(written: usize, expected: usize) -> StreamError {
    StreamError::other(io::Error::new(
        io::ErrorKind::WriteZero,
        format!("short write: {written} of {expected} bytes"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_display() {
        let err = StreamError::new(
            StreamErrorKind::PeerUnreachable,
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        assert_eq!(err.kind(), StreamErrorKind::PeerUnreachable);
        assert!(err.to_string().starts_with("peer unreachable: "));
    }

    #[test]
    fn test_short_write_is_fatal() {
        let err = short_write(3, 10);
        assert_eq!(err.kind(), StreamErrorKind::Other);
        assert_eq!(err.io_error().kind(), io::ErrorKind::WriteZero);
    }
}
