//! # blocktun-io
//!
//! 方向別ループ（DirectionalLoop）の実装。
//!
//! ```text
//! 送信 (EgressLoop):
//!   interface → Fragmenter → encrypt → transport
//!
//! 受信 (IngressLoop):
//!   transport → decrypt → DefragTable → interface
//! ```
//!
//! 2 つのループは独立したスレッドで動き、共有するのは読み取り専用の設定だけ。
//! Cipher は方向ごとに別インスタンスを持つ。
//!
//! ## エラーの扱い
//!
//! | 種類 | 対応 |
//! |---|---|
//! | プロトコル違反（`PacketError`、復号失敗） | ログ出力、パケット破棄、継続 |
//! | 相手に一時的に届かない（`PeerUnreachable`） | ログ出力、継続 |
//! | インターフェースが書き込みを拒否（`MalformedDatagram`） | ログ出力、そのループだけ終了 |
//! | それ以外の I/O エラー（`FatalError`） | ログ出力、プロセス即時終了 |

pub mod config;
pub mod device;
pub mod egress;
pub mod error;
pub mod ingress;
pub mod stats;
pub mod stream;
pub mod udp;

pub use config::{ConfigError, TunnelConfig};
pub use device::DeviceInterface;
pub use egress::EgressLoop;
pub use error::{terminate, FatalError, LoopExit};
pub use ingress::IngressLoop;
pub use stats::LoopStats;
pub use stream::{InterfaceStream, StreamError, StreamErrorKind, TransportStream};
pub use udp::UdpTransport;

use std::fmt;

/// トラフィックの方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// インターフェース → トランスポート
    Egress,
    /// トランスポート → インターフェース
    Ingress,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Egress => "egress",
            Direction::Ingress => "ingress",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 送信 id の初期値を暗号学的乱数から生成する
pub fn random_id() -> Result<u64, getrandom::Error> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}
