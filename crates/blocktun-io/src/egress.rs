//! 送信方向のループ（interface → transport）

use blocktun_crypto::Cipher;
use blocktun_packet::{Fragmenter, MAX_DATAGRAM_LEN};
use tracing::{debug, warn};

use crate::config::TunnelConfig;
use crate::error::{FatalError, LoopExit};
use crate::stats::LoopStats;
use crate::stream::{InterfaceStream, StreamErrorKind, TransportStream};
use crate::{random_id, Direction};

/// 送信ループ
///
/// インターフェースからデータグラムを 1 つ読み、Fragment に分割し、
/// パケットごとに暗号化して送る。これを繰り返す。
pub struct EgressLoop<I, T, C> {
    iface: I,
    transport: T,
    cipher: C,
    fragmenter: Fragmenter,
    interface_name: String,
    stats: LoopStats,
}

impl<I, T, C> EgressLoop<I, T, C>
where
    I: InterfaceStream,
    T: TransportStream,
    C: Cipher,
{
    /// 送信ループを生成する。最初の id は暗号学的乱数から決める
    pub fn new(config: &TunnelConfig, iface: I, transport: T, cipher: C) -> Result<Self, FatalError> {
        let first_id = random_id().map_err(FatalError::Seed)?;
        Self::with_first_id(config, iface, transport, cipher, first_id)
    }

    /// 最初の id を指定して送信ループを生成する
    pub fn with_first_id(
        config: &TunnelConfig,
        iface: I,
        transport: T,
        cipher: C,
        first_id: u64,
    ) -> Result<Self, FatalError> {
        config.check_block_size(cipher.block_size())?;
        let fragmenter = Fragmenter::new(first_id, config.max_payload, config.block_size)
            .map_err(|e| FatalError::Config(e.into()))?;

        Ok(EgressLoop {
            iface,
            transport,
            cipher,
            fragmenter,
            interface_name: config.interface_name.clone(),
            stats: LoopStats::default(),
        })
    }

    /// 致命的エラーが起きるまでループする
    pub fn run(&mut self) -> Result<LoopExit, FatalError> {
        let result = self.run_inner();
        self.stats.log_summary(Direction::Egress, &self.interface_name);
        result
    }

    fn run_inner(&mut self) -> Result<LoopExit, FatalError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            let n = self
                .iface
                .recv_datagram(&mut buf)
                .map_err(FatalError::InterfaceRead)?;
            if n == 0 {
                continue;
            }
            self.forward(&buf[..n])?;
        }
    }

    /// データグラムを 1 つ分割・暗号化して送る
    ///
    /// 相手に届かない場合は残りの Fragment を捨てて戻る（id は消費済み）。
    pub fn forward(&mut self, datagram: &[u8]) -> Result<(), FatalError> {
        let id = self.fragmenter.next_id();
        let packets = self
            .fragmenter
            .make_packets(datagram)
            .map_err(FatalError::Fragment)?;
        self.stats.datagrams += 1;
        debug!(iface = %self.interface_name, id, len = datagram.len(), fragments = packets.len(), "sending datagram");

        for mut pkt in packets {
            self.cipher.encrypt(&mut pkt)?;
            match self.transport.send_packet(&pkt) {
                Ok(()) => self.stats.packets += 1,
                Err(e) if e.kind() == StreamErrorKind::PeerUnreachable => {
                    self.stats.transient_errors += 1;
                    warn!(iface = %self.interface_name, id, error = %e, "peer unreachable, dropping rest of datagram");
                    break;
                }
                Err(e) => return Err(FatalError::TransportWrite(e)),
            }
        }
        Ok(())
    }

    /// 次のデータグラムに付ける id
    pub fn next_id(&self) -> u64 {
        self.fragmenter.next_id()
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn interface(&self) -> &I {
        &self.iface
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
