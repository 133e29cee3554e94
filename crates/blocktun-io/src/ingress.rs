//! 受信方向のループ（transport → interface）

use blocktun_crypto::Cipher;
use blocktun_packet::{check_min_len, DefragTable, PacketError, Reassembly};
use tracing::{debug, warn};

use crate::config::TunnelConfig;
use crate::error::{FatalError, LoopExit};
use crate::stats::LoopStats;
use crate::stream::{InterfaceStream, StreamErrorKind, TransportStream};
use crate::Direction;

/// 受信ループ
///
/// トランスポートからパケットを 1 つ読み、復号して DefragTable に渡し、
/// データグラムが揃ったらインターフェースに書く。これを繰り返す。
/// DefragTable はこのループ専用。
pub struct IngressLoop<I, T, C> {
    iface: I,
    transport: T,
    cipher: C,
    table: DefragTable,
    interface_name: String,
    recv_buffer_len: usize,
    stats: LoopStats,
}

impl<I, T, C> IngressLoop<I, T, C>
where
    I: InterfaceStream,
    T: TransportStream,
    C: Cipher,
{
    pub fn new(config: &TunnelConfig, iface: I, transport: T, cipher: C) -> Result<Self, FatalError> {
        config.check_block_size(cipher.block_size())?;
        let table = DefragTable::new(config.max_payload, config.block_size)
            .map_err(|e| FatalError::Config(e.into()))?;

        Ok(IngressLoop {
            iface,
            transport,
            cipher,
            table,
            interface_name: config.interface_name.clone(),
            recv_buffer_len: config.recv_buffer_len(),
            stats: LoopStats::default(),
        })
    }

    /// 致命的エラーか、インターフェースが書き込みを拒否するまでループする
    pub fn run(&mut self) -> Result<LoopExit, FatalError> {
        let result = self.run_inner();
        self.stats.log_summary(Direction::Ingress, &self.interface_name);
        result
    }

    fn run_inner(&mut self) -> Result<LoopExit, FatalError> {
        let mut buf = vec![0u8; self.recv_buffer_len];
        loop {
            let n = match self.transport.recv_packet(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == StreamErrorKind::PeerUnreachable => {
                    self.stats.transient_errors += 1;
                    warn!(iface = %self.interface_name, error = %e, "peer unreachable");
                    continue;
                }
                Err(e) => return Err(FatalError::TransportRead(e)),
            };
            if let Some(exit) = self.handle_packet(&mut buf[..n])? {
                return Ok(exit);
            }
        }
    }

    /// 受信パケットを 1 つ処理する（`packet` はその場で復号される）
    ///
    /// # 戻り値
    /// - `Some(LoopExit)`: ループを終えるべき
    /// - `None`: 継続
    pub fn handle_packet(&mut self, packet: &mut [u8]) -> Result<Option<LoopExit>, FatalError> {
        if packet.is_empty() {
            return Ok(None);
        }
        self.stats.packets += 1;

        if let Err(e) = check_min_len(packet.len()) {
            self.drop_packet(&e);
            return Ok(None);
        }
        if let Err(e) = self.cipher.decrypt(packet) {
            self.stats.record_drop("cipher");
            warn!(iface = %self.interface_name, error = %e, "cannot decrypt packet");
            return Ok(None);
        }

        match self.table.accept(packet) {
            Ok(Reassembly::Datagram(datagram)) => self.deliver(&datagram),
            Ok(Reassembly::Pending { evicted }) => {
                if let Some(id) = evicted {
                    self.stats.evictions += 1;
                    debug!(iface = %self.interface_name, id, "incomplete datagram evicted");
                }
                Ok(None)
            }
            Err(e) => {
                self.drop_packet(&e);
                Ok(None)
            }
        }
    }

    fn deliver(&mut self, datagram: &[u8]) -> Result<Option<LoopExit>, FatalError> {
        match self.iface.send_datagram(datagram) {
            Ok(()) => {
                self.stats.datagrams += 1;
                Ok(None)
            }
            Err(e) if e.kind() == StreamErrorKind::MalformedDatagram => {
                warn!(iface = %self.interface_name, error = %e, "invalid IP datagram");
                Ok(Some(LoopExit::OutputRejected))
            }
            Err(e) => Err(FatalError::InterfaceWrite(e)),
        }
    }

    fn drop_packet(&mut self, err: &PacketError) {
        self.stats.record_drop(err.as_str());
        warn!(iface = %self.interface_name, error = %err, "dropping packet");
    }

    pub fn table(&self) -> &DefragTable {
        &self.table
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
