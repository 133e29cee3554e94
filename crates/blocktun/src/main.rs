//! blocktun: TUN デバイスのデータグラムを UDP で対向ホストへ運ぶ
//!
//! デバイスの作成・アドレス設定は外部で済ませておく。
//! このプロセスは開いたデバイスと UDP ソケットの間で 2 方向のループを回すだけ。

use std::net::SocketAddr;
use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use blocktun_crypto::{Aes128Block, Cipher, PlainCipher};
use blocktun_io::{
    terminate, DeviceInterface, Direction, EgressLoop, FatalError, IngressLoop, LoopExit,
    TunnelConfig, UdpTransport,
};

/// Point-to-point datagram tunnel
#[derive(Parser, Debug)]
#[command(name = "blocktun")]
#[command(about = "Tunnel a TUN device over UDP with block-aligned packets", long_about = None)]
struct Args {
    /// Path of an already configured TUN device (e.g. /dev/net/tun0)
    #[arg(short, long)]
    device: PathBuf,

    /// Interface name used in log lines [default: tun0]
    #[arg(short, long)]
    name: Option<String>,

    /// Local UDP address to bind
    #[arg(short, long)]
    local: SocketAddr,

    /// Remote UDP address of the peer
    #[arg(short, long)]
    remote: SocketAddr,

    /// Maximum payload bytes per packet [default: 1400]
    #[arg(long)]
    max_payload: Option<usize>,

    /// AES-128 key (base64url, 22 chars). Packets are sent unencrypted when omitted
    #[arg(short, long)]
    key: Option<String>,

    /// Block size used without a key [default: 16]
    #[arg(long)]
    block_size: Option<usize>,

    /// JSON file with `interface_name`, `max_payload` and `block_size`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

impl Args {
    /// ファイル → コマンドライン引数の順に上書きして設定を組み立てる
    fn tunnel_config(&self, block_size: usize) -> anyhow::Result<TunnelConfig> {
        let mut config = match &self.config {
            Some(path) => TunnelConfig::from_json_file(path)?,
            None => TunnelConfig::default(),
        };
        if let Some(name) = &self.name {
            config.interface_name = name.clone();
        }
        if let Some(max_payload) = self.max_payload {
            config.max_payload = max_payload;
        }
        config.block_size = block_size;
        config.validate()?;
        Ok(config)
    }

    /// 鍵なしのときのブロック長（引数 → 設定ファイル → 既定値）
    fn plain_block_size(&self) -> anyhow::Result<usize> {
        if let Some(block_size) = self.block_size {
            return Ok(block_size);
        }
        match &self.config {
            Some(path) => Ok(TunnelConfig::from_json_file(path)?.block_size),
            None => Ok(TunnelConfig::DEFAULT_BLOCK_SIZE),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match &args.key {
        Some(key) => {
            let cipher = Aes128Block::from_base64_key(key).context("invalid --key")?;
            if args.block_size.is_some_and(|bs| bs != cipher.block_size()) {
                warn!("--block-size is ignored when --key is given");
            }
            start(&args, cipher)
        }
        None => {
            warn!("no key given, packets are sent unencrypted");
            let cipher = PlainCipher::new(args.plain_block_size()?)?;
            start(&args, cipher)
        }
    }
}

/// デバイスとソケットを開き、2 方向のループをそれぞれのスレッドで回す
fn start<C>(args: &Args, cipher: C) -> anyhow::Result<()>
where
    C: Cipher + Send + 'static,
{
    let config = args.tunnel_config(cipher.block_size())?;

    let device = DeviceInterface::open(&args.device)
        .with_context(|| format!("cannot open device {}", args.device.display()))?;
    let transport = UdpTransport::connect(args.local, args.remote)
        .with_context(|| format!("cannot connect {} -> {}", args.local, args.remote))?;

    let egress = EgressLoop::new(
        &config,
        device.try_clone()?,
        transport.try_clone()?,
        cipher.clone(),
    )?;
    let ingress = IngressLoop::new(&config, device, transport, cipher)?;

    info!(
        iface = %config.interface_name,
        local = %args.local,
        remote = %args.remote,
        max_payload = config.max_payload,
        block_size = config.block_size,
        "tunnel started"
    );

    let egress = spawn_loop(Direction::Egress, move || {
        let mut egress = egress;
        egress.run()
    })?;
    let ingress = spawn_loop(Direction::Ingress, move || {
        let mut ingress = ingress;
        ingress.run()
    })?;

    for handle in [egress, ingress] {
        if handle.join().is_err() {
            anyhow::bail!("loop thread panicked");
        }
    }
    Ok(())
}

/// ループを名前付きスレッドで起動する
///
/// 致命的エラーはプロセスを終了させる。`OutputRejected` はそのスレッドだけを終える。
fn spawn_loop<F>(direction: Direction, body: F) -> anyhow::Result<thread::JoinHandle<()>>
where
    F: FnOnce() -> Result<LoopExit, FatalError> + Send + 'static,
{
    let handle = thread::Builder::new()
        .name(direction.as_str().to_string())
        .spawn(move || match body() {
            Ok(LoopExit::OutputRejected) => {
                warn!(%direction, "interface rejected a datagram, loop stopped");
            }
            Err(e) => terminate(direction, &e),
        })?;
    Ok(handle)
}
