//! The TCP listener that accepts controller clients.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use vgp_core::{MappingStore, TranslateOptions};

use super::stats::{ConnectionStats, ReportTimer};
use super::worker::InjectionWorker;
use super::NetworkError;
use crate::infrastructure::injection::BackendFactory;

/// How often blocked accepts and reads wake up to check the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Size of one socket read.  Several messages may arrive in one read.
const READ_BUFFER_SIZE: usize = 4096;

/// Per-connection settings.
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    pub translate: TranslateOptions,
    /// How often to log [`ConnectionStats`]; `None` disables it.
    pub stats_interval: Option<Duration>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            translate: TranslateOptions::default(),
            stats_interval: Some(Duration::from_secs(1)),
        }
    }
}

/// Accepts one controller client at a time and feeds its bytes to an
/// injection thread.
pub struct GamepadServer {
    listener: TcpListener,
    mappings: Arc<MappingStore>,
    factory: BackendFactory,
    options: ServerOptions,
}

impl GamepadServer {
    /// Binds the listener.  Port `0` asks the OS for an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if the address is invalid or in use.
    pub async fn bind(
        addr: &str,
        mappings: Arc<MappingStore>,
        factory: BackendFactory,
        options: ServerOptions,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetworkError::BindFailed {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            mappings,
            factory,
            options,
        })
    }

    /// The bound address, including the actual port when `0` was requested.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Io`] if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop until `running` is cleared.
    ///
    /// A connection is served to completion before the next one is accepted;
    /// clients that connect meanwhile wait in the listen backlog.
    ///
    /// # Errors
    ///
    /// Only fails if the listener itself becomes unusable; per-connection
    /// errors are logged.
    pub async fn run(self, running: Arc<AtomicBool>) -> Result<(), NetworkError> {
        info!("listening for controllers on {}", self.local_addr()?);

        while running.load(Ordering::Relaxed) {
            match timeout(POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    info!("controller connected from {peer}");
                    match self.serve(stream, peer, &running).await {
                        Ok(stats) => info!(
                            packets = stats.packets,
                            bytes = stats.bytes,
                            "controller {peer} disconnected"
                        ),
                        Err(e) => warn!("connection with {peer} ended with error: {e}"),
                    }
                }
                Ok(Err(e)) => error!("accept error: {e}"),
                Err(_) => {}
            }
        }

        info!("shutdown flag set; listener stopped");
        Ok(())
    }

    /// Serves one client until it disconnects or shutdown is requested.
    async fn serve(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
        running: &AtomicBool,
    ) -> Result<ConnectionStats, NetworkError> {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("could not set TCP_NODELAY for {peer}: {e}");
        }

        let worker = InjectionWorker::spawn(
            Arc::clone(&self.factory),
            self.mappings.current(),
            self.options.translate,
        )?;

        let mut stats = ConnectionStats::default();
        let mut timer = ReportTimer::new(self.options.stats_interval, Instant::now());
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        let result = loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown requested; closing connection with {peer}");
                break Ok(());
            }

            match timeout(POLL_INTERVAL, stream.read(&mut buf)).await {
                Ok(Ok(0)) => break Ok(()),
                Ok(Ok(n)) => {
                    stats.record(n, Instant::now());
                    if !worker.send(buf[..n].to_vec()).await {
                        break Err(NetworkError::WorkerGone);
                    }
                }
                Ok(Err(e)) if is_disconnect(&e) => {
                    debug!("connection with {peer} reset: {e}");
                    break Ok(());
                }
                Ok(Err(e)) => break Err(NetworkError::Io(e)),
                Err(_) => {}
            }

            if timer.due(Instant::now()) {
                info!(
                    packets = stats.packets,
                    bytes = stats.bytes,
                    last_interval_ms = stats.last_interval_ms() as u64,
                    "connection statistics"
                );
            }
        };

        match tokio::task::spawn_blocking(move || worker.finish()).await {
            Ok(Some(session)) => debug!(
                readings = session.readings,
                decode_errors = session.decode_errors,
                injection_errors = session.injection_errors,
                "injection thread finished"
            ),
            Ok(None) => error!("injection thread panicked"),
            Err(e) => error!("could not join injection thread: {e}"),
        }

        result.map(|()| stats)
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}
