//! The injection thread that owns one connection's [`Session`].
//!
//! # Why a plain thread? (for beginners)
//!
//! Injection calls block (uinput writes, `SendInput`, the 10 ms click hold),
//! and some backends are tied to the thread that created them.  Running them
//! on the async runtime would stall every other task, so each connection gets
//! one dedicated OS thread:
//!
//! ```text
//!   socket reader (async) ──Vec<u8>──▶ tokio mpsc channel ──▶ injection thread
//!                                       (FIFO, bounded)         Session + backend
//! ```
//!
//! The channel preserves arrival order, so readings are injected exactly in
//! the order they came off the socket.  Dropping the sender is the shutdown
//! signal: the thread drains what is left, releases held input, and drops the
//! backend.
//!
//! # Backpressure
//!
//! The queue holds at most [`QUEUE_CAPACITY`] socket reads.  When injection
//! falls behind, [`InjectionWorker::send`] waits for a free slot, the reader
//! stops reading, and TCP flow control slows the client down.  Nothing is
//! dropped or reordered, and queued latency stays bounded.

use std::io;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, error};
use vgp_core::{MappingView, TranslateOptions};

use crate::application::session::{Session, SessionStats};
use crate::infrastructure::injection::BackendFactory;

/// Socket reads that may wait for the injection thread.
pub const QUEUE_CAPACITY: usize = 64;

/// Handle to a running injection thread.
pub struct InjectionWorker {
    tx: mpsc::Sender<Vec<u8>>,
    handle: JoinHandle<SessionStats>,
}

impl InjectionWorker {
    /// Starts the thread.  The backend is created on the new thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(
        factory: BackendFactory,
        mapping: MappingView,
        options: TranslateOptions,
    ) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(QUEUE_CAPACITY);
        let handle = thread::Builder::new()
            .name("vgp-injection".to_string())
            .spawn(move || run(rx, factory, mapping, options))?;
        Ok(Self { tx, handle })
    }

    /// Queues socket bytes for injection, waiting while the queue is full.
    ///
    /// Returns `false` if the thread has already exited.
    pub async fn send(&self, bytes: Vec<u8>) -> bool {
        self.tx.send(bytes).await.is_ok()
    }

    /// Closes the channel and waits for the thread to tear the session down.
    ///
    /// Blocks; async callers should run it with `spawn_blocking`.  Returns
    /// `None` if the thread panicked.
    pub fn finish(self) -> Option<SessionStats> {
        drop(self.tx);
        self.handle.join().ok()
    }
}

fn run(
    mut rx: mpsc::Receiver<Vec<u8>>,
    factory: BackendFactory,
    mapping: MappingView,
    options: TranslateOptions,
) -> SessionStats {
    let backend = match factory(options.mode) {
        Ok(backend) => backend,
        Err(e) => {
            error!("could not create injection backend, input from this client is ignored: {e}");
            let mut discarded = 0usize;
            while let Some(bytes) = rx.blocking_recv() {
                discarded += bytes.len();
            }
            debug!(discarded, "injection thread exiting without a backend");
            return SessionStats::default();
        }
    };

    let mut session = Session::new(backend, mapping, options);
    while let Some(bytes) = rx.blocking_recv() {
        session.handle_bytes(&bytes);
    }
    session.shutdown();
    debug!("injection thread exiting");
    session.stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc as std_mpsc, Arc, Mutex};
    use std::time::Duration;

    use tokio::sync::mpsc::error::TrySendError;

    use vgp_core::{
        encode, GamepadButton, GamepadReading, HidKeyCode, MappingTable, OutputMode,
    };

    use crate::application::inject::{InjectionBackend, InjectionError};
    use crate::infrastructure::injection::mock::{InjectedEvent, MockInjectionBackend};

    fn mock_factory(mock: &MockInjectionBackend) -> BackendFactory {
        let shared = mock.clone();
        Arc::new(move |_mode| Ok(Box::new(shared.clone()) as Box<dyn InjectionBackend>))
    }

    fn keyboard_options() -> TranslateOptions {
        TranslateOptions {
            mode: OutputMode::KeyboardMouse,
            ..TranslateOptions::default()
        }
    }

    #[tokio::test]
    async fn test_worker_injects_in_arrival_order_and_drops_backend_on_finish() {
        // Arrange
        let mock = MockInjectionBackend::for_mode(OutputMode::KeyboardMouse);
        let worker = InjectionWorker::spawn(
            mock_factory(&mock),
            MappingTable::default().into_view(1),
            keyboard_options(),
        )
        .unwrap();
        let press = encode(&GamepadReading::pressing(GamepadButton::A)).unwrap();
        let release = encode(&GamepadReading::releasing(GamepadButton::A)).unwrap();

        // Act – split the first message across two sends
        assert!(worker.send(press[..10].to_vec()).await);
        assert!(worker.send(press[10..].to_vec()).await);
        assert!(worker.send(release).await);
        let stats = worker.finish().unwrap();

        // Assert
        assert_eq!(
            mock.recorded(),
            vec![
                InjectedEvent::KeyDown(HidKeyCode::Enter),
                InjectedEvent::KeyUp(HidKeyCode::Enter),
            ]
        );
        assert_eq!(stats.readings, 2);
        assert!(mock.was_dropped());
    }

    #[tokio::test]
    async fn test_finish_releases_keys_still_held() {
        let mock = MockInjectionBackend::for_mode(OutputMode::KeyboardMouse);
        let worker = InjectionWorker::spawn(
            mock_factory(&mock),
            MappingTable::default().into_view(1),
            keyboard_options(),
        )
        .unwrap();

        worker
            .send(encode(&GamepadReading::pressing(GamepadButton::B)).unwrap())
            .await;
        worker.finish().unwrap();

        assert_eq!(
            mock.recorded(),
            vec![
                InjectedEvent::KeyDown(HidKeyCode::Escape),
                InjectedEvent::KeyUp(HidKeyCode::Escape),
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_creation_failure_discards_input() {
        // Arrange
        let factory: BackendFactory =
            Arc::new(|_mode| Err(InjectionError::Device("no /dev/uinput".into())));
        let worker = InjectionWorker::spawn(
            factory,
            MappingTable::default().into_view(1),
            keyboard_options(),
        )
        .unwrap();

        // Act
        let accepted = worker
            .send(encode(&GamepadReading::pressing(GamepadButton::A)).unwrap())
            .await;
        let stats = worker.finish().unwrap();

        // Assert – the channel stayed open, nothing was processed
        assert!(accepted);
        assert_eq!(stats, SessionStats::default());
    }

    /// A factory that does not return until `gate` is released, so nothing
    /// leaves the queue in the meantime.
    fn gated_factory(mock: &MockInjectionBackend) -> (BackendFactory, std_mpsc::Sender<()>) {
        let (gate_tx, gate_rx) = std_mpsc::channel::<()>();
        let gate_rx = Mutex::new(gate_rx);
        let shared = mock.clone();
        let factory: BackendFactory = Arc::new(move |_mode| {
            if let Ok(rx) = gate_rx.lock() {
                let _ = rx.recv();
            }
            Ok(Box::new(shared.clone()) as Box<dyn InjectionBackend>)
        });
        (factory, gate_tx)
    }

    #[tokio::test]
    async fn test_full_queue_makes_sender_wait_then_drains_in_order() {
        // Arrange
        let mock = MockInjectionBackend::for_mode(OutputMode::KeyboardMouse);
        let (factory, gate) = gated_factory(&mock);
        let worker =
            InjectionWorker::spawn(factory, MappingTable::default().into_view(1), keyboard_options())
                .unwrap();
        let press = encode(&GamepadReading::pressing(GamepadButton::A)).unwrap();
        let release = encode(&GamepadReading::releasing(GamepadButton::A)).unwrap();

        // Act – fill every slot while the thread is still creating its backend
        for i in 0..QUEUE_CAPACITY {
            let bytes = if i % 2 == 0 { press.clone() } else { release.clone() };
            worker.tx.try_send(bytes).unwrap();
        }
        let overflow = worker.tx.try_send(press.clone());
        let waited = tokio::time::timeout(Duration::from_millis(50), worker.send(press.clone())).await;
        gate.send(()).unwrap();
        let stats = worker.finish().unwrap();

        // Assert – the extra reading was refused, never dropped silently
        assert!(matches!(overflow, Err(TrySendError::Full(_))));
        assert!(waited.is_err(), "send must wait while the queue is full");
        assert_eq!(stats.readings, QUEUE_CAPACITY as u64);
        let recorded = mock.recorded();
        assert_eq!(recorded.len(), QUEUE_CAPACITY);
        assert_eq!(recorded[0], InjectedEvent::KeyDown(HidKeyCode::Enter));
        assert_eq!(recorded[1], InjectedEvent::KeyUp(HidKeyCode::Enter));
    }

    #[tokio::test]
    async fn test_send_resumes_once_the_thread_catches_up() {
        let mock = MockInjectionBackend::for_mode(OutputMode::KeyboardMouse);
        let (factory, gate) = gated_factory(&mock);
        let worker =
            InjectionWorker::spawn(factory, MappingTable::default().into_view(1), keyboard_options())
                .unwrap();
        for _ in 0..QUEUE_CAPACITY {
            worker.tx.try_send(Vec::new()).unwrap();
        }

        gate.send(()).unwrap();
        let press = encode(&GamepadReading::pressing(GamepadButton::B)).unwrap();
        let sent = tokio::time::timeout(Duration::from_secs(5), worker.send(press)).await;
        worker.finish().unwrap();

        assert_eq!(sent, Ok(true));
        assert_eq!(
            mock.recorded(),
            vec![
                InjectedEvent::KeyDown(HidKeyCode::Escape),
                InjectedEvent::KeyUp(HidKeyCode::Escape),
            ]
        );
    }
}
