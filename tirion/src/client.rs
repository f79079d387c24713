use mmapbuf::MetricsBuffer;
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::framing::{write_record, FramedReceiver};
use crate::handshake::negotiate;
use crate::listener::{command_listener_thread, CommandHandler, UnknownCommands};
use crate::{ClientConfig, ClientError, Result};

/// Connection to a tirion agent.
///
/// Metric updates go straight to the shared buffer and never touch the
/// socket. A background thread drains agent commands until the socket is
/// closed by either side; [`Client::running`] reports whether that thread
/// is still alive.
///
/// The client is `Sync`: share it behind an `Arc` to update metrics from
/// several threads and close it from any of them.
pub struct Client {
    config: ClientConfig,
    metrics: MetricsBuffer,
    running: Arc<AtomicBool>,
    stream: Mutex<Option<UnixStream>>,
    /// Handle on the same socket used only to shut it down; never locked,
    /// so close can interrupt a tag write blocked on a full socket.
    control: UnixStream,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    pub fn connect(config: ClientConfig) -> Result<Self> {
        Self::connect_with_handler(config, UnknownCommands)
    }

    /// Connect, negotiate, map the metrics buffer and start listening for
    /// agent commands. Nothing is left running if any step fails.
    pub fn connect_with_handler(
        config: ClientConfig,
        handler: impl CommandHandler,
    ) -> Result<Self> {
        debug!(socket = %config.socket.display(), "open unix socket");
        let mut stream =
            UnixStream::connect(&config.socket).map_err(|source| ClientError::Connect {
                path: config.socket.clone(),
                source,
            })?;

        let control = stream.try_clone()?;
        let mut receiver = FramedReceiver::new(stream.try_clone()?, config.read_chunk_size);
        let reply = negotiate(&mut stream, &mut receiver, &config)?;

        let metrics = MetricsBuffer::open(&reply.location, reply.slot_count)?;
        debug!(
            slot_count = metrics.len(),
            location = %reply.location.display(),
            "initialized metrics buffer"
        );

        let running = Arc::new(AtomicBool::new(true));
        let listener = {
            let running = running.clone();
            let handler: Box<dyn CommandHandler> = Box::new(handler);
            thread::Builder::new()
                .name("tirion-commands".to_string())
                .spawn(move || command_listener_thread(receiver, running, handler))?
        };

        Ok(Client {
            config,
            metrics,
            running,
            stream: Mutex::new(Some(stream)),
            control,
            listener: Mutex::new(Some(listener)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// False once the client was closed or the agent connection failed.
    pub fn running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn slot_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn get(&self, index: usize) -> f32 {
        self.metrics.get(index)
    }

    pub fn set(&self, index: usize, value: f32) -> f32 {
        self.metrics.set(index, value)
    }

    pub fn add(&self, index: usize, value: f32) -> f32 {
        self.metrics.add(index, value)
    }

    pub fn sub(&self, index: usize, value: f32) -> f32 {
        self.metrics.sub(index, value)
    }

    pub fn inc(&self, index: usize) -> f32 {
        self.metrics.inc(index)
    }

    pub fn dec(&self, index: usize) -> f32 {
        self.metrics.dec(index)
    }

    pub fn flush(&self) -> Result<()> {
        Ok(self.metrics.flush()?)
    }

    /// Send a tag to the agent. A failed write ends the session.
    pub fn tag(&self, text: &str) -> Result<()> {
        let record = protocol::prepare_tag(text, self.config.tag_size);

        let mut stream = self.stream.lock();
        let stream = stream.as_mut().ok_or(ClientError::Closed)?;

        write_record(stream, &record).map_err(|e| {
            warn!(error = %e, "failed to send tag");
            self.running.store(false, Ordering::Release);
            ClientError::from(e)
        })
    }

    /// Stop the client: unmap the metrics buffer, shut the socket down and
    /// wait for the command listener to exit. Calling it again is a no-op.
    ///
    /// There is no timeout on the wait; shutting the socket down in both
    /// directions makes the listener's blocked read and any blocked tag
    /// write return.
    pub fn close(&self) {
        self.running.store(false, Ordering::Release);

        self.metrics.close();

        match self.control.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotConnected => {}
            Err(e) => warn!(error = %e, "failed to shut down unix socket"),
        }

        // The shutdown above released a writer holding this lock.
        drop(self.stream.lock().take());

        if let Some(listener) = self.listener.lock().take() {
            if listener.join().is_err() {
                warn!("command listener panicked");
            }
            debug!("client closed");
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}
