//! Real-time host for one engine session
//!
//! The engine itself is synchronous. [`Host`] moves it onto a driver thread
//! that calls `tick()` every `tick_interval_ms` and applies queued
//! [`EngineCommand`]s between ticks, so no two calls ever overlap. Scheduled
//! events and state notifications come back on a single output channel.

use anyhow::{anyhow, Context, Result};
use backbeat_core::{
    Engine, EngineCommand, EngineConfig, EngineSnapshot, Event, EventSink, Library, StateEvent,
    StateObserver, SystemClock,
};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long `snapshot()` waits for the driver to answer
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything the driver thread reports back
#[derive(Debug, Clone)]
pub enum HostOutput {
    Event(Event),
    State(StateEvent),
    /// A command the engine rejected
    Rejected { command: EngineCommand, reason: String },
}

/// Messages that can be sent to the driver thread
#[derive(Debug)]
enum HostMessage {
    Command(EngineCommand),
    Snapshot(Sender<EngineSnapshot>),
    Shutdown,
}

/// Handle to a session running on its own thread
pub struct Host {
    command_tx: Sender<HostMessage>,
    output_rx: Receiver<HostOutput>,
    /// Mirrors `Engine::is_running` after every driver pass
    running: Arc<AtomicBool>,
    /// Current tempo stored as f64 bits
    bpm: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl Host {
    /// Build a session from the library defaults and start its driver thread
    pub fn spawn(library: Arc<Library>, config: EngineConfig) -> Result<Host> {
        let (command_tx, command_rx) = bounded(256);
        let (output_tx, output_rx) = unbounded();

        let event_tx = output_tx.clone();
        let sink = move |event: Event| {
            let _ = event_tx.send(HostOutput::Event(event));
        };
        let state_tx = output_tx.clone();
        let observer = move |event: StateEvent| {
            let _ = state_tx.send(HostOutput::State(event));
        };

        let engine = Engine::with_observer(library, config, SystemClock::new(), sink, observer)
            .context("Failed to create the engine session")?;

        let running = Arc::new(AtomicBool::new(false));
        let bpm = Arc::new(AtomicU64::new(
            engine.state().tempo.current.to_bits(),
        ));

        let mut driver = Driver {
            engine,
            command_rx,
            output_tx,
            running: running.clone(),
            bpm: bpm.clone(),
        };
        let thread = thread::Builder::new()
            .name("backbeat-driver".to_string())
            .spawn(move || driver.run())
            .context("Failed to start the driver thread")?;

        Ok(Host {
            command_tx,
            output_rx,
            running,
            bpm,
            thread: Some(thread),
        })
    }

    /// Queue a command for the next driver pass
    pub fn send(&self, command: EngineCommand) -> Result<()> {
        self.command_tx
            .send(HostMessage::Command(command))
            .map_err(|_| anyhow!("The driver thread has stopped"))
    }

    /// Ask the driver for a consistent view of the session
    pub fn snapshot(&self) -> Result<EngineSnapshot> {
        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(HostMessage::Snapshot(reply_tx))
            .map_err(|_| anyhow!("The driver thread has stopped"))?;
        reply_rx
            .recv_timeout(SNAPSHOT_TIMEOUT)
            .context("The driver did not answer the snapshot request")
    }

    /// Events, state notifications and rejections, in the order they happened
    pub fn outputs(&self) -> &Receiver<HostOutput> {
        &self.output_rx
    }

    /// Everything waiting on the output channel right now
    pub fn drain(&self) -> Vec<HostOutput> {
        self.output_rx.try_iter().collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Current (eased) tempo as of the last driver pass
    pub fn bpm(&self) -> f64 {
        f64::from_bits(self.bpm.load(Ordering::Relaxed))
    }

    /// Stop the driver thread and wait for it
    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(HostMessage::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("The driver thread panicked");
            }
        }
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The driver thread's side: owns the engine outright
struct Driver<S: EventSink, O: StateObserver> {
    engine: Engine<SystemClock, S, O>,
    command_rx: Receiver<HostMessage>,
    output_tx: Sender<HostOutput>,
    running: Arc<AtomicBool>,
    bpm: Arc<AtomicU64>,
}

impl<S: EventSink, O: StateObserver> Driver<S, O> {
    fn run(&mut self) {
        let interval = Duration::from_millis(self.engine.config().tick_interval_ms.max(1));
        debug!("Driver running, tick every {:?}", interval);

        loop {
            // Block until the next tick is due or a message arrives
            match self.command_rx.recv_timeout(interval) {
                Ok(message) => {
                    if self.handle(message) {
                        break;
                    }
                    // Apply everything else that is already queued
                    let mut shutdown = false;
                    while let Ok(message) = self.command_rx.try_recv() {
                        if self.handle(message) {
                            shutdown = true;
                            break;
                        }
                    }
                    if shutdown {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.engine.tick();
            self.publish();
        }

        self.engine.stop();
        self.publish();
        debug!("Driver stopped");
    }

    /// Returns true when the driver should exit
    fn handle(&mut self, message: HostMessage) -> bool {
        match message {
            HostMessage::Command(command) => {
                debug!("Command: {}", command);
                if let Err(e) = self.engine.execute(command.clone()) {
                    warn!("Command '{}' rejected: {}", command, e);
                    let _ = self.output_tx.send(HostOutput::Rejected {
                        command,
                        reason: e.to_string(),
                    });
                }
                self.publish();
                false
            }
            HostMessage::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot());
                false
            }
            HostMessage::Shutdown => true,
        }
    }

    fn publish(&self) {
        self.running
            .store(self.engine.is_running(), Ordering::Relaxed);
        self.bpm
            .store(self.engine.state().tempo.current.to_bits(), Ordering::Relaxed);
    }
}
