//! The running timer.
//!
//! One tokio task owns the [`TimerController`] and is the only writer. It
//! ticks once per second while running, applies commands sent through a
//! [`TimerHandle`], follows settings changes and publishes a fresh
//! [`TimerSnapshot`] after each of them. Session records leave through a
//! [`SessionSink`]; with [`spawn_session_writer`] the actual insert happens
//! on a separate task so the tick never waits for SQLite.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::notify::{Alert, NotificationView, Notifier};
use crate::storage::{NewSession, SessionStore, Settings};
use crate::timer::{SessionSink, TimerController, TimerSnapshot, TimerState};

const TICK: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    Skip,
    /// A failure that happened outside the runtime task, e.g. a session insert.
    ReportError(String),
    Shutdown,
}

/// Cheap, cloneable access to a running timer.
#[derive(Clone)]
pub struct TimerHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<TimerSnapshot>,
    events: broadcast::Sender<Event>,
}

impl TimerHandle {
    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    pub fn skip(&self) -> Result<()> {
        self.send(Command::Skip)
    }

    /// Stop the runtime. Its join handle yields the final controller.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.state.clone()
    }

    /// Events emitted from now on. Slow receivers may lag and miss some.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.state.borrow().clone()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CoreError::Custom("timer runtime has stopped".to_string()))
    }
}

/// Builder for the runtime task.
///
/// A weak command sender is available before spawning so a session writer
/// can report failures back to the timer it serves. The runtime ends once
/// every [`TimerHandle`] is dropped, whatever weak senders remain.
pub struct TimerRuntime {
    tx: mpsc::UnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl Default for TimerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerRuntime {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn commands(&self) -> mpsc::WeakUnboundedSender<Command> {
        self.tx.downgrade()
    }

    /// Spawn the runtime task. Must be called inside a tokio runtime.
    pub fn spawn<S, N>(
        self,
        controller: TimerController,
        settings: watch::Receiver<Settings>,
        sink: S,
        notifier: N,
    ) -> (TimerHandle, JoinHandle<TimerController>)
    where
        S: SessionSink + Send + 'static,
        N: Notifier,
    {
        let (state_tx, state_rx) = watch::channel(controller.snapshot());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let handle = TimerHandle {
            commands: self.tx,
            state: state_rx,
            events: events_tx.clone(),
        };

        let current = settings.borrow().clone();
        let task = RuntimeTask {
            controller,
            current,
            settings,
            commands: self.rx,
            sink,
            notifier,
            state: state_tx,
            events: events_tx,
        };
        (handle, tokio::spawn(task.run()))
    }
}

struct RuntimeTask<S, N> {
    controller: TimerController,
    settings: watch::Receiver<Settings>,
    current: Settings,
    commands: mpsc::UnboundedReceiver<Command>,
    sink: S,
    notifier: N,
    state: watch::Sender<TimerSnapshot>,
    events: broadcast::Sender<Event>,
}

impl<S, N> RuntimeTask<S, N>
where
    S: SessionSink + Send + 'static,
    N: Notifier,
{
    async fn run(mut self) -> TimerController {
        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.reset();

        let mut settings_open = true;
        self.publish();
        tracing::debug!(state = ?self.controller.state(), "timer runtime started");

        loop {
            let running = self.controller.state() == TimerState::Running;
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle(command, &mut interval),
                },
                _ = interval.tick(), if running => {
                    let events = self.controller.tick(1, &self.current, &mut self.sink, Utc::now());
                    self.dispatch(events, &mut interval);
                }
                changed = self.settings.changed(), if settings_open => {
                    if changed.is_err() {
                        settings_open = false;
                        continue;
                    }
                    self.current = self.settings.borrow_and_update().clone();
                    self.controller.apply_settings(&self.current);
                    tracing::debug!("timer picked up new settings");
                    self.publish();
                }
            }
        }

        tracing::debug!("timer runtime stopped");
        self.controller
    }

    fn handle(&mut self, command: Command, interval: &mut Interval) {
        let now = Utc::now();
        let events = match command {
            Command::Start => self.controller.start(now),
            Command::Pause => self.controller.pause(now),
            Command::Reset => self.controller.reset(now),
            Command::Skip => self.controller.skip(&self.current, &mut self.sink, now),
            Command::ReportError(message) => {
                self.controller.report_error(message);
                self.publish();
                return;
            }
            Command::Shutdown => return,
        };
        self.dispatch(events, interval);
    }

    fn dispatch(&mut self, events: Vec<Event>, interval: &mut Interval) {
        for event in events {
            match &event {
                Event::TimerStarted { .. } => interval.reset(),
                Event::TimerCompleted { period, .. } => {
                    let alert = Alert::from_settings(&self.current.notifications);
                    self.notifier.on_period_finished(*period, alert);
                }
                _ => {}
            }
            tracing::debug!(?event, "timer event");
            // No receivers is fine.
            let _ = self.events.send(event);
        }
        self.publish();
    }

    fn publish(&mut self) {
        let snapshot = self.controller.snapshot();
        self.notifier
            .on_state(&NotificationView::from_snapshot(&snapshot));
        self.state.send_replace(snapshot);
    }
}

/// [`SessionSink`] that queues records for the writer task.
///
/// `record` returns `0`: the row id is only known once the writer has run.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<NewSession>,
}

impl SessionSink for ChannelSink {
    fn record(&mut self, session: &NewSession) -> Result<i64> {
        self.tx
            .send(session.clone())
            .map_err(|_| CoreError::SinkClosed)?;
        Ok(0)
    }
}

/// Spawn a task that writes queued sessions in order.
///
/// Each insert runs on the blocking pool. Failures are logged and reported to
/// the timer as [`Command::ReportError`] while it is still running. The task
/// ends once every [`ChannelSink`] is dropped and the queue is drained.
pub fn spawn_session_writer(
    store: SessionStore,
    commands: mpsc::WeakUnboundedSender<Command>,
) -> (ChannelSink, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<NewSession>();

    let task = tokio::spawn(async move {
        while let Some(session) = rx.recv().await {
            let store = store.clone();
            let result = tokio::task::spawn_blocking(move || store.insert(&session))
                .await
                .map_err(|e| CoreError::Custom(format!("session writer panicked: {e}")))
                .and_then(|inserted| inserted);

            match result {
                Ok(id) => tracing::debug!(id, "session saved"),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to save session");
                    if let Some(commands) = commands.upgrade() {
                        let _ = commands.send(Command::ReportError(e.to_string()));
                    }
                }
            }
        }
    });

    (ChannelSink { tx }, task)
}
