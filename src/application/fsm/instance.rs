//! # FSM Instances
//!
//! Runtime of one persistent FSM instance.
//!
//! Each instance is a tokio task owning a [`PersistentFsm`] and a
//! [`StateTimer`]. Callers talk to it through an [`FsmHandle`]: commands go
//! over a bounded queue and answers come back on one-shot channels, so all
//! events for one instance are processed one at a time in arrival order.
//! Different instances run concurrently.
//!
//! # Event Processing
//!
//! For a delivered event:
//!
//! 1. Look up the rule for (state, event); none means
//!    [`EngineError::UnhandledEvent`] and nothing changes
//! 2. Run the handler; a fault tears the instance down
//! 3. On a transition: optional snapshot, then append the journal entry with
//!    bounded retries, then update state, data and timer
//!
//! A state timeout is delivered the same way, through the queue, tagged with
//! the state and timer generation it was armed for. Firings for a state the
//! instance has already left are dropped.
//!
//! # Teardown
//!
//! After a fatal error or [`FsmHandle::stop`] the task cancels its timer,
//! closes its queue and answers anything still queued with
//! [`EngineError::InstanceUnavailable`].

use super::context::EngineContext;
use super::machine::PersistentFsm;
use super::model::{FsmEvent, FsmModel};
use super::outcome::{Outcome, Transition};
use super::timer::StateTimer;
use crate::application::error::{EngineError, EngineResult};
use crate::domain::value_objects::PersistenceId;
use crate::infrastructure::persistence::{
    EventLog, EventLogError, EventLogResult, JournalEntry, SnapshotRecord,
};
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// The result of delivering one event.
pub struct Reaction<M: FsmModel> {
    from: M::State,
    to: M::State,
    data: M::Data,
    sequence_nr: u64,
    stayed: bool,
}

impl<M: FsmModel> Reaction<M> {
    /// Returns the state before the event.
    #[must_use]
    pub fn from(&self) -> M::State {
        self.from
    }

    /// Returns the state after the event.
    #[must_use]
    pub fn to(&self) -> M::State {
        self.to
    }

    /// Returns the data after the event.
    #[must_use]
    pub fn data(&self) -> &M::Data {
        &self.data
    }

    /// Returns the sequence number of the last journaled entry.
    #[must_use]
    pub fn sequence_nr(&self) -> u64 {
        self.sequence_nr
    }

    /// Returns true if the handler decided to stay.
    #[must_use]
    pub fn stayed(&self) -> bool {
        self.stayed
    }
}

impl<M: FsmModel> Clone for Reaction<M> {
    fn clone(&self) -> Self {
        Self {
            from: self.from,
            to: self.to,
            data: self.data.clone(),
            sequence_nr: self.sequence_nr,
            stayed: self.stayed,
        }
    }
}

impl<M: FsmModel> fmt::Debug for Reaction<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("data", &self.data)
            .field("sequence_nr", &self.sequence_nr)
            .field("stayed", &self.stayed)
            .finish()
    }
}

/// Point-in-time view of an instance.
pub struct InstanceStatus<M: FsmModel> {
    /// Current state.
    pub state: M::State,
    /// Current data.
    pub data: M::Data,
    /// Sequence number of the last journaled entry.
    pub sequence_nr: u64,
    /// Timeout armed on entry to the current state.
    pub state_timeout: Option<Duration>,
    /// Whether that timeout is still pending.
    pub timer_armed: bool,
}

impl<M: FsmModel> Clone for InstanceStatus<M> {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            data: self.data.clone(),
            sequence_nr: self.sequence_nr,
            state_timeout: self.state_timeout,
            timer_armed: self.timer_armed,
        }
    }
}

impl<M: FsmModel> fmt::Debug for InstanceStatus<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceStatus")
            .field("state", &self.state)
            .field("data", &self.data)
            .field("sequence_nr", &self.sequence_nr)
            .field("state_timeout", &self.state_timeout)
            .field("timer_armed", &self.timer_armed)
            .finish()
    }
}

enum Command<M: FsmModel> {
    Handle {
        event: M::Event,
        reply: oneshot::Sender<EngineResult<Reaction<M>>>,
    },
    StateTimeout {
        state: M::State,
        generation: u64,
    },
    Snapshot {
        reply: oneshot::Sender<EngineResult<u64>>,
    },
    Status {
        reply: oneshot::Sender<InstanceStatus<M>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// A journal write, retried as a unit.
enum Write<'a> {
    Append(&'a JournalEntry),
    Snapshot(&'a SnapshotRecord),
}

impl Write<'_> {
    fn label(&self) -> &'static str {
        match self {
            Self::Append(_) => "journal append",
            Self::Snapshot(_) => "snapshot write",
        }
    }

    async fn run(&self, log: &dyn EventLog) -> EventLogResult<()> {
        match self {
            Self::Append(entry) => log.append((*entry).clone()).await,
            Self::Snapshot(snapshot) => log.write_snapshot((*snapshot).clone()).await,
        }
    }
}

/// Awaits a journal call, failing with a timeout error after `limit`.
async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = EventLogResult<T>>,
) -> EventLogResult<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| EventLogError::timeout(format!("no reply within {}ms", limit.as_millis())))?
}

/// Starts instances.
#[derive(Debug)]
pub struct FsmInstance;

impl FsmInstance {
    /// Recovers `persistence_id` from the event log and starts its task.
    ///
    /// Observers see a single `on_recovered` call once replay completes. A
    /// timeout recorded by the last journaled transition is re-armed for its
    /// full duration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PersistenceFailure`] if the journal cannot be
    /// read, and [`EngineError::Serialization`] or [`EngineError::Domain`]
    /// if it cannot be replayed.
    pub async fn spawn<M: FsmModel>(
        persistence_id: PersistenceId,
        context: EngineContext<M>,
    ) -> EngineResult<FsmHandle<M>> {
        let fsm = Self::recover(&persistence_id, &context).await?;
        let (sender, inbox) = mpsc::channel(context.config().mailbox_capacity());

        let mut runner = Runner {
            fsm,
            context,
            timer: StateTimer::new(),
            mailbox: sender.downgrade(),
        };

        for observer in runner.context.observers() {
            observer.on_recovered(
                &persistence_id,
                runner.fsm.state(),
                runner.fsm.data(),
                runner.fsm.sequence_nr(),
            );
        }
        if let Some(timeout) = runner.fsm.state_timeout() {
            runner.arm_timer(timeout);
        }

        tokio::spawn(runner.run(inbox));

        Ok(FsmHandle {
            persistence_id,
            sender,
        })
    }

    async fn recover<M: FsmModel>(
        persistence_id: &PersistenceId,
        context: &EngineContext<M>,
    ) -> EngineResult<PersistentFsm<M>> {
        let limit = context.config().append_timeout();
        let log = context.log();

        let snapshot = bounded(limit, log.read_latest_snapshot(persistence_id)).await?;
        let after = snapshot.as_ref().map_or(0, |s| s.sequence_nr);
        let entries = bounded(limit, log.read_from(persistence_id, after)).await?;

        debug!(
            persistence_id = %persistence_id,
            snapshot_sequence_nr = after,
            entries = entries.len(),
            last_write_age_ms = entries
                .last()
                .map(|entry| u64::try_from(entry.recorded_at.age().as_millis()).unwrap_or(u64::MAX)),
            "recovering instance"
        );

        PersistentFsm::recover(
            persistence_id.clone(),
            context.table().clone(),
            snapshot.as_ref(),
            &entries,
        )
    }
}

/// The task side of an instance.
struct Runner<M: FsmModel> {
    fsm: PersistentFsm<M>,
    context: EngineContext<M>,
    timer: StateTimer,
    mailbox: mpsc::WeakSender<Command<M>>,
}

impl<M: FsmModel> Runner<M> {
    async fn run(mut self, mut inbox: mpsc::Receiver<Command<M>>) {
        while let Some(command) = inbox.recv().await {
            let keep_running = match command {
                Command::Handle { event, reply } => {
                    let result = self.process(FsmEvent::Event(event)).await;
                    if matches!(&result, Err(err) if err.is_fatal()) {
                        // Close the queue first so the caller never sees a live handle.
                        self.shutdown(&mut inbox);
                        let _ = reply.send(result);
                        return;
                    }
                    // The caller may have given up waiting.
                    let _ = reply.send(result);
                    true
                }
                Command::StateTimeout { state, generation } => {
                    self.on_state_timeout(state, generation).await
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot_now().await);
                    true
                }
                Command::Status { reply } => {
                    let _ = reply.send(self.status());
                    true
                }
                Command::Stop { reply } => {
                    self.shutdown(&mut inbox);
                    let _ = reply.send(());
                    return;
                }
            };
            if !keep_running {
                break;
            }
        }
        self.shutdown(&mut inbox);
    }

    async fn process(&mut self, trigger: FsmEvent<M::Event>) -> EngineResult<Reaction<M>> {
        let from = self.fsm.state();
        let result = match self.fsm.decide(&trigger) {
            Ok(Outcome::Stay) => {
                for observer in self.context.observers() {
                    observer.on_stay(self.fsm.persistence_id(), from, &trigger);
                }
                Ok(true)
            }
            Ok(Outcome::GoTo(transition)) => self.apply(&transition).await.map(|()| false),
            Err(err) => Err(err),
        };

        match result {
            Ok(stayed) => {
                if !stayed {
                    for observer in self.context.observers() {
                        observer.on_transition(
                            self.fsm.persistence_id(),
                            from,
                            self.fsm.state(),
                            self.fsm.data(),
                            &trigger,
                        );
                    }
                }
                Ok(Reaction {
                    from,
                    to: self.fsm.state(),
                    data: self.fsm.data().clone(),
                    sequence_nr: self.fsm.sequence_nr(),
                    stayed,
                })
            }
            Err(err) => {
                self.report(&trigger, &err);
                Err(err)
            }
        }
    }

    async fn apply(&mut self, transition: &Transition<M>) -> EngineResult<()> {
        if transition.snapshot_before() {
            let snapshot = self.fsm.snapshot()?;
            self.write(Write::Snapshot(&snapshot)).await?;
        }

        let step = self.fsm.plan(transition)?;
        self.write(Write::Append(step.entry())).await?;

        let timeout = step.timeout();
        self.fsm.commit(step);
        match timeout {
            Some(timeout) => self.arm_timer(timeout),
            None => self.timer.cancel(),
        }
        Ok(())
    }

    /// Runs a journal write with the configured timeout and retry budget.
    async fn write(&self, write: Write<'_>) -> EngineResult<()> {
        let config = self.context.config();
        let attempts = config.max_append_attempts();
        let mut attempt = 1;

        loop {
            match bounded(config.append_timeout(), write.run(self.context.log())).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(
                        persistence_id = %self.fsm.persistence_id(),
                        operation = write.label(),
                        attempt,
                        error = %err,
                        "journal write failed, retrying"
                    );
                    tokio::time::sleep(config.append_retry_backoff()).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn on_state_timeout(&mut self, state: M::State, generation: u64) -> bool {
        if !self.timer.accepts(generation) || state != self.fsm.state() {
            debug!(
                persistence_id = %self.fsm.persistence_id(),
                armed_for = %state,
                current = %self.fsm.state(),
                "discarding stale state timeout"
            );
            return true;
        }

        self.timer.fired();
        match self.process(FsmEvent::StateTimeout).await {
            Ok(_) => true,
            Err(err) if err.is_fatal() => false,
            Err(err) if err.is_retryable() => {
                // Try the timeout again once the journal recovers.
                self.arm_timer(self.context.config().append_retry_backoff());
                true
            }
            Err(_) => true,
        }
    }

    async fn snapshot_now(&self) -> EngineResult<u64> {
        let snapshot = self.fsm.snapshot()?;
        self.write(Write::Snapshot(&snapshot)).await?;
        Ok(snapshot.sequence_nr)
    }

    fn status(&self) -> InstanceStatus<M> {
        InstanceStatus {
            state: self.fsm.state(),
            data: self.fsm.data().clone(),
            sequence_nr: self.fsm.sequence_nr(),
            state_timeout: self.fsm.state_timeout(),
            timer_armed: self.timer.is_armed(),
        }
    }

    fn arm_timer(&mut self, after: Duration) {
        let mailbox = self.mailbox.clone();
        let state = self.fsm.state();
        self.timer.arm(after, move |generation| async move {
            if let Some(sender) = mailbox.upgrade() {
                let _ = sender
                    .send(Command::StateTimeout { state, generation })
                    .await;
            }
        });
    }

    fn report(&self, trigger: &FsmEvent<M::Event>, err: &EngineError) {
        let id = self.fsm.persistence_id();
        let state = self.fsm.state();
        if err.is_unhandled() {
            for observer in self.context.observers() {
                observer.on_unhandled(id, state, trigger);
            }
        } else if err.is_fatal() {
            let reason = err.to_string();
            for observer in self.context.observers() {
                observer.on_fault(id, state, &reason);
            }
        } else {
            warn!(
                persistence_id = %id,
                state = %state,
                trigger = %trigger,
                error = %err,
                "event not applied"
            );
        }
    }

    fn shutdown(&mut self, inbox: &mut mpsc::Receiver<Command<M>>) {
        self.timer.cancel();
        inbox.close();

        let id = self.fsm.persistence_id();
        while let Ok(command) = inbox.try_recv() {
            match command {
                Command::Handle { reply, .. } => {
                    let _ = reply.send(Err(EngineError::instance_unavailable(id)));
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(Err(EngineError::instance_unavailable(id)));
                }
                Command::Stop { reply } => {
                    let _ = reply.send(());
                }
                Command::StateTimeout { .. } | Command::Status { .. } => {}
            }
        }

        debug!(persistence_id = %id, state = %self.fsm.state(), "instance stopped");
    }
}

/// Cloneable handle to a running instance.
pub struct FsmHandle<M: FsmModel> {
    persistence_id: PersistenceId,
    sender: mpsc::Sender<Command<M>>,
}

impl<M: FsmModel> FsmHandle<M> {
    /// Returns the persistence id.
    #[must_use]
    pub fn persistence_id(&self) -> &PersistenceId {
        &self.persistence_id
    }

    /// Returns true while the instance task accepts commands.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Delivers `event` and waits for it to be processed.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnhandledEvent`] if no rule matches
    /// - [`EngineError::PersistenceFailure`] if the journal write failed;
    ///   nothing changed and the event may be redelivered
    /// - [`EngineError::FaultInjected`] if the handler failed; the instance
    ///   is gone
    /// - [`EngineError::InstanceUnavailable`] if the instance is not running
    pub async fn handle(&self, event: M::Event) -> EngineResult<Reaction<M>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Handle { event, reply }).await?;
        response.await.map_err(|_| self.unavailable())?
    }

    /// Snapshots the current state and data; returns the covered sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PersistenceFailure`] if the write failed and
    /// [`EngineError::InstanceUnavailable`] if the instance is not running.
    pub async fn snapshot_now(&self) -> EngineResult<u64> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        response.await.map_err(|_| self.unavailable())?
    }

    /// Returns the instance's current status.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InstanceUnavailable`] if the instance is not running.
    pub async fn status(&self) -> EngineResult<InstanceStatus<M>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        response.await.map_err(|_| self.unavailable())
    }

    /// Returns the current state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InstanceUnavailable`] if the instance is not running.
    pub async fn current_state(&self) -> EngineResult<M::State> {
        Ok(self.status().await?.state)
    }

    /// Returns the current data.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InstanceUnavailable`] if the instance is not running.
    pub async fn current_data(&self) -> EngineResult<M::Data> {
        Ok(self.status().await?.data)
    }

    /// Stops the instance after the commands already queued.
    ///
    /// Stopping an instance that is no longer running succeeds.
    pub async fn stop(&self) {
        let (reply, response) = oneshot::channel();
        if self.sender.send(Command::Stop { reply }).await.is_ok() {
            let _ = response.await;
        }
    }

    async fn send(&self, command: Command<M>) -> EngineResult<()> {
        self.sender
            .send(command)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> EngineError {
        EngineError::instance_unavailable(&self.persistence_id)
    }
}

impl<M: FsmModel> Clone for FsmHandle<M> {
    fn clone(&self) -> Self {
        Self {
            persistence_id: self.persistence_id.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<M: FsmModel> fmt::Debug for FsmHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsmHandle")
            .field("persistence_id", &self.persistence_id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
