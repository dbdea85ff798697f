//! The in-memory conversation store.

use std::collections::VecDeque;
use std::fmt::{self, Debug};

use switchyard_actor::{Actor, ActorDeadError, Message};
use tokio::task::JoinHandle;

use crate::error::GenerationError;
use crate::router::AgentId;
use crate::state::{ConversationState, StateDelta, TurnInput};
use crate::turn::{TurnController, TurnOutcome};

type IdleCallback = Box<dyn Fn() + Send + Sync>;
type FinishedCallback = Box<dyn Fn(AgentId) + Send + Sync>;
type FailedCallback = Box<dyn Fn(&GenerationError) + Send + Sync>;

/// A conversation thread: one [`ConversationState`] and the turns run
/// against it.
///
/// All operations return immediately. Folds happen one at a time in the
/// order they were submitted. Anything submitted while a turn is running
/// waits for that turn to finish, so attachments staged mid-turn are not
/// cleared by it.
///
/// Dropping the last handle stops the conversation and aborts a running
/// turn.
#[derive(Clone)]
pub struct Conversation {
    actor: Actor<Store>,
}

impl Conversation {
    /// Folds `delta` into the state.
    #[inline]
    pub fn update(&self, delta: StateDelta) -> Result<(), ActorDeadError> {
        self.actor.send(Update(delta))
    }

    /// Runs a turn against the current state.
    #[inline]
    pub fn run_turn(&self) -> Result<(), ActorDeadError> {
        self.actor.send(RunTurn)
    }

    /// Stages a user input, then runs a turn.
    ///
    /// Input with no text and no attachments only runs a turn if
    /// attachments are already staged. Otherwise it is dropped, and the
    /// idle callback fires if nothing else is running.
    #[inline]
    pub fn send(&self, input: TurnInput) -> Result<(), ActorDeadError> {
        self.actor.send(Submit(input.into_delta()))
    }

    /// Aborts the running turn, if any. Nothing from it is folded.
    #[inline]
    pub fn cancel_turn(&self) -> Result<(), ActorDeadError> {
        self.actor.send(CancelTurn)
    }

    /// Returns a copy of the current state.
    ///
    /// The copy reflects everything submitted before this call that has
    /// been folded, updates queued behind a running turn are not in it.
    pub async fn snapshot(&self) -> Result<ConversationState, ActorDeadError> {
        self.actor.call("snapshot", |store, _| store.state.clone()).await
    }

    /// Returns `true` if a turn is running.
    pub async fn is_busy(&self) -> Result<bool, ActorDeadError> {
        self.actor.call("is_busy", |store, _| store.running.is_some()).await
    }
}

/// [`Conversation`] builder.
pub struct ConversationBuilder {
    controller: TurnController,
    state: ConversationState,
    on_idle: Option<IdleCallback>,
    on_turn_finished: Option<FinishedCallback>,
    on_turn_failed: Option<FailedCallback>,
}

impl ConversationBuilder {
    /// Creates a builder for a conversation whose turns run on
    /// `controller`.
    #[inline]
    pub fn with_controller(controller: TurnController) -> Self {
        Self {
            controller,
            state: ConversationState::default(),
            on_idle: None,
            on_turn_finished: None,
            on_turn_failed: None,
        }
    }

    /// Starts from `state` instead of an empty state.
    #[inline]
    pub fn with_state(mut self, state: ConversationState) -> Self {
        self.state = state;
        self
    }

    /// Attaches a callback invoked when the conversation has nothing left
    /// to do.
    #[inline]
    pub fn on_idle(mut self, on_idle: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Attaches a callback invoked after a turn's delta has been folded.
    #[inline]
    pub fn on_turn_finished(
        mut self,
        on_turn_finished: impl Fn(AgentId) + Send + Sync + 'static,
    ) -> Self {
        self.on_turn_finished = Some(Box::new(on_turn_finished));
        self
    }

    /// Attaches a callback invoked when a turn fails.
    #[inline]
    pub fn on_turn_failed(
        mut self,
        on_turn_failed: impl Fn(&GenerationError) + Send + Sync + 'static,
    ) -> Self {
        self.on_turn_failed = Some(Box::new(on_turn_failed));
        self
    }

    /// Spawns the conversation on the current tokio runtime.
    pub fn build(self) -> Conversation {
        let store = Store {
            state: self.state,
            controller: self.controller,
            running: None,
            pending: VecDeque::new(),
            next_turn_id: 1,
            on_idle: self.on_idle,
            on_turn_finished: self.on_turn_finished,
            on_turn_failed: self.on_turn_failed,
        };
        Conversation {
            actor: Actor::spawn(store, "conversation"),
        }
    }
}

struct RunningTurn {
    id: u64,
    task: JoinHandle<()>,
}

impl Drop for RunningTurn {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Pending {
    Update(StateDelta),
    Turn,
    Submit(StateDelta),
}

struct Store {
    state: ConversationState,
    controller: TurnController,
    running: Option<RunningTurn>,
    pending: VecDeque<Pending>,
    next_turn_id: u64,
    on_idle: Option<IdleCallback>,
    on_turn_finished: Option<FinishedCallback>,
    on_turn_failed: Option<FailedCallback>,
}

impl Store {
    fn update(&mut self, delta: StateDelta) {
        if self.running.is_some() {
            trace!("turn running, queueing update");
            self.pending.push_back(Pending::Update(delta));
            return;
        }
        self.state.apply(delta);
    }

    fn run_turn(&mut self, handle: &Actor<Self>) {
        if self.running.is_some() {
            trace!("turn running, queueing turn");
            self.pending.push_back(Pending::Turn);
            return;
        }
        self.start_turn(handle);
    }

    fn submit(&mut self, delta: StateDelta, handle: &Actor<Self>) {
        self.pending.push_back(Pending::Submit(delta));
        if self.running.is_none() {
            self.drain_pending(handle);
        }
    }

    fn start_turn(&mut self, handle: &Actor<Self>) {
        let id = self.next_turn_id;
        self.next_turn_id += 1;
        debug!("starting turn {id}");

        let controller = self.controller.clone();
        let snapshot = self.state.clone();
        let handle = handle.downgrade();
        let task = tokio::spawn(async move {
            let result = controller.run_turn(&snapshot).await;
            if let Some(handle) = handle.upgrade() {
                handle.send(TurnEnded { id, result }).ok();
            }
        });
        self.running = Some(RunningTurn { id, task });
    }

    fn finish_turn(&mut self, id: u64, result: Result<TurnOutcome, GenerationError>, handle: &Actor<Self>) {
        if self.running.as_ref().is_none_or(|running| running.id != id) {
            debug!("ignoring the result of stale turn {id}");
            return;
        }
        self.running = None;

        match result {
            Ok(TurnOutcome { agent, delta }) => {
                debug!("turn {id} finished by the {agent} specialist");
                self.state.apply(delta);
                if let Some(on_turn_finished) = &self.on_turn_finished {
                    on_turn_finished(agent);
                }
            }
            Err(err) => {
                warn!("turn {id} failed, nothing folded: {err}");
                if let Some(on_turn_failed) = &self.on_turn_failed {
                    on_turn_failed(&err);
                }
            }
        }
        self.drain_pending(handle);
    }

    fn cancel_turn(&mut self, handle: &Actor<Self>) {
        let Some(running) = self.running.take() else {
            return;
        };
        info!("cancelled turn {}", running.id);
        drop(running);
        self.drain_pending(handle);
    }

    /// Applies queued work until a turn starts or the queue is empty.
    fn drain_pending(&mut self, handle: &Actor<Self>) {
        while self.running.is_none() {
            match self.pending.pop_front() {
                Some(Pending::Update(delta)) => self.state.apply(delta),
                Some(Pending::Turn) => self.start_turn(handle),
                Some(Pending::Submit(delta)) => {
                    if delta.is_empty() && !self.state.has_attachments() {
                        debug!("nothing to send, skipping turn");
                        continue;
                    }
                    self.state.apply(delta);
                    self.start_turn(handle);
                }
                None => {
                    if let Some(on_idle) = &self.on_idle {
                        on_idle();
                    }
                    return;
                }
            }
        }
    }
}

#[derive(Debug)]
struct Update(StateDelta);

impl Message<Store> for Update {
    fn handle(self, store: &mut Store, _handle: &Actor<Store>) {
        store.update(self.0);
    }
}

#[derive(Debug)]
struct RunTurn;

impl Message<Store> for RunTurn {
    fn handle(self, store: &mut Store, handle: &Actor<Store>) {
        store.run_turn(handle);
    }
}

#[derive(Debug)]
struct Submit(StateDelta);

impl Message<Store> for Submit {
    fn handle(self, store: &mut Store, handle: &Actor<Store>) {
        store.submit(self.0, handle);
    }
}

#[derive(Debug)]
struct CancelTurn;

impl Message<Store> for CancelTurn {
    fn handle(self, store: &mut Store, handle: &Actor<Store>) {
        store.cancel_turn(handle);
    }
}

struct TurnEnded {
    id: u64,
    result: Result<TurnOutcome, GenerationError>,
}

impl Debug for TurnEnded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnEnded")
            .field("id", &self.id)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

impl Message<Store> for TurnEnded {
    fn handle(self, store: &mut Store, handle: &Actor<Store>) {
        store.finish_turn(self.id, self.result, handle);
    }
}
