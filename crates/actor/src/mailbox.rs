use std::fmt::{self, Debug};

use tokio::sync::{mpsc, watch};

use crate::{Actor, ActorDeadError};

/// A message that an actor with state `S` can handle.
pub trait Message<S>: Send + Debug + 'static {
    /// Handles the message with exclusive access to the actor's state.
    ///
    /// `handle` refers to the actor itself, so the handler can post
    /// follow-up messages or give a handle to spawned tasks.
    fn handle(self, state: &mut S, handle: &Actor<S>);
}

/// Object-safe form of [`Message`].
pub(crate) trait Envelope<S>: Send + Debug {
    fn deliver(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

impl<S, M: Message<S>> Envelope<S> for M {
    #[inline]
    fn deliver(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        (*self).handle(state, handle)
    }
}

pub(crate) type BoxedEnvelope<S> = Box<dyn Envelope<S>>;

/// A closure posted with [`Actor::exec`].
pub(crate) struct Exec<F> {
    pub label: &'static str,
    pub f: F,
}

impl<F> Debug for Exec<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Exec").field(&self.label).finish()
    }
}

impl<S, F> Message<S> for Exec<F>
where
    F: FnOnce(&mut S, &Actor<S>) + Send + 'static,
{
    #[inline]
    fn handle(self, state: &mut S, handle: &Actor<S>) {
        (self.f)(state, handle)
    }
}

pub(crate) struct Receivers<S> {
    pub envelopes: mpsc::UnboundedReceiver<BoxedEnvelope<S>>,
    pub stop: watch::Receiver<bool>,
}

/// The sending side shared by all strong handles of an actor.
pub(crate) struct Mailbox<S> {
    envelopes: mpsc::UnboundedSender<BoxedEnvelope<S>>,
    stop: watch::Sender<bool>,
}

impl<S: Send + 'static> Mailbox<S> {
    pub fn new() -> (Self, Receivers<S>) {
        let (envelopes_tx, envelopes_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mailbox = Mailbox {
            envelopes: envelopes_tx,
            stop: stop_tx,
        };
        let receivers = Receivers {
            envelopes: envelopes_rx,
            stop: stop_rx,
        };
        (mailbox, receivers)
    }

    #[inline]
    pub fn post(&self, envelope: BoxedEnvelope<S>) -> Result<(), ActorDeadError> {
        self.envelopes.send(envelope).map_err(|_| ActorDeadError)
    }

    #[inline]
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.envelopes.is_closed()
    }
}
