use std::sync::{Arc, Weak};

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::mailbox::{Exec, Mailbox};
use crate::scheduler;
use crate::{ActorDeadError, Message};

/// Handle to an actor that owns a state of type `S`.
///
/// The actor keeps running as long as a handle exists, or until
/// [`Actor::stop`] is called.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns an actor on the current tokio runtime.
    ///
    /// `label` is recorded on the actor's tracing span.
    pub fn spawn(state: S, label: &str) -> Self {
        let (mailbox, receivers) = Mailbox::new();
        let mailbox = Arc::new(mailbox);
        tokio::spawn(
            scheduler::run(Arc::downgrade(&mailbox), state, receivers)
                .instrument(debug_span!("actor", label)),
        );
        Self { mailbox }
    }

    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Sends a message to the actor.
    #[inline]
    pub fn send<M: Message<S>>(&self, msg: M) -> Result<(), ActorDeadError> {
        self.mailbox.post(Box::new(msg))
    }

    /// Runs a closure on the actor's state, without waiting for it.
    pub fn exec<F>(&self, label: &'static str, f: F) -> Result<(), ActorDeadError>
    where
        F: FnOnce(&mut S, &Actor<S>) + Send + 'static,
    {
        self.mailbox.post(Box::new(Exec { label, f }))
    }

    /// Runs a closure on the actor's state and waits for its result.
    pub async fn call<F, R>(&self, label: &'static str, f: F) -> Result<R, ActorDeadError>
    where
        F: FnOnce(&mut S, &Actor<S>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.exec(label, move |state, handle| {
            tx.send(f(state, handle)).ok();
        })?;
        rx.await.map_err(|_| ActorDeadError)
    }

    /// Asks the actor to stop.
    ///
    /// Messages that are still queued are dropped.
    #[inline]
    pub fn stop(&self) {
        self.mailbox.stop();
    }

    /// Returns `true` if the actor still accepts messages.
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.mailbox.is_closed()
    }

    /// Creates a handle that does not keep the actor alive.
    #[inline]
    pub fn downgrade(&self) -> WeakActor<S> {
        WeakActor {
            mailbox: Arc::downgrade(&self.mailbox),
        }
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

/// A handle that does not keep the actor alive, see [`Actor::downgrade`].
pub struct WeakActor<S> {
    mailbox: Weak<Mailbox<S>>,
}

impl<S> WeakActor<S> {
    /// Returns a strong handle if some strong handle still exists.
    #[inline]
    pub fn upgrade(&self) -> Option<Actor<S>> {
        self.mailbox.upgrade().map(|mailbox| Actor { mailbox })
    }
}

impl<S> Clone for WeakActor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Weak::clone(&self.mailbox),
        }
    }
}
