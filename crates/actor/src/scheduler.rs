use std::sync::Weak;

use tokio::select;

use crate::Actor;
use crate::mailbox::{BoxedEnvelope, Mailbox, Receivers};

/// Delivers envelopes to `state` one at a time until the actor is stopped
/// or every strong handle is gone.
pub(crate) async fn run<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut receivers: Receivers<S>,
) {
    debug!("started");
    while let Some(envelope) = next_envelope(&mut receivers).await {
        let Some(mailbox) = mailbox.upgrade() else {
            debug!("all handles dropped, discarding {envelope:?}");
            break;
        };
        trace!("delivering {envelope:?}");

        let handle = Actor::from_mailbox(mailbox);
        trace_span!("deliver").in_scope(|| envelope.deliver(&mut state, &handle));
    }
    debug!("stopped");
}

async fn next_envelope<S>(receivers: &mut Receivers<S>) -> Option<BoxedEnvelope<S>> {
    select! {
        biased;

        // Also resolves when the mailbox has been dropped.
        _ = receivers.stop.changed() => None,
        envelope = receivers.envelopes.recv() => envelope,
    }
}
