use std::time::Duration;

use switchyard_core::{
    AgentId, Attachment, AttachmentDelta, Conversation, ConversationBuilder,
    GenerationErrorKind, SpecialistBuilder, StateDelta, TurnControllerBuilder, TurnInput,
};
use switchyard_model::{Content, ContentPart, ModelMessage};
use switchyard_test_model::{PresetFailure, PresetResponse, TestModelProvider};
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Debug, PartialEq, Eq)]
enum Event {
    Idle,
    Finished(AgentId),
    Failed(GenerationErrorKind),
}

fn conversation(
    multimodal: &TestModelProvider,
    coding: &TestModelProvider,
) -> (Conversation, mpsc::UnboundedReceiver<Event>) {
    let controller = TurnControllerBuilder::new(
        SpecialistBuilder::with_model_provider("multimodal", multimodal.clone()).build(),
        SpecialistBuilder::with_model_provider("coding", coding.clone()).build(),
    )
    .build();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let conversation = ConversationBuilder::with_controller(controller)
        .on_idle({
            let event_tx = event_tx.clone();
            move || {
                event_tx.send(Event::Idle).ok();
            }
        })
        .on_turn_finished({
            let event_tx = event_tx.clone();
            move |agent| {
                event_tx.send(Event::Finished(agent)).ok();
            }
        })
        .on_turn_failed(move |err| {
            event_tx.send(Event::Failed(err.kind())).ok();
        })
        .build();
    (conversation, event_rx)
}

async fn next_event(event_rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(Duration::from_secs(2), event_rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("conversation dropped its callbacks")
}

#[tokio::test]
async fn test_coding_then_multimodal() {
    let multimodal = TestModelProvider::with_responses([PresetResponse::text("A cat.")]);
    let coding = TestModelProvider::with_responses([PresetResponse::text("Fixed.")]);
    let (conversation, mut events) = conversation(&multimodal, &coding);

    conversation.send(TurnInput::text("fix this bug")).unwrap();
    assert_eq!(next_event(&mut events).await, Event::Finished(AgentId::Coding));
    assert_eq!(next_event(&mut events).await, Event::Idle);

    conversation
        .send(TurnInput::text("what is it?").with_image("img"))
        .unwrap();
    assert_eq!(next_event(&mut events).await, Event::Finished(AgentId::Multimodal));
    assert_eq!(next_event(&mut events).await, Event::Idle);

    let state = conversation.snapshot().await.unwrap();
    assert_eq!(
        state.messages,
        vec![
            ModelMessage::user_text("fix this bug"),
            ModelMessage::Assistant("Fixed.".to_owned()),
            ModelMessage::user_text("what is it?"),
            ModelMessage::Assistant("A cat.".to_owned()),
        ]
    );
    assert!(state.images.is_empty());

    // The multimodal specialist saw the whole history.
    assert_eq!(multimodal.requests()[0].messages.len(), 3);
}

#[tokio::test]
async fn test_attachment_only_turn() {
    let multimodal = TestModelProvider::with_responses([PresetResponse::text("Birdsong.")]);
    let coding = TestModelProvider::default();
    let (conversation, mut events) = conversation(&multimodal, &coding);

    conversation.send(TurnInput::default().with_audio("aud")).unwrap();
    assert_eq!(next_event(&mut events).await, Event::Finished(AgentId::Multimodal));

    let requests = multimodal.requests();
    let Some(ModelMessage::User(Content::Parts(parts))) = requests[0].messages.last() else {
        panic!("expected a composed message");
    };
    assert_eq!(
        parts,
        &vec![
            ContentPart::text("Analyze this media"),
            ContentPart::audio("aud", "audio/wav"),
        ]
    );

    let state = conversation.snapshot().await.unwrap();
    assert_eq!(state.messages, vec![ModelMessage::Assistant("Birdsong.".to_owned())]);
    assert!(state.audios.is_empty());
}

#[tokio::test]
async fn test_failed_turn_folds_nothing() {
    let multimodal =
        TestModelProvider::with_responses([PresetResponse::failing(PresetFailure::RateLimited)]);
    let coding = TestModelProvider::default();
    let (conversation, mut events) = conversation(&multimodal, &coding);

    conversation.send(TurnInput::text("look").with_image("img")).unwrap();
    assert_eq!(
        next_event(&mut events).await,
        Event::Failed(GenerationErrorKind::RateLimited)
    );
    assert_eq!(next_event(&mut events).await, Event::Idle);

    let state = conversation.snapshot().await.unwrap();
    assert_eq!(state.messages, vec![ModelMessage::user_text("look")]);
    assert_eq!(state.images, vec![Attachment::new("img")]);
}

#[tokio::test]
async fn test_updates_during_turn_are_queued() {
    let mut multimodal = TestModelProvider::with_responses([PresetResponse::text("Seen.")]);
    multimodal.set_delay(Duration::from_millis(20));
    let coding = TestModelProvider::default();
    let (conversation, mut events) = conversation(&multimodal, &coding);

    conversation.send(TurnInput::text("look").with_image("img1")).unwrap();
    conversation
        .update(StateDelta {
            images: AttachmentDelta::Append(vec![Attachment::new("img2")]),
            ..Default::default()
        })
        .unwrap();
    assert!(conversation.is_busy().await.unwrap());

    assert_eq!(next_event(&mut events).await, Event::Finished(AgentId::Multimodal));
    assert_eq!(next_event(&mut events).await, Event::Idle);

    // `img2` arrived after the turn started, so the turn didn't clear it.
    let state = conversation.snapshot().await.unwrap();
    assert_eq!(state.images, vec![Attachment::new("img2")]);
    assert_eq!(state.messages.len(), 2);
}

#[tokio::test]
async fn test_queued_turns_run_in_order() {
    let multimodal = TestModelProvider::default();
    let coding = TestModelProvider::with_responses([
        PresetResponse::text("first"),
        PresetResponse::text("second"),
    ]);
    let (conversation, mut events) = conversation(&multimodal, &coding);

    conversation.send(TurnInput::text("one")).unwrap();
    conversation.send(TurnInput::text("two")).unwrap();
    assert_eq!(next_event(&mut events).await, Event::Finished(AgentId::Coding));
    assert_eq!(next_event(&mut events).await, Event::Finished(AgentId::Coding));
    assert_eq!(next_event(&mut events).await, Event::Idle);

    let state = conversation.snapshot().await.unwrap();
    assert_eq!(
        state.messages,
        vec![
            ModelMessage::user_text("one"),
            ModelMessage::Assistant("first".to_owned()),
            ModelMessage::user_text("two"),
            ModelMessage::Assistant("second".to_owned()),
        ]
    );
    assert_eq!(coding.requests()[1].messages.len(), 3);
}

#[tokio::test]
async fn test_cancel_turn() {
    let mut multimodal = TestModelProvider::with_responses([PresetResponse::text("Too late.")]);
    multimodal.set_delay(Duration::from_millis(500));
    let coding = TestModelProvider::default();
    let (conversation, mut events) = conversation(&multimodal, &coding);

    conversation.send(TurnInput::text("look").with_image("img")).unwrap();
    assert!(conversation.is_busy().await.unwrap());
    conversation.cancel_turn().unwrap();
    assert_eq!(next_event(&mut events).await, Event::Idle);

    let state = conversation.snapshot().await.unwrap();
    assert_eq!(state.messages, vec![ModelMessage::user_text("look")]);
    assert_eq!(state.images, vec![Attachment::new("img")]);
    assert!(!conversation.is_busy().await.unwrap());

    // Nothing arrives from the aborted turn.
    assert!(
        timeout(Duration::from_millis(700), events.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_blank_input_without_attachments_is_dropped() {
    let multimodal = TestModelProvider::with_responses([PresetResponse::text("A kite.")]);
    let coding = TestModelProvider::with_responses([PresetResponse::text("??")]);
    let (conversation, mut events) = conversation(&multimodal, &coding);

    conversation.send(TurnInput::text("   ")).unwrap();
    assert_eq!(next_event(&mut events).await, Event::Idle);
    assert!(coding.requests().is_empty());
    assert!(conversation.snapshot().await.unwrap().messages.is_empty());

    // Staged attachments still go out with blank input.
    conversation
        .update(StateDelta {
            images: AttachmentDelta::Append(vec![Attachment::new("img")]),
            ..Default::default()
        })
        .unwrap();
    conversation.send(TurnInput::default()).unwrap();
    assert_eq!(next_event(&mut events).await, Event::Finished(AgentId::Multimodal));
    assert_eq!(next_event(&mut events).await, Event::Idle);
    assert!(coding.requests().is_empty());

    let state = conversation.snapshot().await.unwrap();
    assert_eq!(state.messages, vec![ModelMessage::Assistant("A kite.".to_owned())]);
    assert!(state.images.is_empty());
}
