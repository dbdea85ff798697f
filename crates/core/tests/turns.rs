use std::sync::{Arc, Mutex};

use switchyard_core::{
    AgentId, Attachment, AttachmentDelta, AttachmentPolicy, ConversationState, GenerationErrorKind,
    MessageComposer, SpecialistBuilder, StateDelta, TurnController, TurnControllerBuilder,
    TurnStage,
};
use switchyard_model::{Content, ContentPart, ModelMessage};
use switchyard_test_model::{PresetFailure, PresetResponse, TestModelProvider};

struct Fixture {
    multimodal: TestModelProvider,
    coding: TestModelProvider,
    controller: TurnController,
    stages: Arc<Mutex<Vec<TurnStage>>>,
}

fn fixture(composer: MessageComposer) -> Fixture {
    let multimodal = TestModelProvider::default();
    let coding = TestModelProvider::default();
    let stages = Arc::new(Mutex::new(vec![]));
    let controller = TurnControllerBuilder::new(
        SpecialistBuilder::with_model_provider("multimodal", multimodal.clone())
            .with_system_prompt("You see and hear.")
            .build(),
        SpecialistBuilder::with_model_provider("coding", coding.clone())
            .with_system_prompt("You write code.")
            .build(),
    )
    .with_composer(composer)
    .on_stage({
        let stages = Arc::clone(&stages);
        move |stage| stages.lock().unwrap().push(stage)
    })
    .build();
    Fixture {
        multimodal,
        coding,
        controller,
        stages,
    }
}

fn sent_parts(provider: &TestModelProvider) -> Vec<ContentPart> {
    let requests = provider.requests();
    let last = requests.last().unwrap().messages.last().unwrap().clone();
    match last {
        ModelMessage::User(Content::Parts(parts)) => parts,
        other => panic!("expected a multi-part user message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_image_only_turn() {
    let f = fixture(
        MessageComposer::default()
            .with_fallback_prompt("look at this image or listen to this audio"),
    );
    f.multimodal.add_response(PresetResponse::text("A red square."));

    let mut state = ConversationState {
        messages: vec![],
        images: vec!["b64A".into()],
        audios: vec![],
    };
    let outcome = f.controller.run_turn(&state).await.unwrap();
    assert_eq!(outcome.agent, AgentId::Multimodal);
    assert_eq!(
        sent_parts(&f.multimodal),
        vec![
            ContentPart::text("look at this image or listen to this audio"),
            ContentPart::image("b64A", "image/jpeg"),
        ]
    );
    assert!(f.coding.requests().is_empty());

    state.apply(outcome.delta);
    assert!(state.images.is_empty());
    assert_eq!(
        state.messages,
        vec![ModelMessage::Assistant("A red square.".to_owned())]
    );
    assert_eq!(
        *f.stages.lock().unwrap(),
        vec![
            TurnStage::Start,
            TurnStage::Routed(AgentId::Multimodal),
            TurnStage::Composed,
            TurnStage::Invoked,
            TurnStage::Finalized,
        ]
    );
}

#[tokio::test]
async fn test_text_only_turn() {
    let f = fixture(MessageComposer::default());
    f.coding.add_response(PresetResponse::text("Add a semicolon."));

    let mut state = ConversationState {
        messages: vec![ModelMessage::user_text("fix this bug")],
        images: vec![],
        audios: vec![],
    };
    let outcome = f.controller.run_turn(&state).await.unwrap();
    assert_eq!(outcome.agent, AgentId::Coding);
    assert_eq!(outcome.delta.images, AttachmentDelta::Clear);

    let requests = f.coding.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].messages,
        vec![
            ModelMessage::System("You write code.".to_owned()),
            ModelMessage::user_text("fix this bug"),
        ]
    );
    assert!(f.multimodal.requests().is_empty());

    state.apply(outcome.delta);
    assert!(state.images.is_empty() && state.audios.is_empty());
    assert_eq!(state.messages.len(), 2);
    assert!(!f.stages.lock().unwrap().contains(&TurnStage::Composed));
}

#[tokio::test]
async fn test_attachments_accumulate_until_a_turn() {
    for (policy, expected_images) in [
        (AttachmentPolicy::AttachAll, vec!["imgX", "imgY"]),
        (AttachmentPolicy::AttachLatest, vec!["imgY"]),
    ] {
        let f = fixture(MessageComposer::default().with_policy(policy));
        f.multimodal.add_response(PresetResponse::text("Two pictures."));

        let mut state = ConversationState::default();
        for image in ["imgX", "imgY"] {
            state.apply(StateDelta {
                images: AttachmentDelta::Append(vec![image.into()]),
                ..Default::default()
            });
        }
        assert_eq!(state.images, vec![Attachment::new("imgX"), Attachment::new("imgY")]);

        let outcome = f.controller.run_turn(&state).await.unwrap();
        let images: Vec<_> = sent_parts(&f.multimodal)
            .into_iter()
            .filter_map(|part| match part {
                ContentPart::Image { data, .. } => Some(data),
                _ => None,
            })
            .collect();
        assert_eq!(images, expected_images);

        state.apply(outcome.delta);
        assert!(state.images.is_empty());
    }
}

#[tokio::test]
async fn test_stored_history_keeps_original_text() {
    let f = fixture(MessageComposer::default());
    f.multimodal.add_response(PresetResponse::text("It's a cat."));

    let mut state = ConversationState {
        messages: vec![ModelMessage::user_text("what animal?")],
        images: vec!["img".into()],
        audios: vec!["aud".into()],
    };
    let before = state.clone();
    let outcome = f.controller.run_turn(&state).await.unwrap();
    assert_eq!(state, before);

    let requests = f.multimodal.requests();
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(
        sent_parts(&f.multimodal),
        vec![
            ContentPart::text("what animal?"),
            ContentPart::image("img", "image/jpeg"),
            ContentPart::audio("aud", "audio/wav"),
        ]
    );

    state.apply(outcome.delta);
    assert_eq!(state.messages[0], ModelMessage::user_text("what animal?"));
    assert_eq!(state.messages.len(), 2);
}

#[tokio::test]
async fn test_failed_turn_has_no_delta() {
    let f = fixture(MessageComposer::default());
    f.multimodal
        .add_response(PresetResponse::failing(PresetFailure::Moderated));

    let state = ConversationState {
        messages: vec![],
        images: vec!["img".into()],
        audios: vec![],
    };
    let err = f.controller.run_turn(&state).await.unwrap_err();
    assert_eq!(err.kind(), GenerationErrorKind::Moderated);
    assert!(!f.stages.lock().unwrap().contains(&TurnStage::Finalized));
}
