//! End-to-end behaviour of the conversation loop against recording fakes.

use super::fakes::{FakeClient, FakeListing, FakeRetriever};
use crate::engine::{ChatEngine, ChatPrompts, EngineOptions, Outcome, UserAction};
use crate::session::{ChatSettings, Role, Session, TurnStage};
use docchat_core::AppError;
use docchat_llm::ModelName;
use std::sync::Arc;

const REFUND_CHUNKS: [&str; 3] = [
    "Refunds are accepted within 30 days of purchase.",
    "Gift cards are not refundable.",
    "Store credit is issued instantly.",
];

struct Harness {
    client: Arc<FakeClient>,
    retriever: Arc<FakeRetriever>,
    engine: ChatEngine,
}

fn harness_with(client: FakeClient, retriever: FakeRetriever, options: EngineOptions) -> Harness {
    let client = Arc::new(client);
    let retriever = Arc::new(retriever);
    let engine = ChatEngine::new(
        client.clone(),
        retriever.clone(),
        Arc::new(FakeListing(vec!["faq.md", "refunds.md"])),
        ChatPrompts::builtin().unwrap(),
        options,
    );
    Harness {
        client,
        retriever,
        engine,
    }
}

fn harness(summary: &str, answer: &str) -> Harness {
    harness_with(
        FakeClient::new(summary, answer),
        FakeRetriever::new(&REFUND_CHUNKS),
        EngineOptions::default(),
    )
}

fn session(use_history: bool, debug: bool) -> Session {
    Session::new(ChatSettings {
        model: ModelName::Mixtral8x7b,
        use_history,
        debug,
    })
}

fn history_block(prompt: &str) -> &str {
    let start = prompt.rfind("<chat_history>").unwrap() + "<chat_history>".len();
    let end = prompt.rfind("</chat_history>").unwrap();
    &prompt[start..end]
}

#[tokio::test]
async fn test_refund_question_without_history() {
    let h = harness("unused", "Refunds are accepted for 30 days. It's easy.");
    let mut session = session(false, true);

    let report = h
        .engine
        .ask(&mut session, "What is the refund policy?")
        .await
        .unwrap();

    assert_eq!(
        h.retriever.calls(),
        vec![("What is the refund policy?".to_string(), 3)]
    );

    let requests = h.client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "mixtral-8x7b");

    let prompt = &requests[0].prompt;
    assert!(prompt.contains("<question>\nWhat is the refund policy?\n</question>"));
    assert!(history_block(prompt).trim().is_empty());
    for chunk in REFUND_CHUNKS {
        assert!(prompt.contains(chunk));
    }
    assert!(prompt.contains(&REFUND_CHUNKS.join("\n\n")));

    assert_eq!(report.answer, "Refunds are accepted for 30 days. Its easy.");
    assert_eq!(report.retrieval_query, "What is the refund policy?");
    assert_eq!(report.summary, None);
    assert_eq!(report.sources, vec!["doc0.md", "doc1.md", "doc2.md"]);
    assert_eq!(session.log.len(), 2);
    assert_eq!(session.stage(), TurnStage::Idle);
}

#[tokio::test]
async fn test_history_disabled_never_summarizes() {
    let h = harness("folded query", "answer");
    let mut session = session(false, true);

    for question in ["first?", "second?", "third?"] {
        h.engine.ask(&mut session, question).await.unwrap();
    }

    assert_eq!(h.client.summary_calls(), 0);
    for request in h.client.answer_requests() {
        assert!(history_block(&request.prompt).trim().is_empty());
    }
    let queries: Vec<String> = h.retriever.calls().into_iter().map(|(q, _)| q).collect();
    assert_eq!(queries, vec!["first?", "second?", "third?"]);
}

#[tokio::test]
async fn test_summarizer_runs_from_second_question() {
    let h = harness("refund policy for gift cards", "No.");
    let mut session = session(true, true);

    let first = h
        .engine
        .ask(&mut session, "What is the refund policy?")
        .await
        .unwrap();
    assert_eq!(h.client.summary_calls(), 0);
    assert_eq!(first.summary, None);

    let second = h
        .engine
        .ask(&mut session, "And for gift cards?")
        .await
        .unwrap();
    assert_eq!(h.client.summary_calls(), 1);
    assert_eq!(second.summary.as_deref(), Some("refund policy for gift cards"));
    assert_eq!(second.retrieval_query, "refund policy for gift cards");
    assert_eq!(h.retriever.calls()[1].0, "refund policy for gift cards");

    let answer_prompt = &h.client.answer_requests()[1].prompt;
    let history = history_block(answer_prompt);
    assert!(history.contains("user: What is the refund policy?"));
    assert!(history.contains("assistant: No."));
    assert!(!history.contains("And for gift cards?"));
    assert!(answer_prompt.contains("<question>\nAnd for gift cards?\n</question>"));

    h.engine.ask(&mut session, "Thanks").await.unwrap();
    assert_eq!(h.client.summary_calls(), 2);
}

#[tokio::test]
async fn test_summary_hidden_outside_debug_mode() {
    let h = harness("folded", "ok");
    let mut session = session(true, false);

    h.engine.ask(&mut session, "one").await.unwrap();
    let report = h.engine.ask(&mut session, "two").await.unwrap();

    assert_eq!(h.client.summary_calls(), 1);
    assert_eq!(report.summary, None);
    assert_eq!(report.retrieval_query, "folded");
}

#[tokio::test]
async fn test_history_window_limits_prior_turns() {
    let options = EngineOptions {
        slide_window: 3,
        ..EngineOptions::default()
    };
    let h = harness_with(
        FakeClient::new("folded", "ok"),
        FakeRetriever::new(&REFUND_CHUNKS),
        options,
    );
    let mut session = session(true, true);

    for question in ["q1", "q2", "q3"] {
        h.engine.ask(&mut session, question).await.unwrap();
    }

    let last_prompt = &h.client.answer_requests()[2].prompt;
    let history = history_block(last_prompt);
    assert_eq!(history.trim(), "user: q2\nassistant: ok");
    assert!(!history.contains("q1"));
    // The oldest turns stay in the log
    assert_eq!(session.log.len(), 6);
}

#[tokio::test]
async fn test_quotes_never_stored_or_sent() {
    let h = harness_with(
        FakeClient::new("the customer's query", "We don't refund 'final sale' items."),
        FakeRetriever::new(&["Items marked 'final sale' can't be returned."]),
        EngineOptions::default(),
    );
    let mut session = session(true, true);

    h.engine
        .ask(&mut session, "What's the policy?")
        .await
        .unwrap();
    h.engine
        .ask(&mut session, "Isn't that strict?")
        .await
        .unwrap();

    for turn in session.log.turns() {
        assert!(!turn.content().contains('\''));
    }
    for request in h.client.requests() {
        assert!(!request.prompt.contains('\''));
    }
    for (query, _) in h.retriever.calls() {
        assert!(!query.contains('\''));
    }
}

#[tokio::test]
async fn test_retrieval_capped_at_k() {
    let h = harness_with(
        FakeClient::new("", "ok"),
        FakeRetriever::new(&["one", "two", "three", "four", "five"]),
        EngineOptions::default(),
    );
    let mut session = session(false, true);

    let report = h.engine.ask(&mut session, "count?").await.unwrap();

    assert_eq!(report.sources.len(), 3);
    let prompt = &h.client.requests()[0].prompt;
    assert!(prompt.contains("one\n\ntwo\n\nthree"));
    assert!(!prompt.contains("four"));
}

#[tokio::test]
async fn test_failure_keeps_user_turn_and_returns_to_idle() {
    let h = harness_with(
        FakeClient::failing(),
        FakeRetriever::new(&REFUND_CHUNKS),
        EngineOptions::default(),
    );
    let mut session = session(true, true);

    let err = h
        .engine
        .ask(&mut session, "What is the refund policy?")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Llm(_)));
    assert_eq!(h.client.requests().len(), 1);
    assert_eq!(session.stage(), TurnStage::Idle);
    assert_eq!(session.log.len(), 1);
    assert_eq!(session.log.turns()[0].role(), Role::User);
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let h = harness("", "ok");
    let mut session = session(true, true);

    let err = h.engine.ask(&mut session, "  ''  ").await.unwrap_err();

    assert!(matches!(err, AppError::Chat(_)));
    assert!(session.log.is_empty());
    assert!(h.retriever.calls().is_empty());
}

#[tokio::test]
async fn test_reset_action_empties_log() {
    let h = harness("folded", "ok");
    let mut session = session(true, true);

    h.engine.ask(&mut session, "one").await.unwrap();
    h.engine.ask(&mut session, "two").await.unwrap();

    let outcome = h.engine.handle(&mut session, UserAction::Reset).await.unwrap();
    assert!(matches!(outcome, Outcome::ConversationReset));
    assert!(session.log.is_empty());

    // Next question is a first question again
    h.engine.ask(&mut session, "three").await.unwrap();
    assert_eq!(h.client.summary_calls(), 1);
}

#[tokio::test]
async fn test_settings_actions() {
    let h = harness("", "ok");
    let mut session = session(true, true);

    let outcome = h
        .engine
        .handle(&mut session, UserAction::SelectModel(ModelName::Llama3_70b))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        Outcome::SettingsChanged(settings) if settings.model == ModelName::Llama3_70b
    ));

    h.engine
        .handle(&mut session, UserAction::SetUseHistory(false))
        .await
        .unwrap();
    h.engine
        .handle(&mut session, UserAction::SetDebug(false))
        .await
        .unwrap();
    assert!(!session.settings.use_history);
    assert!(!session.settings.debug);

    let outcome = h
        .engine
        .handle(&mut session, UserAction::Ask("hello".to_string()))
        .await
        .unwrap();
    match outcome {
        Outcome::Answered(report) => assert_eq!(report.model, ModelName::Llama3_70b),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(h.client.requests()[0].model, "llama3-70b");
}

#[tokio::test]
async fn test_listing_and_state_actions() {
    let h = harness("", "ok");
    let mut session = session(false, true);
    h.engine.ask(&mut session, "hello").await.unwrap();

    match h
        .engine
        .handle(&mut session, UserAction::ListDocuments)
        .await
        .unwrap()
    {
        Outcome::Documents(documents) => assert_eq!(documents.len(), 2),
        other => panic!("unexpected outcome: {:?}", other),
    }

    match h
        .engine
        .handle(&mut session, UserAction::InspectState)
        .await
        .unwrap()
    {
        Outcome::State(snapshot) => {
            assert_eq!(snapshot.turn_count, 2);
            assert_eq!(snapshot.stage, TurnStage::Idle);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_model_alias_sent_to_backend() {
    let mut options = EngineOptions::default();
    options
        .model_aliases
        .insert("mixtral-8x7b".to_string(), "mixtral:8x7b".to_string());
    let h = harness_with(
        FakeClient::new("", "ok"),
        FakeRetriever::new(&REFUND_CHUNKS),
        options,
    );
    let mut session = session(false, true);

    let report = h.engine.ask(&mut session, "hi").await.unwrap();

    assert_eq!(h.client.requests()[0].model, "mixtral:8x7b");
    assert_eq!(report.model, ModelName::Mixtral8x7b);
}
