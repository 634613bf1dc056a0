//! Search session actor tests
//!
//! Runs queries through a spawned `SearchSessionActor` backed by scripted
//! chunk sources; no network access.

use std::sync::Arc;

use async_trait::async_trait;
use groundnote::actors::{
    run_query, SearchSessionActor, SearchSessionArguments, SearchSessionError, SearchSessionMsg,
};
use groundnote::upstream::{ChunkSource, ChunkStream, ReplaySource, UpstreamError};
use ractor::{Actor, ActorRef};
use shared_types::{
    QueryOutcome, QueryProgress, RawSource, RawSupport, RenderUnit, RequestId, StreamChunk,
    QUERY_FAILURE_MESSAGE,
};
use tokio::sync::mpsc;

/// Echoes the prompt back as the answer; prompts containing "fail" error
/// out mid-stream.
struct EchoSource;

#[async_trait]
impl ChunkSource for EchoSource {
    fn name(&self) -> &str {
        "echo"
    }

    async fn open(&self, prompt: &str) -> Result<ChunkStream, UpstreamError> {
        let mut items = vec![Ok(StreamChunk::text(prompt))];
        if prompt.contains("fail") {
            items.push(Err(UpstreamError::Parse("truncated frame".to_string())));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

struct UnreachableSource;

#[async_trait]
impl ChunkSource for UnreachableSource {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn open(&self, _prompt: &str) -> Result<ChunkStream, UpstreamError> {
        Err(UpstreamError::Request(
            "connect".to_string(),
            "connection refused".to_string(),
        ))
    }
}

async fn spawn_session(
    source: Arc<dyn ChunkSource>,
    history_limit: usize,
) -> ActorRef<SearchSessionMsg> {
    let (session, _handle) = Actor::spawn(
        None,
        SearchSessionActor,
        SearchSessionArguments {
            source,
            history_limit,
        },
    )
    .await
    .expect("Failed to spawn search session");
    session
}

fn cited_replay() -> ReplaySource {
    ReplaySource::from_chunks(vec![
        StreamChunk::text("AAAA"),
        StreamChunk::text("BBBB"),
        StreamChunk {
            text: None,
            sources: vec![RawSource {
                uri: Some("https://a.example".to_string()),
                title: Some("A".to_string()),
            }],
            supports: vec![RawSupport {
                source_indices: Some(vec![0]),
                start_index: Some(0),
                end_index: Some(4),
            }],
        },
    ])
}

#[tokio::test]
async fn test_completed_query_produces_plan_and_sources() {
    let session = spawn_session(Arc::new(cited_replay()), 10).await;

    let outcome = run_query(&session, "what is A?", None)
        .await
        .expect("query should run");

    let QueryOutcome::Completed(response) = outcome else {
        panic!("expected completed outcome, got {outcome:?}");
    };
    assert_eq!(response.request_id, RequestId(1));
    assert_eq!(response.prompt, "what is A?");
    assert_eq!(response.text, "AAAABBBB");
    assert_eq!(
        response.plan.units,
        vec![
            RenderUnit::text("AAAA"),
            RenderUnit::footnotes(vec![0]),
            RenderUnit::text("BBBB"),
        ]
    );
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].uri, "https://a.example");
}

#[tokio::test]
async fn test_progress_reports_deltas_then_completion() {
    let session = spawn_session(Arc::new(cited_replay()), 10).await;
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

    run_query(&session, "what is A?", Some(progress_tx))
        .await
        .expect("query should run");

    let mut events = Vec::new();
    while let Some(event) = progress_rx.recv().await {
        events.push(event);
    }

    assert!(matches!(
        events.first(),
        Some(QueryProgress::Started { request_id: RequestId(1), .. })
    ));
    let deltas: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            QueryProgress::TextDelta { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(deltas, vec!["AAAA", "BBBB"]);
    assert!(matches!(
        events.last(),
        Some(QueryProgress::Completed {
            sources: 1,
            groundings: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn test_stream_failure_archives_fixed_message() {
    let session = spawn_session(Arc::new(EchoSource), 10).await;

    let outcome = run_query(&session, "please fail", None)
        .await
        .expect("failure is an outcome, not an error");

    let QueryOutcome::Failed(failure) = &outcome else {
        panic!("expected failed outcome, got {outcome:?}");
    };
    assert_eq!(failure.message, QUERY_FAILURE_MESSAGE);
    assert_eq!(failure.prompt, "please fail");

    let history = ractor::call!(session, |reply| SearchSessionMsg::GetHistory { reply })
        .expect("history call");
    assert_eq!(history, vec![outcome]);
}

#[tokio::test]
async fn test_open_failure_is_reported_as_failed_outcome() {
    let session = spawn_session(Arc::new(UnreachableSource), 10).await;

    let outcome = run_query(&session, "anything", None)
        .await
        .expect("query should run");

    assert!(!outcome.is_completed());
    assert_eq!(outcome.request_id(), RequestId(1));
}

#[tokio::test]
async fn test_empty_prompt_is_rejected_without_allocating_id() {
    let session = spawn_session(Arc::new(EchoSource), 10).await;

    let err = run_query(&session, "   ", None)
        .await
        .expect_err("blank prompt should be rejected");
    assert!(matches!(err, SearchSessionError::Validation(_)));

    let outcome = run_query(&session, "real question", None)
        .await
        .expect("query should run");
    assert_eq!(outcome.request_id(), RequestId(1));
}

#[tokio::test]
async fn test_history_is_newest_first_and_bounded() {
    let session = spawn_session(Arc::new(EchoSource), 2).await;

    for prompt in ["first", "second", "third"] {
        run_query(&session, prompt, None)
            .await
            .expect("query should run");
    }

    let history = ractor::call!(session, |reply| SearchSessionMsg::GetHistory { reply })
        .expect("history call");
    let prompts: Vec<_> = history.iter().map(QueryOutcome::prompt).collect();
    assert_eq!(prompts, vec!["third", "second"]);

    let evicted = ractor::call!(session, |reply| SearchSessionMsg::GetOutcome {
        request_id: RequestId(1),
        reply
    })
    .expect("get call");
    assert!(evicted.is_none());
}

#[tokio::test]
async fn test_concurrent_queries_are_sequenced() {
    let session = spawn_session(Arc::new(EchoSource), 10).await;

    let (a, b, c) = tokio::join!(
        run_query(&session, "alpha", None),
        run_query(&session, "beta", None),
        run_query(&session, "gamma", None),
    );
    let mut ids = vec![
        a.expect("alpha").request_id(),
        b.expect("beta").request_id(),
        c.expect("gamma").request_id(),
    ];
    ids.sort();
    assert_eq!(ids, vec![RequestId(1), RequestId(2), RequestId(3)]);

    let history = ractor::call!(session, |reply| SearchSessionMsg::GetHistory { reply })
        .expect("history call");
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(QueryOutcome::is_completed));
}

#[tokio::test]
async fn test_clear_history_keeps_request_ids_increasing() {
    let session = spawn_session(Arc::new(EchoSource), 10).await;

    run_query(&session, "one", None).await.expect("query");
    run_query(&session, "two", None).await.expect("query");

    let cleared = ractor::call!(session, |reply| SearchSessionMsg::ClearHistory { reply })
        .expect("clear call");
    assert_eq!(cleared, 2);

    let outcome = run_query(&session, "three", None).await.expect("query");
    assert_eq!(outcome.request_id(), RequestId(3));
}
