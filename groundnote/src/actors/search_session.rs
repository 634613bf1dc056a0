//! SearchSessionActor - runs grounded queries one at a time.
//!
//! Runtime shape:
//! 1) Begin a request in the session (allocates the request id)
//! 2) Open the upstream stream and assemble it chunk by chunk, forwarding
//!    text deltas to the optional progress channel
//! 3) Archive the outcome; a failed stream archives the fixed failure
//!    message instead of any partial rendering
//!
//! The actor mailbox is what sequences requests: a query is fully archived
//! before the next `RunQuery` is handled.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use shared_types::{
    AnnotatedResponse, QueryFailure, QueryOutcome, QueryProgress, RequestId,
    QUERY_FAILURE_MESSAGE,
};
use tokio::sync::mpsc;

use crate::assembler::{assemble_stream, AssembledResponse};
use crate::session::{Session, SessionError};
use crate::upstream::{ChunkSource, UpstreamError};

#[derive(Debug, Default)]
pub struct SearchSessionActor;

#[derive(Clone)]
pub struct SearchSessionArguments {
    pub source: Arc<dyn ChunkSource>,
    pub history_limit: usize,
}

pub struct SearchSessionState {
    session: Session,
    source: Arc<dyn ChunkSource>,
}

#[derive(Debug)]
pub enum SearchSessionMsg {
    RunQuery {
        prompt: String,
        progress_tx: Option<mpsc::UnboundedSender<QueryProgress>>,
        reply: RpcReplyPort<Result<QueryOutcome, SearchSessionError>>,
    },
    GetHistory {
        reply: RpcReplyPort<Vec<QueryOutcome>>,
    },
    GetOutcome {
        request_id: RequestId,
        reply: RpcReplyPort<Option<QueryOutcome>>,
    },
    ClearHistory {
        reply: RpcReplyPort<usize>,
    },
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SearchSessionError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("search session unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
impl Actor for SearchSessionActor {
    type Msg = SearchSessionMsg;
    type State = SearchSessionState;
    type Arguments = SearchSessionArguments;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            source = args.source.name(),
            history_limit = args.history_limit,
            "SearchSessionActor started"
        );
        Ok(SearchSessionState {
            session: Session::new(args.history_limit),
            source: args.source,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SearchSessionMsg::RunQuery {
                prompt,
                progress_tx,
                reply,
            } => {
                let _ = reply.send(self.handle_query(state, prompt, progress_tx).await);
            }
            SearchSessionMsg::GetHistory { reply } => {
                let _ = reply.send(state.session.history().cloned().collect());
            }
            SearchSessionMsg::GetOutcome { request_id, reply } => {
                let _ = reply.send(state.session.get(request_id).cloned());
            }
            SearchSessionMsg::ClearHistory { reply } => {
                let cleared = state.session.clear_history();
                tracing::info!(cleared, "Cleared query history");
                let _ = reply.send(cleared);
            }
        }
        Ok(())
    }
}

impl SearchSessionActor {
    async fn handle_query(
        &self,
        state: &mut SearchSessionState,
        prompt: String,
        progress_tx: Option<mpsc::UnboundedSender<QueryProgress>>,
    ) -> Result<QueryOutcome, SearchSessionError> {
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(SearchSessionError::Validation(
                "prompt cannot be empty".to_string(),
            ));
        }

        let request_id = state.session.begin()?;
        emit_progress(
            &progress_tx,
            QueryProgress::Started {
                request_id,
                prompt: prompt.clone(),
            },
        );
        tracing::info!(
            request_id = %request_id,
            source = state.source.name(),
            "Starting grounded query"
        );

        let result =
            stream_response(state.source.as_ref(), &prompt, request_id, &progress_tx).await;
        let outcome = match result {
            Ok(assembled) => {
                tracing::info!(
                    request_id = %request_id,
                    chunks = assembled.chunks,
                    text_len = assembled.text.len(),
                    sources = assembled.sources.len(),
                    groundings = assembled.groundings.len(),
                    "Grounded query completed"
                );
                emit_progress(
                    &progress_tx,
                    QueryProgress::Completed {
                        request_id,
                        sources: assembled.sources.len(),
                        groundings: assembled.groundings.len(),
                    },
                );
                QueryOutcome::Completed(AnnotatedResponse {
                    request_id,
                    prompt,
                    text: assembled.text,
                    plan: assembled.plan,
                    sources: assembled.sources,
                    completed_at: Utc::now(),
                })
            }
            Err(err) => {
                tracing::warn!(request_id = %request_id, error = %err, "Grounded query failed");
                emit_progress(
                    &progress_tx,
                    QueryProgress::Failed {
                        request_id,
                        message: QUERY_FAILURE_MESSAGE.to_string(),
                    },
                );
                QueryOutcome::Failed(QueryFailure {
                    request_id,
                    prompt,
                    message: QUERY_FAILURE_MESSAGE.to_string(),
                    failed_at: Utc::now(),
                })
            }
        };

        state.session.complete(outcome.clone())?;
        Ok(outcome)
    }
}

async fn stream_response(
    source: &dyn ChunkSource,
    prompt: &str,
    request_id: RequestId,
    progress_tx: &Option<mpsc::UnboundedSender<QueryProgress>>,
) -> Result<AssembledResponse, UpstreamError> {
    let stream = source.open(prompt).await?;
    assemble_stream(stream, |text| {
        emit_progress(
            progress_tx,
            QueryProgress::TextDelta {
                request_id,
                text: text.to_string(),
            },
        )
    })
    .await
    .map_err(|err| {
        tracing::debug!(request_id = %request_id, chunks = err.chunks, "Discarding partial response");
        err.source
    })
}

fn emit_progress(
    progress_tx: &Option<mpsc::UnboundedSender<QueryProgress>>,
    progress: QueryProgress,
) {
    if let Some(progress_tx) = progress_tx {
        let _ = progress_tx.send(progress);
    }
}

/// Run one query through the actor and wait for its outcome.
pub async fn run_query(
    session: &ActorRef<SearchSessionMsg>,
    prompt: impl Into<String>,
    progress_tx: Option<mpsc::UnboundedSender<QueryProgress>>,
) -> Result<QueryOutcome, SearchSessionError> {
    let prompt = prompt.into();
    ractor::call!(session, |reply| SearchSessionMsg::RunQuery {
        prompt,
        progress_tx,
        reply,
    })
    .map_err(|e| SearchSessionError::Unavailable(e.to_string()))?
}
