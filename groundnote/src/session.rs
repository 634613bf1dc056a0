//! Query session - request sequencing and the archive of finished queries.
//!
//! The request counter is the only state shared between requests. A new
//! request cannot begin while another one is in flight; it must first be
//! completed (archived) or abandoned.

use std::collections::VecDeque;

use shared_types::{QueryOutcome, RequestId};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("request {0} is still in flight")]
    RequestInFlight(RequestId),
    #[error("request {0} is not the in-flight request")]
    NotInFlight(RequestId),
}

#[derive(Debug)]
pub struct Session {
    next_request_id: u64,
    in_flight: Option<RequestId>,
    history: VecDeque<QueryOutcome>,
    history_limit: usize,
}

impl Session {
    pub fn new(history_limit: usize) -> Self {
        Self {
            next_request_id: 1,
            in_flight: None,
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    pub fn begin(&mut self) -> Result<RequestId, SessionError> {
        if let Some(active) = self.in_flight {
            return Err(SessionError::RequestInFlight(active));
        }
        let request_id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        self.in_flight = Some(request_id);
        Ok(request_id)
    }

    /// Archive the outcome of the in-flight request, newest first.
    pub fn complete(&mut self, outcome: QueryOutcome) -> Result<(), SessionError> {
        let request_id = outcome.request_id();
        if self.in_flight != Some(request_id) {
            return Err(SessionError::NotInFlight(request_id));
        }
        self.in_flight = None;
        self.history.push_front(outcome);
        self.history.truncate(self.history_limit);
        Ok(())
    }

    /// Release the in-flight request without archiving anything.
    pub fn abandon(&mut self, request_id: RequestId) -> Result<(), SessionError> {
        if self.in_flight != Some(request_id) {
            return Err(SessionError::NotInFlight(request_id));
        }
        self.in_flight = None;
        Ok(())
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// Archived outcomes, newest first.
    pub fn history(&self) -> impl Iterator<Item = &QueryOutcome> {
        self.history.iter()
    }

    pub fn get(&self, request_id: RequestId) -> Option<&QueryOutcome> {
        self.history
            .iter()
            .find(|outcome| outcome.request_id() == request_id)
    }

    /// Drop the archive. Request ids keep increasing afterwards.
    pub fn clear_history(&mut self) -> usize {
        let cleared = self.history.len();
        self.history.clear();
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{QueryFailure, QUERY_FAILURE_MESSAGE};

    fn failed(request_id: RequestId) -> QueryOutcome {
        QueryOutcome::Failed(QueryFailure {
            request_id,
            prompt: format!("prompt {request_id}"),
            message: QUERY_FAILURE_MESSAGE.to_string(),
            failed_at: Utc::now(),
        })
    }

    #[test]
    fn test_request_ids_increase() {
        let mut session = Session::new(5);
        let first = session.begin().unwrap();
        session.abandon(first).unwrap();
        let second = session.begin().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_begin_refused_while_in_flight() {
        let mut session = Session::new(5);
        let first = session.begin().unwrap();
        assert_eq!(session.begin(), Err(SessionError::RequestInFlight(first)));
        session.complete(failed(first)).unwrap();
        assert!(session.begin().is_ok());
    }

    #[test]
    fn test_complete_requires_matching_request() {
        let mut session = Session::new(5);
        let first = session.begin().unwrap();
        let stray = RequestId(first.get() + 10);
        assert_eq!(
            session.complete(failed(stray)),
            Err(SessionError::NotInFlight(stray))
        );
        assert_eq!(session.in_flight(), Some(first));
    }

    #[test]
    fn test_history_is_newest_first_and_bounded() {
        let mut session = Session::new(2);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let id = session.begin().unwrap();
            session.complete(failed(id)).unwrap();
            ids.push(id);
        }
        let archived: Vec<_> = session.history().map(QueryOutcome::request_id).collect();
        assert_eq!(archived, vec![ids[2], ids[1]]);
        assert!(session.get(ids[0]).is_none());

        assert_eq!(session.clear_history(), 2);
        let next = session.begin().unwrap();
        assert!(next > ids[2]);
    }
}
