use thiserror::Error;

use crate::domain::{
    DefinitionResult, RequestId, SearchQuery, ViewSnapshot, ViewState, TASK_FAILURE_MESSAGE,
};
use crate::view::render_fragment;

/// Why a submission did not start a new search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("검색어를 입력해주세요.")]
    EmptyTerm,
    #[error("이전 검색이 아직 진행 중입니다.")]
    Busy,
}

/// Handed out for every accepted submission; required to settle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: RequestId,
    pub query: SearchQuery,
}

/// Owner of the view state. All transitions go through here.
#[derive(Debug, Default)]
pub struct SearchController {
    state: ViewState,
    latest: RequestId,
    revision: u64,
}

impl SearchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            request_id: self.latest,
            revision: self.revision,
            state: self.state.clone(),
            html: render_fragment(&self.state),
        }
    }

    /// Idle/Success/Error -> Loading. Blank input or an in-flight request leaves
    /// the state untouched.
    pub fn submit(&mut self, input: &str) -> Result<Ticket, SubmitRejection> {
        let query = SearchQuery::parse(input).ok_or(SubmitRejection::EmptyTerm)?;
        if self.state.is_loading() {
            return Err(SubmitRejection::Busy);
        }

        self.latest = self.latest.successor();
        self.transition(ViewState::Loading {
            term: query.term().to_string(),
        });
        tracing::info!(request_id = self.latest.0, term = query.term(), "search started");

        Ok(Ticket {
            id: self.latest,
            query,
        })
    }

    /// Loading -> Success/Error. Returns false when the result is stale and was dropped.
    pub fn settle(&mut self, ticket: &Ticket, outcome: DefinitionResult) -> bool {
        if !self.accepts(ticket.id) {
            return false;
        }

        let next = match outcome {
            Ok(markdown) => {
                tracing::info!(request_id = ticket.id.0, term = ticket.query.term(), "search succeeded");
                ViewState::Success {
                    term: ticket.query.term().to_string(),
                    markdown,
                }
            }
            Err(e) => {
                tracing::warn!(request_id = ticket.id.0, term = ticket.query.term(), error = %e, "search failed");
                ViewState::Error {
                    message: e.to_string(),
                }
            }
        };
        self.transition(next);
        true
    }

    /// Loading -> Error when the provider call itself died before producing a result.
    pub fn settle_rejected(&mut self, ticket: &Ticket, message: Option<String>) -> bool {
        if !self.accepts(ticket.id) {
            return false;
        }

        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| TASK_FAILURE_MESSAGE.to_string());
        tracing::error!(request_id = ticket.id.0, term = ticket.query.term(), error = %message, "search task failed");
        self.transition(ViewState::Error { message });
        true
    }

    fn transition(&mut self, next: ViewState) {
        self.state = next;
        self.revision += 1;
    }

    fn accepts(&self, id: RequestId) -> bool {
        if id != self.latest || !self.state.is_loading() {
            tracing::debug!(request_id = id.0, latest = self.latest.0, "dropping stale result");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DefinitionError;

    fn loading(term: &str) -> ViewState {
        ViewState::Loading { term: term.into() }
    }

    #[test]
    fn starts_idle() {
        let c = SearchController::new();
        assert_eq!(c.state(), &ViewState::Idle);
        assert_eq!(c.snapshot().request_id, RequestId(0));
    }

    #[test]
    fn whitespace_submission_is_a_no_op() {
        let mut c = SearchController::new();
        assert_eq!(c.submit("  "), Err(SubmitRejection::EmptyTerm));
        assert_eq!(c.submit(""), Err(SubmitRejection::EmptyTerm));
        assert_eq!(c.state(), &ViewState::Idle);
        assert_eq!(c.snapshot().request_id, RequestId(0));
    }

    #[test]
    fn submission_enters_loading_with_trimmed_term() {
        let mut c = SearchController::new();
        let ticket = c.submit("  ESG ").unwrap();
        assert_eq!(ticket.id, RequestId(1));
        assert_eq!(ticket.query.term(), "ESG");
        assert_eq!(c.state(), &loading("ESG"));
    }

    #[test]
    fn esg_scenario_ends_in_success() {
        let mut c = SearchController::new();
        let ticket = c.submit("ESG").unwrap();
        let body = "**ESG**는 환경(E), 사회(S), 지배구조(G)를 뜻합니다.".to_string();
        assert!(c.settle(&ticket, Ok(body.clone())));
        assert_eq!(
            c.state(),
            &ViewState::Success {
                term: "ESG".into(),
                markdown: body
            }
        );
    }

    #[test]
    fn service_error_message_is_shown_verbatim() {
        let mut c = SearchController::new();
        let ticket = c.submit("PER").unwrap();
        assert!(c.settle(&ticket, Err(DefinitionError::Service("quota exceeded".into()))));
        assert_eq!(
            c.state(),
            &ViewState::Error {
                message: "API 호출 중 오류가 발생했습니다: quota exceeded".into()
            }
        );
    }

    #[test]
    fn unknown_and_unconfigured_errors_end_in_error_state() {
        let mut c = SearchController::new();
        let ticket = c.submit("PER").unwrap();
        c.settle(&ticket, Err(DefinitionError::Unknown));
        assert_eq!(
            c.state(),
            &ViewState::Error {
                message: "알 수 없는 오류가 발생하여 정의를 가져올 수 없습니다.".into()
            }
        );

        let ticket = c.submit("PBR").unwrap();
        c.settle(&ticket, Err(DefinitionError::NotConfigured));
        assert_eq!(
            c.state(),
            &ViewState::Error {
                message: crate::domain::NOT_CONFIGURED_MESSAGE.into()
            }
        );
    }

    #[test]
    fn success_text_resembling_an_error_is_still_success() {
        let mut c = SearchController::new();
        let ticket = c.submit("오류").unwrap();
        let body = "API 호출 중 오류가 발생했습니다: 라는 문장은 예시입니다.".to_string();
        c.settle(&ticket, Ok(body.clone()));
        assert_eq!(
            c.state(),
            &ViewState::Success {
                term: "오류".into(),
                markdown: body
            }
        );
    }

    #[test]
    fn rejected_task_uses_its_message_or_fallback() {
        let mut c = SearchController::new();
        let ticket = c.submit("ESG").unwrap();
        assert!(c.settle_rejected(&ticket, Some("network down".into())));
        assert_eq!(
            c.state(),
            &ViewState::Error {
                message: "network down".into()
            }
        );

        let ticket = c.submit("ESG").unwrap();
        c.settle_rejected(&ticket, None);
        assert_eq!(
            c.state(),
            &ViewState::Error {
                message: TASK_FAILURE_MESSAGE.into()
            }
        );
    }

    #[test]
    fn new_submission_clears_previous_result() {
        let mut c = SearchController::new();
        let first = c.submit("ESG").unwrap();
        c.settle(&first, Ok("body".into()));

        let second = c.submit("PER").unwrap();
        assert_eq!(second.id, RequestId(2));
        assert_eq!(c.state(), &loading("PER"));

        c.settle(&second, Err(DefinitionError::Unknown));
        c.submit("PBR").unwrap();
        assert_eq!(c.state(), &loading("PBR"));
    }

    #[test]
    fn submission_while_loading_is_rejected() {
        let mut c = SearchController::new();
        c.submit("ESG").unwrap();
        assert_eq!(c.submit("PER"), Err(SubmitRejection::Busy));
        assert_eq!(c.state(), &loading("ESG"));
        assert_eq!(c.snapshot().request_id, RequestId(1));
    }

    #[test]
    fn stale_or_duplicate_results_are_dropped() {
        let mut c = SearchController::new();
        let first = c.submit("ESG").unwrap();
        assert!(c.settle(&first, Ok("ESG body".into())));
        assert!(!c.settle(&first, Ok("late duplicate".into())));

        let second = c.submit("PER").unwrap();
        assert!(!c.settle(&first, Ok("stale".into())));
        assert!(!c.settle_rejected(&first, Some("stale failure".into())));
        assert_eq!(c.state(), &loading("PER"));

        assert!(c.settle(&second, Ok("PER body".into())));
        assert_eq!(
            c.state(),
            &ViewState::Success {
                term: "PER".into(),
                markdown: "PER body".into()
            }
        );
    }

    #[test]
    fn settled_view_outranks_loading_view_of_same_request() {
        let mut c = SearchController::new();
        let ticket = c.submit("ESG").unwrap();
        let loading_snap = c.snapshot();
        c.settle(&ticket, Ok("body".into()));
        let settled_snap = c.snapshot();

        assert_eq!(loading_snap.request_id, settled_snap.request_id);
        assert!(settled_snap.revision > loading_snap.revision);

        assert!(!c.settle(&ticket, Ok("duplicate".into())));
        assert_eq!(c.snapshot().revision, settled_snap.revision);
    }

    #[test]
    fn snapshot_carries_rendered_fragment() {
        let mut c = SearchController::new();
        let ticket = c.submit("ESG").unwrap();
        c.settle(&ticket, Ok("- **환경**".into()));
        let snap = c.snapshot();
        assert_eq!(snap.request_id, RequestId(1));
        assert!(snap.html.contains("<strong>환경</strong>"));
    }
}
