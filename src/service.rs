use std::any::Any;

use tokio::task::{JoinError, JoinHandle};

use crate::app_state::AppState;
use crate::controller::{SubmitRejection, Ticket};
use crate::domain::ViewSnapshot;

/// Moves the controller into Loading and publishes the new view.
pub async fn begin_search(state: &AppState, input: &str) -> Result<(Ticket, ViewSnapshot), SubmitRejection> {
    let mut controller = state.controller.lock().await;
    let ticket = controller.submit(input)?;
    let snapshot = controller.snapshot();
    drop(controller);

    state.publish(snapshot.clone());
    Ok((ticket, snapshot))
}

/// Runs the provider call for `ticket` and settles the controller with its outcome.
/// The controller lock is not held while the remote call is outstanding.
pub async fn complete_search(state: &AppState, ticket: Ticket) -> ViewSnapshot {
    let provider = state.provider.clone();
    let term = ticket.query.term().to_string();
    let joined = tokio::spawn(async move { provider.fetch_definition(&term).await }).await;

    let mut controller = state.controller.lock().await;
    let applied = match joined {
        Ok(outcome) => controller.settle(&ticket, outcome),
        Err(e) => controller.settle_rejected(&ticket, join_error_message(e)),
    };
    let snapshot = controller.snapshot();
    drop(controller);

    if applied {
        state.publish(snapshot.clone());
    }
    snapshot
}

/// Settles `ticket` on its own task so the controller leaves Loading even if
/// the caller that started the search goes away.
pub fn spawn_completion(state: &AppState, ticket: Ticket) -> JoinHandle<ViewSnapshot> {
    let state = state.clone();
    tokio::spawn(async move { complete_search(&state, ticket).await })
}

/// Submit and wait for the result in one go.
pub async fn search(state: &AppState, input: &str) -> Result<ViewSnapshot, SubmitRejection> {
    let (ticket, _) = begin_search(state, input).await?;
    match spawn_completion(state, ticket).await {
        Ok(snapshot) => Ok(snapshot),
        Err(e) => {
            tracing::error!(error = %e, "search completion task failed");
            Ok(state.snapshot().await)
        }
    }
}

fn join_error_message(e: JoinError) -> Option<String> {
    if e.is_panic() {
        panic_message(e.into_panic().as_ref())
    } else {
        None
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(s) = payload.downcast_ref::<&str>() {
        Some(s.to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}
