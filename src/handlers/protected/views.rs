use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;

use crate::error::ApiError;
use crate::handlers::AppState;
use crate::middleware::Credential;

/// GET /api/views/stream - one `stale` event per invalidated view, data is the view path
pub async fn views_stream(
    State(gateway): State<AppState>,
    credential: Credential,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = gateway.subscribe_views(credential.token()).await?;

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(view) => {
                    let event = Event::default().event("stale").data(view.path());
                    return Some((Ok(event), receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("View stream subscriber lagged, {} notifications dropped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
