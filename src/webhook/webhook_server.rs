// Inbound HTTP surface for the combines service. Two POST routes: bulk lobby
// creation and lifecycle events. Only numeric statuses go back to the
// caller; everything human-readable lands in the logs.

use crate::core::combines::{CombineEvent, CombinesError, CombinesLobby, CombinesService, RoomGateway};
use crate::core::settings::SettingsStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

pub fn router<G, S>(service: Arc<CombinesService<G, S>>) -> Router
where
    G: RoomGateway + 'static,
    S: SettingsStore + 'static,
{
    Router::new()
        .route("/combines/lobbies", post(create_lobbies::<G, S>))
        .route("/combines/event", post(receive_event::<G, S>))
        .with_state(service)
}

pub async fn serve<G, S>(
    addr: SocketAddr,
    service: Arc<CombinesService<G, S>>,
) -> anyhow::Result<()>
where
    G: RoomGateway + 'static,
    S: SettingsStore + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Combines webhook listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// Bulk lobby creation. The payload is a JSON object whose values are lobby
/// records; the keys are ignored. The whole batch is rejected on the first
/// hard failure.
async fn create_lobbies<G, S>(
    State(service): State<Arc<CombinesService<G, S>>>,
    payload: Result<Json<HashMap<String, CombinesLobby>>, JsonRejection>,
) -> StatusCode
where
    G: RoomGateway + 'static,
    S: SettingsStore + 'static,
{
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected malformed lobby payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let lobbies: Vec<CombinesLobby> = payload.into_values().collect();
    let result = service.process_batch(lobbies).await;
    batch_status(&result)
}

/// Lifecycle events. Only `Finished` does anything; the rest are
/// acknowledged as not implemented.
async fn receive_event<G, S>(
    State(service): State<Arc<CombinesService<G, S>>>,
    payload: Result<Json<CombineEvent>, JsonRejection>,
) -> StatusCode
where
    G: RoomGateway + 'static,
    S: SettingsStore + 'static,
{
    let Json(event) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected malformed event payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let result = service.handle_event(&event).await;
    event_status(&result)
}

fn batch_status(result: &Result<usize, CombinesError>) -> StatusCode {
    match result {
        Ok(created) => {
            info!(created, "Processed lobby batch");
            StatusCode::OK
        }
        Err(e @ (CombinesError::NotInGuild(_) | CombinesError::NotActive(_))) => {
            warn!(error = %e, "Rejected lobby batch");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(e) => {
            warn!(error = %e, "Lobby batch failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn event_status(result: &Result<(), CombinesError>) -> StatusCode {
    match result {
        Ok(()) => StatusCode::OK,
        Err(CombinesError::UnhandledEvent(kind)) => {
            info!(kind, "Ignoring unhandled event kind");
            StatusCode::NOT_IMPLEMENTED
        }
        Err(CombinesError::MissingMatchId) => StatusCode::BAD_REQUEST,
        Err(e @ CombinesError::NotInGuild(_)) => {
            warn!(error = %e, "Rejected event");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(e) => {
            warn!(error = %e, "Event handling failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_statuses_match_the_contract() {
        assert_eq!(batch_status(&Ok(3)), StatusCode::OK);
        assert_eq!(
            batch_status(&Err(CombinesError::NotInGuild(1))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            batch_status(&Err(CombinesError::NotActive(1))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            batch_status(&Err(CombinesError::Gateway("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn event_statuses_match_the_contract() {
        assert_eq!(event_status(&Ok(())), StatusCode::OK);
        assert_eq!(
            event_status(&Err(CombinesError::UnhandledEvent("CheckIn"))),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            event_status(&Err(CombinesError::MissingMatchId)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            event_status(&Err(CombinesError::NotInGuild(1))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            event_status(&Err(CombinesError::Gateway("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
