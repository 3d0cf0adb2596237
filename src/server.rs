use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::api::{self, ApiResponse, DATA_PATH};
use crate::leaderboard::LeaderboardStore;

pub type SharedBoard = Arc<LeaderboardStore>;

pub fn router(board: SharedBoard) -> Router {
    Router::new()
        .route(DATA_PATH, any(data))
        .with_state(board)
}

async fn data(State(board): State<SharedBoard>, method: Method, body: Bytes) -> Response {
    debug!(%method, len = body.len(), "data request");

    // store calls may hit sqlite, keep them off the async workers
    let outcome = tokio::task::spawn_blocking(move || api::handle(&board, &method, &body)).await;

    match outcome {
        Ok(ApiResponse {
            status,
            body: Some(body),
        }) => (status, Json(body)).into_response(),
        Ok(ApiResponse { status, body: None }) => status.into_response(),
        Err(err) => {
            warn!(error = %err, "request handler panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve until ctrl-c
pub async fn serve(listener: TcpListener, board: SharedBoard) -> std::io::Result<()> {
    serve_until(listener, board, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await
}

pub async fn serve_until<F>(
    listener: TcpListener,
    board: SharedBoard,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, policy = %board.policy(), "leaderboard listening");

    axum::serve(listener, router(board))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("leaderboard stopped");
    Ok(())
}
