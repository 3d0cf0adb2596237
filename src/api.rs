//! Request/response boundary in front of the [`LeaderboardStore`].
//!
//! The handler is independent of any server framework: it takes a method and
//! a raw body and produces a status plus an optional JSON body.

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::warn;

use crate::leaderboard::{CommitError, LeaderboardStore};

pub const DATA_PATH: &str = "/api/data";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
        }
    }

    fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: Some(json!({ "error": message })),
        }
    }

    fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }
}

pub fn handle(board: &LeaderboardStore, method: &Method, body: &[u8]) -> ApiResponse {
    if *method == Method::GET {
        read(board)
    } else if *method == Method::POST {
        write(board, body)
    } else {
        ApiResponse::empty(StatusCode::METHOD_NOT_ALLOWED)
    }
}

fn read(board: &LeaderboardStore) -> ApiResponse {
    match board.snapshot() {
        Ok(standings) => ApiResponse::ok(json!(standings)),
        Err(err) => {
            warn!(error = %err, "snapshot failed");
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
        }
    }
}

fn write(board: &LeaderboardStore, body: &[u8]) -> ApiResponse {
    let Ok(payload) = serde_json::from_slice::<Value>(body) else {
        return ApiResponse::error(StatusCode::BAD_REQUEST, "Invalid payload");
    };

    match board.commit_json(&payload) {
        Ok(standings) => ApiResponse::ok(json!(standings)),
        Err(CommitError::InvalidPayload) => {
            ApiResponse::error(StatusCode::BAD_REQUEST, "Invalid payload")
        }
        Err(CommitError::UnknownParticipant(_)) => {
            ApiResponse::error(StatusCode::BAD_REQUEST, "Unknown participant")
        }
        Err(CommitError::Store(err)) => {
            warn!(error = %err, "commit failed");
            ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::UnknownParticipantPolicy;
    use crate::store::MemoryStore;

    fn board() -> LeaderboardStore {
        let board = LeaderboardStore::new(MemoryStore::new(), UnknownParticipantPolicy::Create);
        board.seed(&["Arno", "Orso"]).unwrap();
        board
    }

    #[test]
    fn get_returns_sorted_array() {
        let board = board();
        board.commit("Orso", 3).unwrap();

        let res = handle(&board, &Method::GET, b"");
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.body,
            Some(json!([{"name": "Orso", "total": 3}, {"name": "Arno", "total": 0}]))
        );
    }

    #[test]
    fn post_commits_and_returns_snapshot() {
        let board = board();
        let res = handle(&board, &Method::POST, br#"{"name":"Arno","seconds":65}"#);
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.body,
            Some(json!([{"name": "Arno", "total": 65}, {"name": "Orso", "total": 0}]))
        );
    }

    #[test]
    fn malformed_json_is_invalid_payload() {
        let board = board();
        let res = handle(&board, &Method::POST, b"{not json");
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, Some(json!({"error": "Invalid payload"})));
    }

    #[test]
    fn non_numeric_seconds_is_rejected() {
        let board = board();
        let res = handle(&board, &Method::POST, br#"{"name":"Arno","seconds":"abc"}"#);
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert!(board.snapshot().unwrap().iter().all(|s| s.total == 0));
    }

    #[test]
    fn unknown_name_under_reject_is_client_error() {
        let board = LeaderboardStore::new(MemoryStore::new(), UnknownParticipantPolicy::Reject);
        let res = handle(&board, &Method::POST, br#"{"name":"Nobody","seconds":1}"#);
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, Some(json!({"error": "Unknown participant"})));
    }

    #[test]
    fn other_methods_are_not_allowed() {
        let board = board();
        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            let res = handle(&board, &method, b"");
            assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(res.body, None);
        }
    }

    #[test]
    fn oversized_seconds_leave_the_board_serving() {
        let board = board();
        let res = handle(&board, &Method::POST, br#"{"name":"Arno","seconds":1e19}"#);
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, Some(json!({"error": "Invalid payload"})));

        let res = handle(&board, &Method::POST, br#"{"name":"Arno","seconds":5}"#);
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(handle(&board, &Method::GET, b"").status, StatusCode::OK);
    }
}
