/// レスポンスマッパー
///
/// ハンドラーの処理結果をHTTPステータスとJSONボディに変換する。
/// ストレージ障害や想定外エラーの詳細はログにのみ残し、クライアントには汎用メッセージを返す。
use lambda_http::http::header::{HeaderValue, CONTENT_TYPE};
use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::ValidationError;
use crate::infrastructure::RepositoryError;

/// レビュー追加成功時のメッセージ
pub const MSG_REVIEW_ADDED: &str = "Review added successfully";
/// レビュー本文更新成功時のメッセージ
pub const MSG_REVIEW_UPDATED: &str = "Review text updated successfully";
/// 映画にレビューが1件もない場合のメッセージ
pub const MSG_MOVIE_NOT_FOUND: &str = "Movie not found";
/// 更新対象のレビューが存在しない場合のメッセージ
pub const MSG_REVIEW_NOT_FOUND: &str = "Review not found";
/// 500レスポンスのメッセージ
pub const MSG_INTERNAL_ERROR: &str = "Internal server error";

/// ハンドラーのエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HandlerError {
    /// リクエスト入力の不備（400）
    #[error("{0}")]
    ClientInput(#[from] ValidationError),

    /// 対象リソースが存在しない（404）
    #[error("{0}")]
    NotFound(&'static str),

    /// ストレージ操作の失敗（500）
    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// その他の想定外エラー（500）
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// ハンドラーの成功結果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// レビューを作成した（201）
    Created,
    /// レビューを更新した（200）
    Updated,
    /// 読み取り結果（200）
    Found(Value),
}

/// 処理結果をHTTPレスポンスに変換
pub fn into_response(result: Result<Outcome, HandlerError>) -> Response<Body> {
    match result {
        Ok(Outcome::Created) => message_response(StatusCode::CREATED, MSG_REVIEW_ADDED),
        Ok(Outcome::Updated) => message_response(StatusCode::OK, MSG_REVIEW_UPDATED),
        Ok(Outcome::Found(value)) => json_response(StatusCode::OK, &value),
        Err(HandlerError::ClientInput(err)) => {
            warn!(reason = %err, "バリデーション失敗");
            message_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(HandlerError::NotFound(message)) => {
            info!(reason = message, "対象が存在しない");
            message_response(StatusCode::NOT_FOUND, message)
        }
        Err(HandlerError::Storage(err)) => {
            error!(error = %err, "ストレージ操作に失敗");
            internal_error()
        }
        Err(HandlerError::Unexpected(detail)) => {
            error!(error = %detail, "想定外のエラー");
            internal_error()
        }
    }
}

/// `{"message": ...}`形式のレスポンスを生成
pub fn message_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &json!({ "message": message }))
}

/// 汎用の500レスポンスを生成
pub fn internal_error() -> Response<Body> {
    message_response(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL_ERROR)
}

fn json_response(status: StatusCode, value: &Value) -> Response<Body> {
    let mut response = Response::new(Body::Text(value.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
