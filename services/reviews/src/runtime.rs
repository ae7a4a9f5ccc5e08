/// Lambdaランタイム共通エントリ
///
/// 各エンドポイントのバイナリはこのモジュールの`serve`を呼ぶだけの薄いラッパーとなる。
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use tokio::sync::OnceCell;
use tracing::{error, info, info_span, Instrument};

use crate::application::response_mapper::internal_error;
use crate::application::{Endpoint, ReviewHandler};
use crate::infrastructure::{
    init_logging, DynamoReviewRepository, ReviewsConfig, ReviewsConfigError,
};

/// ReviewHandlerの静的インスタンス
///
/// Lambda warm start時にDynamoDBクライアントを再利用するため、
/// 一度初期化したハンドラーを静的に保持する。
/// 初期化に失敗した場合は保持せず、次のリクエストで再試行する。
static REVIEW_HANDLER: OnceCell<ReviewHandler<DynamoReviewRepository>> = OnceCell::const_new();

/// ReviewHandlerを取得（初期化されていなければ初期化）
async fn get_review_handler(
) -> Result<&'static ReviewHandler<DynamoReviewRepository>, ReviewsConfigError> {
    REVIEW_HANDLER
        .get_or_try_init(|| async {
            let config = ReviewsConfig::from_env()?;
            let client = config.build_client().await;
            let repo = DynamoReviewRepository::new(
                client,
                config.table_name().to_string(),
                config.reviewer_index().to_string(),
            );
            Ok(ReviewHandler::new(repo))
        })
        .await
}

/// 指定エンドポイントのLambda関数を起動
pub async fn serve(endpoint: Endpoint) -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    info!(endpoint = %endpoint, "Lambda関数を初期化");

    run(service_fn(move |request: Request| {
        handle_request(endpoint, request)
    }))
    .await
}

/// 1リクエストを処理
///
/// ログはendpointとLambdaリクエストIDを持つspanの中で出力される。
/// 設定の読み込みに失敗した場合は500を返す。
pub async fn handle_request(endpoint: Endpoint, request: Request) -> Result<Response<Body>, Error> {
    let request_id = request
        .lambda_context_ref()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let span = info_span!("request", endpoint = %endpoint, request_id = %request_id);

    async move {
        info!(method = %request.method(), path = %request.uri().path(), "リクエスト受信");

        let response = match get_review_handler().await {
            Ok(handler) => handler.handle(endpoint, &request).await,
            Err(err) => {
                error!(error = %err, "レビュー設定の読み込みに失敗");
                internal_error()
            }
        };

        info!(status = response.status().as_u16(), "レスポンス送信");
        Ok(response)
    }
    .instrument(span)
    .await
}
