/// レビュー翻訳取得 Lambdaエントリポイント
///
/// GET /reviews/{reviewerName}/{movieId}/translation（?language=で言語を絞り込み）
use lambda_http::Error;
use reviews::application::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Error> {
    reviews::runtime::serve(Endpoint::GetReviewTranslation).await
}
