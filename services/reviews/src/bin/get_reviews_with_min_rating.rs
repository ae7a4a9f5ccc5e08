/// 最低評価付きレビュー取得 Lambdaエントリポイント
///
/// GET /movies/{movieId}/reviews/minRating/{n}（?minRating=も可）
use lambda_http::Error;
use reviews::application::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Error> {
    reviews::runtime::serve(Endpoint::GetReviewsWithMinRating).await
}
