/// 映画レビュー一覧取得 Lambdaエントリポイント
///
/// GET /movies/{movieId}/reviews
use lambda_http::Error;
use reviews::application::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Error> {
    reviews::runtime::serve(Endpoint::GetMovieReviews).await
}
