/// 年指定レビュー取得 Lambdaエントリポイント
///
/// GET /moviesByYear/{movieId}/reviewsByYear/{year}
use lambda_http::Error;
use reviews::application::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Error> {
    reviews::runtime::serve(Endpoint::GetReviewsByYear).await
}
