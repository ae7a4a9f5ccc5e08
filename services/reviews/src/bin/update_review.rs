/// レビュー本文更新 Lambdaエントリポイント
///
/// PUT /moviesById/{movieId}/reviewsByReviewer/{reviewerName}
use lambda_http::Error;
use reviews::application::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Error> {
    reviews::runtime::serve(Endpoint::UpdateReview).await
}
