/// レビュアー指定レビュー取得 Lambdaエントリポイント
///
/// GET /movies/{movieId}/reviews/{reviewerName}
use lambda_http::Error;
use reviews::application::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Error> {
    reviews::runtime::serve(Endpoint::GetReviewByReviewer).await
}
