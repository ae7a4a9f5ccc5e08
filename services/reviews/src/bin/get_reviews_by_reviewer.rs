/// レビュアー別レビュー取得 Lambdaエントリポイント
///
/// GET /reviewsByReviewer/{reviewerName}
use lambda_http::Error;
use reviews::application::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Error> {
    reviews::runtime::serve(Endpoint::GetReviewsByReviewer).await
}
