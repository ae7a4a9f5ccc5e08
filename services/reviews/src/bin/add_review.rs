/// レビュー追加 Lambdaエントリポイント
///
/// POST /movies/reviews
use lambda_http::Error;
use reviews::application::Endpoint;

#[tokio::main]
async fn main() -> Result<(), Error> {
    reviews::runtime::serve(Endpoint::AddReview).await
}
