/// レビューAPIハンドラー
///
/// 各エンドポイントは「バリデーション → ストレージ呼び出し1回 → レスポンス変換」の
/// 3段で処理する。バリデーションに失敗した場合はストレージを呼び出さない。
use lambda_http::{Body, Request, RequestExt, Response};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

use super::response_mapper::{
    into_response, HandlerError, Outcome, MSG_MOVIE_NOT_FOUND, MSG_REVIEW_NOT_FOUND,
};
use crate::domain::{RawRequest, RequestValidator};
use crate::infrastructure::{
    KeyCondition, ReviewFilter, ReviewRepository, ReviewUpdate, UpdateResult,
};

/// Lambda関数ごとのエンドポイント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// POST /movies/reviews
    AddReview,
    /// GET /movies/{movieId}/reviews/{reviewerName}
    GetReviewByReviewer,
    /// GET /movies/{movieId}/reviews
    GetMovieReviews,
    /// GET /movies/{movieId}/reviews/minRating/{n}
    GetReviewsWithMinRating,
    /// GET /moviesByYear/{movieId}/reviewsByYear/{year}
    GetReviewsByYear,
    /// GET /reviews/{reviewerName}/{movieId}/translation
    GetReviewTranslation,
    /// GET /reviewsByReviewer/{reviewerName}
    GetReviewsByReviewer,
    /// PUT /moviesById/{movieId}/reviewsByReviewer/{reviewerName}
    UpdateReview,
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::AddReview => "add_review",
            Endpoint::GetReviewByReviewer => "get_review_by_reviewer",
            Endpoint::GetMovieReviews => "get_movie_reviews",
            Endpoint::GetReviewsWithMinRating => "get_reviews_with_min_rating",
            Endpoint::GetReviewsByYear => "get_reviews_by_year",
            Endpoint::GetReviewTranslation => "get_review_translation",
            Endpoint::GetReviewsByReviewer => "get_reviews_by_reviewer",
            Endpoint::UpdateReview => "update_review",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// API GatewayのリクエストからRawRequestを抽出
///
/// クエリパラメータが複数値の場合は最初の値を採用する。
pub fn raw_request(request: &Request) -> RawRequest {
    let path_parameters = request
        .path_parameters_ref()
        .map(|params| to_single_value_map(params.iter()))
        .unwrap_or_default();
    let query_parameters = request
        .query_string_parameters_ref()
        .map(|params| to_single_value_map(params.iter()))
        .unwrap_or_default();
    let bytes: &[u8] = request.body().as_ref();

    RawRequest {
        path_parameters,
        query_parameters,
        body: (!bytes.is_empty()).then(|| bytes.to_vec()),
    }
}

fn to_single_value_map<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (name, value) in pairs {
        map.entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }
    map
}

/// レビューAPIのリクエストを処理するハンドラー
pub struct ReviewHandler<R>
where
    R: ReviewRepository,
{
    /// レビューリポジトリ
    review_repo: R,
}

impl<R> ReviewHandler<R>
where
    R: ReviewRepository,
{
    /// 新しいReviewHandlerを作成
    pub fn new(review_repo: R) -> Self {
        Self { review_repo }
    }

    /// HTTPリクエストを処理してレスポンスを返す
    pub async fn handle(&self, endpoint: Endpoint, request: &Request) -> Response<Body> {
        self.handle_raw(endpoint, &raw_request(request)).await
    }

    /// 抽出済みの入力を処理してレスポンスを返す
    pub async fn handle_raw(&self, endpoint: Endpoint, raw: &RawRequest) -> Response<Body> {
        let result = match endpoint {
            Endpoint::AddReview => self.add_review(raw).await,
            Endpoint::GetReviewByReviewer => self.get_review_by_reviewer(raw).await,
            Endpoint::GetMovieReviews => self.get_movie_reviews(raw).await,
            Endpoint::GetReviewsWithMinRating => self.get_reviews_with_min_rating(raw).await,
            Endpoint::GetReviewsByYear => self.get_reviews_by_year(raw).await,
            Endpoint::GetReviewTranslation => self.get_review_translation(raw).await,
            Endpoint::GetReviewsByReviewer => self.get_reviews_by_reviewer(raw).await,
            Endpoint::UpdateReview => self.update_review(raw).await,
        };
        into_response(result)
    }

    /// レビューを追加（同一キーは上書き）
    pub async fn add_review(&self, raw: &RawRequest) -> Result<Outcome, HandlerError> {
        let review = RequestValidator::add_review(raw)?;

        self.review_repo.put(&review).await?;

        info!(
            movie_id = review.movie_id,
            reviewer_name = %review.reviewer_name,
            "レビューを追加"
        );
        Ok(Outcome::Created)
    }

    /// 映画とレビュアーを指定してレビューを取得
    pub async fn get_review_by_reviewer(&self, raw: &RawRequest) -> Result<Outcome, HandlerError> {
        let key = RequestValidator::review_key(raw)?;

        let reviews = self
            .review_repo
            .query(&KeyCondition::MovieAndReviewer(key), None)
            .await?;

        found(&reviews)
    }

    /// 映画の全レビューを取得
    ///
    /// レビューが1件もない映画は存在しないものとして扱う。
    pub async fn get_movie_reviews(&self, raw: &RawRequest) -> Result<Outcome, HandlerError> {
        let movie_id = RequestValidator::movie_id(raw)?;

        let reviews = self
            .review_repo
            .query(&KeyCondition::Movie(movie_id), None)
            .await?;

        if reviews.is_empty() {
            return Err(HandlerError::NotFound(MSG_MOVIE_NOT_FOUND));
        }
        found(&reviews)
    }

    /// 指定評価より高いレビューを取得（評価未指定なら全件）
    pub async fn get_reviews_with_min_rating(
        &self,
        raw: &RawRequest,
    ) -> Result<Outcome, HandlerError> {
        let params = RequestValidator::min_rating(raw)?;
        let filter = params.min_rating.map(ReviewFilter::RatingAbove);

        let reviews = self
            .review_repo
            .query(&KeyCondition::Movie(params.movie_id), filter.as_ref())
            .await?;

        found(&reviews)
    }

    /// 指定年のレビューを取得
    pub async fn get_reviews_by_year(&self, raw: &RawRequest) -> Result<Outcome, HandlerError> {
        let params = RequestValidator::reviews_by_year(raw)?;

        let reviews = self
            .review_repo
            .query(
                &KeyCondition::Movie(params.movie_id),
                Some(&ReviewFilter::Year(params.year)),
            )
            .await?;

        found(&reviews)
    }

    /// レビューの翻訳を取得
    ///
    /// languageが指定されていれば翻訳マップをその言語のみに絞り込む。
    /// レビューが存在しない場合はnullを返す。
    pub async fn get_review_translation(&self, raw: &RawRequest) -> Result<Outcome, HandlerError> {
        let params = RequestValidator::translation(raw)?;

        let review = self.review_repo.get(&params.key).await?;
        let review = match params.language.as_deref() {
            Some(language) => review.map(|r| r.narrow_translation(language)),
            None => review,
        };

        found(&review)
    }

    /// レビュアーの全レビューを取得
    pub async fn get_reviews_by_reviewer(&self, raw: &RawRequest) -> Result<Outcome, HandlerError> {
        let reviewer_name = RequestValidator::reviewer_name(raw)?;

        let reviews = self
            .review_repo
            .query(&KeyCondition::Reviewer(reviewer_name), None)
            .await?;

        found(&reviews)
    }

    /// 既存レビューの本文を更新
    pub async fn update_review(&self, raw: &RawRequest) -> Result<Outcome, HandlerError> {
        let params = RequestValidator::update_review(raw)?;

        let result = self
            .review_repo
            .update(&params.key, &ReviewUpdate::ReviewText(params.review_text))
            .await?;

        match result {
            UpdateResult::Updated => {
                info!(
                    movie_id = params.key.movie_id,
                    reviewer_name = %params.key.reviewer_name,
                    "レビュー本文を更新"
                );
                Ok(Outcome::Updated)
            }
            UpdateResult::NotFound => Err(HandlerError::NotFound(MSG_REVIEW_NOT_FOUND)),
        }
    }
}

fn found<T: Serialize>(value: &T) -> Result<Outcome, HandlerError> {
    serde_json::to_value(value)
        .map(Outcome::Found)
        .map_err(|e| HandlerError::Unexpected(e.to_string()))
}
