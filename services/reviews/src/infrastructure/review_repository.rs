/// DynamoDBでレビューを管理するためのレビューリポジトリ
///
/// ハンドラーから見たストレージゲートウェイ。put/get/query/updateの4操作だけを公開し、
/// 各操作は外部ストアへの1回の往復（queryはページ送りを含む）で完結する。
/// リトライやバッチ処理は行わない。
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::domain::review::{
    ATTR_MOVIE_ID, ATTR_RATING, ATTR_REVIEW_TEXT, ATTR_REVIEWER_NAME, ATTR_YEAR, Review, ReviewKey,
};

/// リポジトリ操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    /// DynamoDBからの読み取りに失敗
    #[error("Read error: {0}")]
    ReadError(String),

    /// DynamoDBへの書き込みに失敗
    #[error("Write error: {0}")]
    WriteError(String),

    /// アイテムとReviewの変換に失敗
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// queryのキー条件
#[derive(Debug, Clone, PartialEq)]
pub enum KeyCondition {
    /// movieId = X（映画ごとのレビュー集約）
    Movie(i64),
    /// movieId = X AND reviewerName = Y
    MovieAndReviewer(ReviewKey),
    /// reviewerName = X（レビュアーGSI経由）
    Reviewer(String),
}

impl KeyCondition {
    /// レビューがこのキー条件に合致するか
    pub fn matches(&self, review: &Review) -> bool {
        match self {
            KeyCondition::Movie(movie_id) => review.movie_id == *movie_id,
            KeyCondition::MovieAndReviewer(key) => {
                review.movie_id == key.movie_id && review.reviewer_name == key.reviewer_name
            }
            KeyCondition::Reviewer(name) => review.reviewer_name == *name,
        }
    }
}

/// キー条件の評価後に適用するフィルター
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewFilter {
    /// rating > N（評価なしのレビューは除外）
    RatingAbove(f64),
    /// year = Y
    Year(i64),
}

impl ReviewFilter {
    /// レビューがこのフィルターを通過するか
    pub fn matches(&self, review: &Review) -> bool {
        match self {
            ReviewFilter::RatingAbove(threshold) => {
                review.rating.is_some_and(|rating| rating > *threshold)
            }
            ReviewFilter::Year(year) => review.year == Some(*year),
        }
    }
}

/// 属性レベルの更新内容
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewUpdate {
    /// reviewTextのみを置き換える
    ReviewText(String),
}

impl ReviewUpdate {
    /// 更新内容をレビューに適用する
    pub fn apply(&self, review: &mut Review) {
        match self {
            ReviewUpdate::ReviewText(text) => review.review_text = text.clone(),
        }
    }
}

/// 更新結果
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResult {
    /// 既存レビューを更新した
    Updated,
    /// 対象レビューが存在しなかった（何も書き込んでいない）
    NotFound,
}

/// レビュー永続化用トレイト
///
/// 実際のDynamoDBとテスト用のインメモリ実装を差し替え可能にする。
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// レビューを保存（無条件の上書き）
    async fn put(&self, review: &Review) -> Result<(), RepositoryError>;

    /// 主キーでレビューを取得
    ///
    /// # 戻り値
    /// * 見つかった場合は`Ok(Some(Review))`
    /// * 見つからなかった場合は`Ok(None)`
    /// * 失敗時は`Err(RepositoryError)`
    async fn get(&self, key: &ReviewKey) -> Result<Option<Review>, RepositoryError>;

    /// キー条件に合致するレビューを取得し、任意でフィルターを適用
    async fn query(
        &self,
        condition: &KeyCondition,
        filter: Option<&ReviewFilter>,
    ) -> Result<Vec<Review>, RepositoryError>;

    /// 既存レビューの属性を更新
    ///
    /// 対象が存在しない場合は書き込まずに`UpdateResult::NotFound`を返す。
    async fn update(
        &self,
        key: &ReviewKey,
        update: &ReviewUpdate,
    ) -> Result<UpdateResult, RepositoryError>;
}

/// DynamoDBのquery呼び出しに渡す式一式
#[derive(Debug, Clone, PartialEq)]
struct QueryExpression {
    index_name: Option<String>,
    key_condition: String,
    filter: Option<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

/// ReviewRepositoryのDynamoDB実装
#[derive(Debug, Clone)]
pub struct DynamoReviewRepository {
    /// DynamoDBクライアント
    client: DynamoDbClient,
    /// レビューテーブル名
    table_name: String,
    /// reviewerNameをパーティションキーとするGSI名
    reviewer_index: String,
}

impl DynamoReviewRepository {
    pub fn new(client: DynamoDbClient, table_name: String, reviewer_index: String) -> Self {
        Self {
            client,
            table_name,
            reviewer_index,
        }
    }

    /// 主キー属性を構築
    fn key_attributes(key: &ReviewKey) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                ATTR_MOVIE_ID.to_string(),
                AttributeValue::N(key.movie_id.to_string()),
            ),
            (
                ATTR_REVIEWER_NAME.to_string(),
                AttributeValue::S(key.reviewer_name.clone()),
            ),
        ])
    }

    /// ReviewをDynamoDBアイテムに変換
    fn to_item(review: &Review) -> Result<HashMap<String, AttributeValue>, RepositoryError> {
        serde_dynamo::aws_sdk_dynamodb_1::to_item(review)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))
    }

    /// DynamoDBアイテムをReviewに変換
    fn from_item(item: HashMap<String, AttributeValue>) -> Result<Review, RepositoryError> {
        serde_dynamo::from_item(item).map_err(|e| RepositoryError::SerializationError(e.to_string()))
    }

    /// キー条件とフィルターからquery式を構築
    ///
    /// `year`はDynamoDBの予約語のため、属性名は常にプレースホルダー経由で参照する。
    fn build_query(
        reviewer_index: &str,
        condition: &KeyCondition,
        filter: Option<&ReviewFilter>,
    ) -> QueryExpression {
        let mut names = HashMap::new();
        let mut values = HashMap::new();

        let (index_name, key_condition) = match condition {
            KeyCondition::Movie(movie_id) => {
                names.insert("#movieId".to_string(), ATTR_MOVIE_ID.to_string());
                values.insert(":movieId".to_string(), AttributeValue::N(movie_id.to_string()));
                (None, "#movieId = :movieId".to_string())
            }
            KeyCondition::MovieAndReviewer(key) => {
                names.insert("#movieId".to_string(), ATTR_MOVIE_ID.to_string());
                names.insert("#reviewerName".to_string(), ATTR_REVIEWER_NAME.to_string());
                values.insert(
                    ":movieId".to_string(),
                    AttributeValue::N(key.movie_id.to_string()),
                );
                values.insert(
                    ":reviewerName".to_string(),
                    AttributeValue::S(key.reviewer_name.clone()),
                );
                (
                    None,
                    "#movieId = :movieId AND #reviewerName = :reviewerName".to_string(),
                )
            }
            KeyCondition::Reviewer(name) => {
                names.insert("#reviewerName".to_string(), ATTR_REVIEWER_NAME.to_string());
                values.insert(":reviewerName".to_string(), AttributeValue::S(name.clone()));
                (
                    Some(reviewer_index.to_string()),
                    "#reviewerName = :reviewerName".to_string(),
                )
            }
        };

        let filter = filter.map(|filter| match filter {
            ReviewFilter::RatingAbove(threshold) => {
                names.insert("#rating".to_string(), ATTR_RATING.to_string());
                values.insert(":rating".to_string(), AttributeValue::N(threshold.to_string()));
                "#rating > :rating".to_string()
            }
            ReviewFilter::Year(year) => {
                names.insert("#year".to_string(), ATTR_YEAR.to_string());
                values.insert(":year".to_string(), AttributeValue::N(year.to_string()));
                "#year = :year".to_string()
            }
        });

        QueryExpression {
            index_name,
            key_condition,
            filter,
            names,
            values,
        }
    }
}

#[async_trait]
impl ReviewRepository for DynamoReviewRepository {
    async fn put(&self, review: &Review) -> Result<(), RepositoryError> {
        let item = Self::to_item(review)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| RepositoryError::WriteError(e.into_service_error().to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &ReviewKey) -> Result<Option<Review>, RepositoryError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_attributes(key)))
            .send()
            .await
            .map_err(|e| RepositoryError::ReadError(e.into_service_error().to_string()))?;

        result.item.map(Self::from_item).transpose()
    }

    async fn query(
        &self,
        condition: &KeyCondition,
        filter: Option<&ReviewFilter>,
    ) -> Result<Vec<Review>, RepositoryError> {
        let expression = Self::build_query(&self.reviewer_index, condition, filter);
        let mut reviews = Vec::new();
        let mut last_evaluated_key = None;
        let mut scanned_count = 0;

        // ページネーション: LastEvaluatedKeyがある限りqueryを続ける
        loop {
            let mut query_builder = self
                .client
                .query()
                .table_name(&self.table_name)
                .set_index_name(expression.index_name.clone())
                .key_condition_expression(&expression.key_condition)
                .set_filter_expression(expression.filter.clone())
                .set_expression_attribute_names(Some(expression.names.clone()))
                .set_expression_attribute_values(Some(expression.values.clone()));

            if let Some(key) = last_evaluated_key.take() {
                query_builder = query_builder.set_exclusive_start_key(Some(key));
            }

            let result = query_builder
                .send()
                .await
                .map_err(|e| RepositoryError::ReadError(e.into_service_error().to_string()))?;

            scanned_count += result.scanned_count;
            for item in result.items.unwrap_or_default() {
                reviews.push(Self::from_item(item)?);
            }

            match result.last_evaluated_key {
                Some(key) => last_evaluated_key = Some(key),
                None => break,
            }
        }

        debug!(
            scanned_count = scanned_count,
            returned_count = reviews.len(),
            filtered = filter.is_some(),
            "レビューquery完了"
        );

        Ok(reviews)
    }

    async fn update(
        &self,
        key: &ReviewKey,
        update: &ReviewUpdate,
    ) -> Result<UpdateResult, RepositoryError> {
        let ReviewUpdate::ReviewText(text) = update;

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_attributes(key)))
            .update_expression("SET #reviewText = :reviewText")
            .condition_expression("attribute_exists(#movieId)")
            .expression_attribute_names("#reviewText", ATTR_REVIEW_TEXT)
            .expression_attribute_names("#movieId", ATTR_MOVIE_ID)
            .expression_attribute_values(":reviewText", AttributeValue::S(text.clone()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(UpdateResult::Updated),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    Ok(UpdateResult::NotFound)
                } else {
                    Err(RepositoryError::WriteError(service_error.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::review::ATTR_TRANSLATION;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // ==================== エラー型 ====================

    #[test]
    fn test_repository_error_display() {
        assert_eq!(
            RepositoryError::ReadError("throttled".to_string()).to_string(),
            "Read error: throttled"
        );
        assert_eq!(
            RepositoryError::WriteError("unavailable".to_string()).to_string(),
            "Write error: unavailable"
        );
        assert_eq!(
            RepositoryError::SerializationError("bad number".to_string()).to_string(),
            "Serialization error: bad number"
        );
    }

    // ==================== キー条件・フィルター ====================

    #[test]
    fn test_key_condition_matches() {
        let review = Review::new(1, "Alice", "Good");

        assert!(KeyCondition::Movie(1).matches(&review));
        assert!(!KeyCondition::Movie(2).matches(&review));
        assert!(KeyCondition::MovieAndReviewer(ReviewKey::new(1, "Alice")).matches(&review));
        assert!(!KeyCondition::MovieAndReviewer(ReviewKey::new(1, "Bob")).matches(&review));
        assert!(KeyCondition::Reviewer("Alice".to_string()).matches(&review));
        assert!(!KeyCondition::Reviewer("alice".to_string()).matches(&review));
    }

    #[test]
    fn test_rating_filter_is_strictly_greater() {
        let filter = ReviewFilter::RatingAbove(4.0);

        assert!(!filter.matches(&Review::new(1, "A", "x").with_rating(3.0)));
        assert!(!filter.matches(&Review::new(1, "B", "x").with_rating(4.0)));
        assert!(filter.matches(&Review::new(1, "C", "x").with_rating(4.5)));
        assert!(!filter.matches(&Review::new(1, "D", "x")));
    }

    #[test]
    fn test_year_filter() {
        let filter = ReviewFilter::Year(2020);

        assert!(filter.matches(&Review::new(1, "A", "x").with_year(2020)));
        assert!(!filter.matches(&Review::new(1, "B", "x").with_year(2021)));
        assert!(!filter.matches(&Review::new(1, "C", "x")));
    }

    #[test]
    fn test_review_update_changes_only_text() {
        let mut review = Review::new(1, "Alice", "Old")
            .with_rating(3.0)
            .with_year(2020)
            .with_translation("fr", "Vieux");

        ReviewUpdate::ReviewText("New".to_string()).apply(&mut review);

        assert_eq!(
            review,
            Review::new(1, "Alice", "New")
                .with_rating(3.0)
                .with_year(2020)
                .with_translation("fr", "Vieux")
        );
    }

    // ==================== DynamoDB式の構築 ====================

    #[test]
    fn test_key_attributes() {
        let attrs = DynamoReviewRepository::key_attributes(&ReviewKey::new(1234, "Alice"));

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["movieId"], AttributeValue::N("1234".to_string()));
        assert_eq!(attrs["reviewerName"], AttributeValue::S("Alice".to_string()));
    }

    #[test]
    fn test_build_query_movie() {
        let expr =
            DynamoReviewRepository::build_query("reviewerIndex", &KeyCondition::Movie(7), None);

        assert_eq!(expr.index_name, None);
        assert_eq!(expr.key_condition, "#movieId = :movieId");
        assert_eq!(expr.filter, None);
        assert_eq!(expr.names["#movieId"], "movieId");
        assert_eq!(expr.values[":movieId"], AttributeValue::N("7".to_string()));
    }

    #[test]
    fn test_build_query_movie_and_reviewer() {
        let expr = DynamoReviewRepository::build_query(
            "reviewerIndex",
            &KeyCondition::MovieAndReviewer(ReviewKey::new(7, "Alice")),
            None,
        );

        assert_eq!(expr.index_name, None);
        assert_eq!(
            expr.key_condition,
            "#movieId = :movieId AND #reviewerName = :reviewerName"
        );
        assert_eq!(
            expr.values[":reviewerName"],
            AttributeValue::S("Alice".to_string())
        );
    }

    #[test]
    fn test_build_query_reviewer_uses_index() {
        let expr = DynamoReviewRepository::build_query(
            "byReviewer",
            &KeyCondition::Reviewer("Alice".to_string()),
            None,
        );

        assert_eq!(expr.index_name, Some("byReviewer".to_string()));
        assert_eq!(expr.key_condition, "#reviewerName = :reviewerName");
        assert!(!expr.names.contains_key("#movieId"));
    }

    #[test]
    fn test_build_query_rating_filter() {
        let expr = DynamoReviewRepository::build_query(
            "reviewerIndex",
            &KeyCondition::Movie(7),
            Some(&ReviewFilter::RatingAbove(4.0)),
        );

        assert_eq!(expr.filter, Some("#rating > :rating".to_string()));
        assert_eq!(expr.names["#rating"], "rating");
        assert_eq!(expr.values[":rating"], AttributeValue::N("4".to_string()));
    }

    #[test]
    fn test_build_query_year_filter_uses_placeholder() {
        let expr = DynamoReviewRepository::build_query(
            "reviewerIndex",
            &KeyCondition::Movie(7),
            Some(&ReviewFilter::Year(2021)),
        );

        assert_eq!(expr.filter, Some("#year = :year".to_string()));
        assert_eq!(expr.names["#year"], "year");
        assert_eq!(expr.values[":year"], AttributeValue::N("2021".to_string()));
    }

    // ==================== アイテム変換 ====================

    #[test]
    fn test_to_item_attribute_types() {
        let review = Review::new(1234, "Alice", "Great")
            .with_rating(4.5)
            .with_translation("fr", "Super");

        let item = DynamoReviewRepository::to_item(&review).unwrap();

        assert_eq!(item["movieId"], AttributeValue::N("1234".to_string()));
        assert_eq!(item["reviewerName"], AttributeValue::S("Alice".to_string()));
        assert_eq!(item["reviewText"], AttributeValue::S("Great".to_string()));
        assert_eq!(item["rating"], AttributeValue::N("4.5".to_string()));
        assert!(matches!(item[ATTR_TRANSLATION], AttributeValue::M(_)));
        assert!(!item.contains_key("year"));
    }

    #[test]
    fn test_from_item_with_integer_rating() {
        let item = HashMap::from([
            ("movieId".to_string(), AttributeValue::N("1".to_string())),
            ("reviewerName".to_string(), AttributeValue::S("Bob".to_string())),
            ("reviewText".to_string(), AttributeValue::S("Solid".to_string())),
            ("rating".to_string(), AttributeValue::N("5".to_string())),
        ]);

        let review = DynamoReviewRepository::from_item(item).unwrap();

        assert_eq!(review, Review::new(1, "Bob", "Solid").with_rating(5.0));
    }

    #[test]
    fn test_from_item_missing_review_text() {
        let item = HashMap::from([
            ("movieId".to_string(), AttributeValue::N("1".to_string())),
            ("reviewerName".to_string(), AttributeValue::S("Bob".to_string())),
        ]);

        let result = DynamoReviewRepository::from_item(item);

        assert!(matches!(result, Err(RepositoryError::SerializationError(_))));
    }

    // ==================== テスト用インメモリ実装 ====================

    /// ユニットテスト用のモックReviewRepository
    #[derive(Debug, Clone, Default)]
    pub struct MockReviewRepository {
        /// 保存されたレビュー: (movieId, reviewerName) -> Review
        reviews: Arc<Mutex<BTreeMap<(i64, String), Review>>>,
        /// 次の操作で返すエラー（障害シミュレーション用）
        next_error: Arc<Mutex<Option<RepositoryError>>>,
        /// ストレージ操作の呼び出し回数
        calls: Arc<AtomicUsize>,
    }

    impl MockReviewRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// 初期データ付きで作成
        pub fn with_reviews(reviews: Vec<Review>) -> Self {
            let repo = Self::new();
            {
                let mut stored = repo.reviews.lock().unwrap();
                for review in reviews {
                    stored.insert((review.movie_id, review.reviewer_name.clone()), review);
                }
            }
            repo
        }

        pub fn set_next_error(&self, error: RepositoryError) {
            *self.next_error.lock().unwrap() = Some(error);
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn review_count(&self) -> usize {
            self.reviews.lock().unwrap().len()
        }

        pub fn get_review(&self, key: &ReviewKey) -> Option<Review> {
            self.reviews
                .lock()
                .unwrap()
                .get(&(key.movie_id, key.reviewer_name.clone()))
                .cloned()
        }

        /// 呼び出しを記録し、設定済みのエラーがあれば返す
        fn record_call(&self) -> Result<(), RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.next_error.lock().unwrap().take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl ReviewRepository for MockReviewRepository {
        async fn put(&self, review: &Review) -> Result<(), RepositoryError> {
            self.record_call()?;
            self.reviews
                .lock()
                .unwrap()
                .insert((review.movie_id, review.reviewer_name.clone()), review.clone());
            Ok(())
        }

        async fn get(&self, key: &ReviewKey) -> Result<Option<Review>, RepositoryError> {
            self.record_call()?;
            Ok(self.get_review(key))
        }

        async fn query(
            &self,
            condition: &KeyCondition,
            filter: Option<&ReviewFilter>,
        ) -> Result<Vec<Review>, RepositoryError> {
            self.record_call()?;
            Ok(self
                .reviews
                .lock()
                .unwrap()
                .values()
                .filter(|review| condition.matches(review))
                .filter(|review| filter.is_none_or(|f| f.matches(review)))
                .cloned()
                .collect())
        }

        async fn update(
            &self,
            key: &ReviewKey,
            update: &ReviewUpdate,
        ) -> Result<UpdateResult, RepositoryError> {
            self.record_call()?;
            let mut reviews = self.reviews.lock().unwrap();
            match reviews.get_mut(&(key.movie_id, key.reviewer_name.clone())) {
                Some(review) => {
                    update.apply(review);
                    Ok(UpdateResult::Updated)
                }
                None => Ok(UpdateResult::NotFound),
            }
        }
    }

    #[tokio::test]
    async fn test_mock_repo_put_overwrites() {
        let repo = MockReviewRepository::new();

        repo.put(&Review::new(1, "Alice", "First")).await.unwrap();
        repo.put(&Review::new(1, "Alice", "Second")).await.unwrap();

        assert_eq!(repo.review_count(), 1);
        assert_eq!(
            repo.get_review(&ReviewKey::new(1, "Alice")).unwrap().review_text,
            "Second"
        );
    }

    #[tokio::test]
    async fn test_mock_repo_query_with_filter() {
        let repo = MockReviewRepository::with_reviews(vec![
            Review::new(1, "Alice", "ok").with_rating(3.0),
            Review::new(1, "Bob", "great").with_rating(5.0),
            Review::new(2, "Carol", "great").with_rating(5.0),
        ]);

        let reviews = repo
            .query(&KeyCondition::Movie(1), Some(&ReviewFilter::RatingAbove(4.0)))
            .await
            .unwrap();

        assert_eq!(reviews, vec![Review::new(1, "Bob", "great").with_rating(5.0)]);
    }

    #[tokio::test]
    async fn test_mock_repo_update_missing() {
        let repo = MockReviewRepository::new();

        let result = repo
            .update(
                &ReviewKey::new(1, "Ghost"),
                &ReviewUpdate::ReviewText("Boo".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(result, UpdateResult::NotFound);
        assert_eq!(repo.review_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_repo_error_is_consumed_once() {
        let repo = MockReviewRepository::new();
        repo.set_next_error(RepositoryError::ReadError("unavailable".to_string()));

        assert!(repo.get(&ReviewKey::new(1, "Alice")).await.is_err());
        assert!(repo.get(&ReviewKey::new(1, "Alice")).await.is_ok());
        assert_eq!(repo.call_count(), 2);
    }
}
