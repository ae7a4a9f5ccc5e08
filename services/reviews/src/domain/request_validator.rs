/// リクエストパラメータのバリデーション
///
/// パスパラメータ・クエリパラメータ・ボディから各操作の必須入力を検証し、
/// 型付きのパラメータセットに変換する。バリデーションはストレージ呼び出しの前に
/// 行われ、失敗した時点でハンドラーの処理を打ち切る。
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::review::{Review, ReviewKey};

/// パスパラメータ名
pub const PARAM_MOVIE_ID: &str = "movieId";
pub const PARAM_REVIEWER_NAME: &str = "reviewerName";
pub const PARAM_YEAR: &str = "year";
/// 最低評価のパスパラメータ名（/minRating/{n}）
pub const PARAM_MIN_RATING_PATH: &str = "n";
/// 最低評価のクエリパラメータ名
pub const PARAM_MIN_RATING: &str = "minRating";
/// 翻訳言語のクエリパラメータ名
pub const PARAM_LANGUAGE: &str = "language";

/// ボディのフィールド名
pub const FIELD_MOVIE_ID: &str = "movieId";
pub const FIELD_REVIEWER_NAME: &str = "reviewerName";
pub const FIELD_REVIEW: &str = "review";
pub const FIELD_RATING: &str = "rating";
pub const FIELD_YEAR: &str = "year";
pub const FIELD_TRANSLATION: &str = "translation";

/// DynamoDBのNumber型で表現できる絶対値の上限
const NUMBER_MAX_MAGNITUDE: f64 = 1e125;
/// DynamoDBのNumber型で表現できる0以外の絶対値の下限
const NUMBER_MIN_MAGNITUDE: f64 = 1e-130;

/// リクエスト入力のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// リクエストボディが無い
    #[error("Missing request body")]
    MissingBody,
    /// ボディがJSONオブジェクトとして解釈できない
    #[error("Malformed request body")]
    MalformedBody,
    /// 必須フィールドが欠落（欠落した全フィールドを宣言順に列挙）
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    /// フィールドの値が期待する型でない
    #[error("Invalid {0} parameter")]
    InvalidParameter(&'static str),
}

/// HTTPリクエストから抽出した未検証の入力
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequest {
    pub path_parameters: HashMap<String, String>,
    pub query_parameters: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, name: &str, value: &str) -> Self {
        self.path_parameters.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query_parameters.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// 空文字列でないパスパラメータを取得
    pub fn path(&self, name: &str) -> Option<&str> {
        self.path_parameters
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// 空文字列でないクエリパラメータを取得
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_parameters
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// 最低評価付きレビュー一覧取得のパラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct MinRatingParams {
    pub movie_id: i64,
    /// 指定された場合、この値より大きい評価のレビューのみ返す
    pub min_rating: Option<f64>,
}

/// 年指定レビュー一覧取得のパラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct YearParams {
    pub movie_id: i64,
    pub year: i64,
}

/// 翻訳取得のパラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationParams {
    pub key: ReviewKey,
    pub language: Option<String>,
}

/// レビュー本文更新のパラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReviewParams {
    pub key: ReviewKey,
    pub review_text: String,
}

/// 操作ごとのリクエストバリデータ
pub struct RequestValidator;

impl RequestValidator {
    /// レビュー追加: body.movieId, body.reviewerName, body.review
    ///
    /// rating, year, translationは任意。
    pub fn add_review(raw: &RawRequest) -> Result<Review, ValidationError> {
        let body = Self::parse_body(raw)?;

        let missing: Vec<&'static str> = [FIELD_MOVIE_ID, FIELD_REVIEWER_NAME, FIELD_REVIEW]
            .into_iter()
            .filter(|field| !Self::has_value(&body, field))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let movie_id = Self::body_movie_id(&body)?;
        let reviewer_name = Self::body_string(&body, FIELD_REVIEWER_NAME)?;
        let review_text = Self::body_string(&body, FIELD_REVIEW)?;

        let mut review = Review::new(movie_id, reviewer_name, review_text);
        review.rating = Self::body_rating(&body)?;
        review.year = Self::body_year(&body)?;
        review.translation = Self::body_translation(&body)?;
        Ok(review)
    }

    /// 主キー指定: path.movieId, path.reviewerName
    pub fn review_key(raw: &RawRequest) -> Result<ReviewKey, ValidationError> {
        let values = Self::require_path(raw, &[PARAM_MOVIE_ID, PARAM_REVIEWER_NAME])?;
        let movie_id = Self::parse_movie_id(values[0])?;
        Ok(ReviewKey::new(movie_id, values[1]))
    }

    /// 映画指定: path.movieId
    pub fn movie_id(raw: &RawRequest) -> Result<i64, ValidationError> {
        let values = Self::require_path(raw, &[PARAM_MOVIE_ID])?;
        Self::parse_movie_id(values[0])
    }

    /// 最低評価指定: path.movieId、任意でpath.nまたはquery.minRating
    ///
    /// パスパラメータが指定されていればクエリパラメータより優先する。
    pub fn min_rating(raw: &RawRequest) -> Result<MinRatingParams, ValidationError> {
        let movie_id = Self::movie_id(raw)?;
        let min_rating = raw
            .path(PARAM_MIN_RATING_PATH)
            .or_else(|| raw.query(PARAM_MIN_RATING))
            .map(|v| Self::parse_number(v, PARAM_MIN_RATING))
            .transpose()?;
        Ok(MinRatingParams {
            movie_id,
            min_rating,
        })
    }

    /// 年指定: path.movieId, path.year
    pub fn reviews_by_year(raw: &RawRequest) -> Result<YearParams, ValidationError> {
        let values = Self::require_path(raw, &[PARAM_MOVIE_ID, PARAM_YEAR])?;
        let movie_id = Self::parse_movie_id(values[0])?;
        let year = values[1]
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidParameter(PARAM_YEAR))?;
        Ok(YearParams { movie_id, year })
    }

    /// 翻訳取得: path.reviewerName, path.movieId、任意でquery.language
    pub fn translation(raw: &RawRequest) -> Result<TranslationParams, ValidationError> {
        let values = Self::require_path(raw, &[PARAM_REVIEWER_NAME, PARAM_MOVIE_ID])?;
        let movie_id = Self::parse_movie_id(values[1])?;
        Ok(TranslationParams {
            key: ReviewKey::new(movie_id, values[0]),
            language: raw.query(PARAM_LANGUAGE).map(str::to_string),
        })
    }

    /// レビュアー指定: path.reviewerName
    pub fn reviewer_name(raw: &RawRequest) -> Result<String, ValidationError> {
        let values = Self::require_path(raw, &[PARAM_REVIEWER_NAME])?;
        Ok(values[0].to_string())
    }

    /// レビュー本文更新: path.movieId, path.reviewerName, body.review
    pub fn update_review(raw: &RawRequest) -> Result<UpdateReviewParams, ValidationError> {
        let body = Self::parse_body(raw)?;

        let mut missing: Vec<&'static str> = [PARAM_MOVIE_ID, PARAM_REVIEWER_NAME]
            .into_iter()
            .filter(|name| raw.path(name).is_none())
            .collect();
        if !Self::has_value(&body, FIELD_REVIEW) {
            missing.push(FIELD_REVIEW);
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let key = Self::review_key(raw)?;
        let review_text = Self::body_string(&body, FIELD_REVIEW)?;
        Ok(UpdateReviewParams { key, review_text })
    }

    /// 必須パスパラメータを宣言順に取得し、欠落があればまとめて報告する
    fn require_path<'a>(
        raw: &'a RawRequest,
        names: &[&'static str],
    ) -> Result<Vec<&'a str>, ValidationError> {
        let mut values = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match raw.path(name) {
                Some(value) => values.push(value),
                None => missing.push(*name),
            }
        }
        if missing.is_empty() {
            Ok(values)
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }

    fn parse_movie_id(value: &str) -> Result<i64, ValidationError> {
        value
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidParameter(PARAM_MOVIE_ID))
    }

    fn parse_number(value: &str, name: &'static str) -> Result<f64, ValidationError> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| Self::is_storable_number(*n))
            .ok_or(ValidationError::InvalidParameter(name))
    }

    /// DynamoDBのNumber型に格納できる値か
    fn is_storable_number(n: f64) -> bool {
        n == 0.0 || (NUMBER_MIN_MAGNITUDE..=NUMBER_MAX_MAGNITUDE).contains(&n.abs())
    }

    fn parse_body(raw: &RawRequest) -> Result<Map<String, Value>, ValidationError> {
        let bytes = match raw.body.as_deref() {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(ValidationError::MissingBody),
        };
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ValidationError::MalformedBody),
        }
    }

    /// null・空文字列・欠落をすべて「値なし」とみなす
    fn has_value(body: &Map<String, Value>, field: &str) -> bool {
        match body.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// movieIdは整数または数字のみの文字列を受け付ける
    fn body_movie_id(body: &Map<String, Value>) -> Result<i64, ValidationError> {
        match body.get(FIELD_MOVIE_ID) {
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or(ValidationError::InvalidParameter(FIELD_MOVIE_ID)),
            Some(Value::String(s)) => Self::parse_movie_id(s),
            _ => Err(ValidationError::InvalidParameter(FIELD_MOVIE_ID)),
        }
    }

    fn body_string(body: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
        body.get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ValidationError::InvalidParameter(field))
    }

    fn body_rating(body: &Map<String, Value>) -> Result<Option<f64>, ValidationError> {
        match body.get(FIELD_RATING) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .filter(|n| Self::is_storable_number(*n))
                .map(Some)
                .ok_or(ValidationError::InvalidParameter(FIELD_RATING)),
            Some(Value::String(s)) => Self::parse_number(s, FIELD_RATING).map(Some),
            Some(_) => Err(ValidationError::InvalidParameter(FIELD_RATING)),
        }
    }

    fn body_year(body: &Map<String, Value>) -> Result<Option<i64>, ValidationError> {
        match body.get(FIELD_YEAR) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or(ValidationError::InvalidParameter(FIELD_YEAR)),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ValidationError::InvalidParameter(FIELD_YEAR)),
            Some(_) => Err(ValidationError::InvalidParameter(FIELD_YEAR)),
        }
    }

    fn body_translation(
        body: &Map<String, Value>,
    ) -> Result<Option<BTreeMap<String, String>>, ValidationError> {
        match body.get(FIELD_TRANSLATION) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(lang, text)| {
                    text.as_str()
                        .map(|t| (lang.clone(), t.to_string()))
                        .ok_or(ValidationError::InvalidParameter(FIELD_TRANSLATION))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Some),
            Some(_) => Err(ValidationError::InvalidParameter(FIELD_TRANSLATION)),
        }
    }
}
