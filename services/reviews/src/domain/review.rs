/// 映画レビューのドメインモデル
///
/// レビューは(movieId, reviewerName)をキーとする独立したアイテムとして保存される。
/// 映画ごとのレビュー一覧はmovieIdによるキー検索で集約する。
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// パーティションキー属性名
pub const ATTR_MOVIE_ID: &str = "movieId";
/// ソートキー属性名（レビュアーGSIのパーティションキー）
pub const ATTR_REVIEWER_NAME: &str = "reviewerName";
/// レビュー本文の属性名
pub const ATTR_REVIEW_TEXT: &str = "reviewText";
/// 評価点の属性名
pub const ATTR_RATING: &str = "rating";
/// レビュー年の属性名
pub const ATTR_YEAR: &str = "year";
/// 翻訳マップの属性名
pub const ATTR_TRANSLATION: &str = "translation";

/// レビューの主キー
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewKey {
    /// 映画ID
    pub movie_id: i64,
    /// レビュアー名
    pub reviewer_name: String,
}

impl ReviewKey {
    pub fn new(movie_id: i64, reviewer_name: impl Into<String>) -> Self {
        Self {
            movie_id,
            reviewer_name: reviewer_name.into(),
        }
    }
}

/// 映画レビュー
///
/// DynamoDBアイテムとJSONレスポンスの両方で同じcamelCase属性名を使う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub movie_id: i64,
    pub reviewer_name: String,
    pub review_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    /// 言語コード -> 翻訳済み本文
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<BTreeMap<String, String>>,
}

impl Review {
    /// 必須属性のみでレビューを作成
    pub fn new(movie_id: i64, reviewer_name: impl Into<String>, review_text: impl Into<String>) -> Self {
        Self {
            movie_id,
            reviewer_name: reviewer_name.into(),
            review_text: review_text.into(),
            rating: None,
            year: None,
            translation: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_translation(mut self, language: impl Into<String>, text: impl Into<String>) -> Self {
        self.translation
            .get_or_insert_with(BTreeMap::new)
            .insert(language.into(), text.into());
        self
    }

    /// このレビューの主キー
    pub fn key(&self) -> ReviewKey {
        ReviewKey::new(self.movie_id, self.reviewer_name.clone())
    }

    /// 翻訳マップを指定言語のみに絞り込む
    ///
    /// 指定言語の翻訳が無い場合は翻訳マップ自体を取り除く。
    pub fn narrow_translation(mut self, language: &str) -> Self {
        self.translation = self
            .translation
            .and_then(|mut map| map.remove(language))
            .map(|text| BTreeMap::from([(language.to_string(), text)]));
        self
    }
}
