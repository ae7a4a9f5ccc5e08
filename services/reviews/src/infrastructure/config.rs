/// レビューテーブル接続設定
///
/// デプロイごとに外部から与えられるテーブル名・リージョンなどを環境変数から読み込み、
/// DynamoDBクライアントを構築する。
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use thiserror::Error;
use tracing::info;

/// 環境変数名: レビューテーブル名（必須）
pub const ENV_TABLE_NAME: &str = "TABLE_NAME";
/// 環境変数名: AWSリージョン（任意、未設定時はSDKのデフォルト解決に従う）
pub const ENV_REGION: &str = "REGION";
/// 環境変数名: reviewerNameをパーティションキーとするGSI名
pub const ENV_REVIEWER_INDEX_NAME: &str = "REVIEWER_INDEX_NAME";
/// 環境変数名: DynamoDBエンドポイント上書き（DynamoDB Local向け）
pub const ENV_DYNAMODB_ENDPOINT: &str = "DYNAMODB_ENDPOINT";

/// REVIEWER_INDEX_NAME未設定時のGSI名
pub const DEFAULT_REVIEWER_INDEX_NAME: &str = "reviewerIndex";

/// 設定読み込みのエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReviewsConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// レビューAPIの実行時設定
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewsConfig {
    /// レビューテーブル名
    table_name: String,
    /// リージョン上書き
    region: Option<String>,
    /// レビュアーGSI名
    reviewer_index: String,
    /// エンドポイント上書き
    dynamodb_endpoint: Option<String>,
}

impl ReviewsConfig {
    /// 環境変数から設定を読み込む
    ///
    /// 空文字列の環境変数は未設定として扱う。
    pub fn from_env() -> Result<Self, ReviewsConfigError> {
        let table_name = Self::read_env(ENV_TABLE_NAME)
            .ok_or_else(|| ReviewsConfigError::MissingEnvVar(ENV_TABLE_NAME.to_string()))?;
        let region = Self::read_env(ENV_REGION);
        let reviewer_index = Self::read_env(ENV_REVIEWER_INDEX_NAME)
            .unwrap_or_else(|| DEFAULT_REVIEWER_INDEX_NAME.to_string());
        let dynamodb_endpoint = Self::read_env(ENV_DYNAMODB_ENDPOINT);

        info!(
            table_name = %table_name,
            region = region.as_deref().unwrap_or("default"),
            reviewer_index = %reviewer_index,
            endpoint_override = dynamodb_endpoint.is_some(),
            "レビュー設定を読み込み"
        );

        Ok(Self {
            table_name,
            region,
            reviewer_index,
            dynamodb_endpoint,
        })
    }

    /// 明示的な値で設定を作成（テスト用）
    pub fn new(table_name: impl Into<String>, reviewer_index: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            region: None,
            reviewer_index: reviewer_index.into(),
            dynamodb_endpoint: None,
        }
    }

    fn read_env(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    /// 設定からDynamoDBクライアントを構築
    ///
    /// プロセス内で一度だけ呼び出し、得られたクライアントを全リクエストで共有する。
    pub async fn build_client(&self) -> DynamoDbClient {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &self.dynamodb_endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        DynamoDbClient::from_conf(builder.build())
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn reviewer_index(&self) -> &str {
        &self.reviewer_index
    }

    pub fn dynamodb_endpoint(&self) -> Option<&str> {
        self.dynamodb_endpoint.as_deref()
    }
}
