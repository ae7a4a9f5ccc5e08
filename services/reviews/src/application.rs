// アプリケーション層モジュール
pub mod response_mapper;
pub mod review_handler;

// 再エクスポート
pub use response_mapper::{into_response, HandlerError, Outcome};
pub use review_handler::{raw_request, Endpoint, ReviewHandler};
