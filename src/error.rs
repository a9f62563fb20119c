//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 所有路由处理函数统一返回 `Result<Response, AppError>`，
//! 设备端收到一致的 `<错误码>: <描述>` 纯文本错误体。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError` 提供 `From` 转换，无需手动 map。
//! - 实现 `IntoResponse`，由 `ImageError::status()` 决定 HTTP 状态码。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（参数 / 加载 / 解码 / 编码）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 文件系统或网络 I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件缺失或无效
    #[error("配置无效: {0}")]
    Config(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Image(err) => err.status(),
            Self::Io(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Image(err) => err.code(),
            Self::Io(_) => "E_SERVER_IO",
            Self::Config(_) => "E_CONFIG",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("请求失败 [{}] {}", status.as_u16(), self);
        } else {
            log::warn!("请求被拒绝 [{}] {}", status.as_u16(), self);
        }

        (status, format!("{}: {}", self.code(), self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_errors_keep_their_status() {
        let err = AppError::from(ImageError::InvalidSource("ftp".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "E_INVALID_SOURCE");

        let err = AppError::from(ImageError::Network("down".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn response_body_carries_code_and_message() {
        let response = AppError::from(ImageError::UnsupportedDepth(24)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn config_error_is_internal() {
        let err = AppError::Config("missing".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "E_CONFIG");
    }
}
