//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载“解析 → 加载 → 归一化 → 编码 → 输出”链路中的所有错误来源，
//! 避免字符串拼接式错误处理，也避免任何阶段直接终止进程。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! ## 实现思路
//!
//! - `code()`：稳定错误码，写入 HTTP 响应体，便于设备端与日志检索。
//! - `stage()`：出错阶段，用于日志定位。
//! - `status()`：请求边界上的 HTTP 状态码映射（客户端 4xx / 上游 502·504 / 内部 500）。

use axum::http::StatusCode;

/// 图片链路统一错误类型。
///
/// 该类型会在路由层被上转为 `AppError`，最终转换为 HTTP 响应。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("来源无效：{0}")]
    InvalidSource(String),

    #[error("缺少参数：{0}")]
    MissingParameter(String),

    #[error("参数无效：{0}")]
    InvalidParameter(String),

    #[error("不支持的色深：{0}（可选：16 / 18）")]
    UnsupportedDepth(i64),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("网络错误：{0}")]
    Network(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("图库请求失败：{0}")]
    GalleryFetch(String),

    #[error("图库数据解析失败：{0}")]
    GalleryParse(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("写出错误：{0}")]
    Write(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl ImageError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSource(_) => "E_INVALID_SOURCE",
            Self::MissingParameter(_) => "E_MISSING_PARAMETER",
            Self::InvalidParameter(_) => "E_INVALID_PARAMETER",
            Self::UnsupportedDepth(_) => "E_UNSUPPORTED_DEPTH",
            Self::FileSystem(_) => "E_IO",
            Self::Decode(_) => "E_DECODE",
            Self::Network(_) => "E_NETWORK",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::GalleryFetch(_) => "E_GALLERY_FETCH",
            Self::GalleryParse(_) => "E_GALLERY_PARSE",
            Self::Encode(_) => "E_ENCODE",
            Self::Write(_) => "E_WRITE",
            Self::ResourceLimit(_) => "E_RESOURCE_LIMIT",
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidSource(_)
            | Self::MissingParameter(_)
            | Self::InvalidParameter(_) => "resolve",
            Self::FileSystem(_)
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::GalleryFetch(_)
            | Self::GalleryParse(_)
            | Self::ResourceLimit(_) => "load",
            Self::Decode(_) => "decode",
            Self::UnsupportedDepth(_) | Self::Encode(_) => "encode",
            Self::Write(_) => "write",
        }
    }

    /// 请求边界上的状态码映射。
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidSource(_)
            | Self::MissingParameter(_)
            | Self::InvalidParameter(_)
            | Self::UnsupportedDepth(_) => StatusCode::BAD_REQUEST,
            Self::FileSystem(_) => StatusCode::NOT_FOUND,
            Self::ResourceLimit(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Network(_) | Self::GalleryFetch(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Decode(_) | Self::Encode(_) | Self::GalleryParse(_) | Self::Write(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_bad_request() {
        for err in [
            ImageError::InvalidSource("ftp".into()),
            ImageError::MissingParameter("img".into()),
            ImageError::InvalidParameter("bits".into()),
            ImageError::UnsupportedDepth(24),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{}", err.code());
        }
    }

    #[test]
    fn upstream_errors_map_to_gateway_statuses() {
        assert_eq!(ImageError::Network("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ImageError::GalleryFetch("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ImageError::Timeout("x".into()).status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn internal_errors_map_to_server_error() {
        for err in [
            ImageError::Decode("x".into()),
            ImageError::Encode("x".into()),
            ImageError::GalleryParse("x".into()),
            ImageError::Write("x".into()),
        ] {
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", err.code());
        }
    }

    #[test]
    fn unsupported_depth_message_names_the_depth() {
        let message = ImageError::UnsupportedDepth(24).to_string();
        assert!(message.contains("24"));
        assert_eq!(ImageError::UnsupportedDepth(24).stage(), "encode");
    }
}
