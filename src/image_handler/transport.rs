//! # 传输封装模块
//!
//! 原始帧以标准 Base64 文本发送（`text/plain`），BMP 以二进制发送（`image/bmp`）。
//! 响应体长度必须与实际写出的字节数一致，因此长度始终取自最终 `Bytes`。

use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use super::ImageError;
use super::encoder::EncodedPayload;

pub const CONTENT_TYPE_BITMAP: &str = "image/bmp";
pub const CONTENT_TYPE_FRAME: &str = "text/plain";

/// 已完成传输封装、可直接写出的响应体。
#[derive(Debug, Clone)]
pub struct WrappedBody {
    pub content_type: &'static str,
    pub body: Bytes,
}

impl WrappedBody {
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// 构建带显式 `Content-Type` / `Content-Length` 的 200 响应。
    pub fn into_response(self) -> Result<Response<Body>, ImageError> {
        let length = self.content_length();
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, self.content_type)
            .header(header::CONTENT_LENGTH, length)
            .body(Body::from(self.body))
            .map_err(|e| ImageError::Write(format!("构建响应失败：{}", e)))
    }
}

/// 按编码结果选择传输形式。
pub fn wrap(payload: EncodedPayload) -> WrappedBody {
    match payload {
        EncodedPayload::Bitmap(bytes) => WrappedBody {
            content_type: CONTENT_TYPE_BITMAP,
            body: Bytes::from(bytes),
        },
        EncodedPayload::Frame(frame) => WrappedBody {
            content_type: CONTENT_TYPE_FRAME,
            body: Bytes::from(general_purpose::STANDARD.encode(frame.as_bytes())),
        },
    }
}
