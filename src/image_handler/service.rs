//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `ImageServiceState` 作为 axum 共享状态，替代全局单例函数。
//! 好处：
//! 1. 生命周期清晰（由 `main.rs` 统一管理）
//! 2. 测试可创建独立实例，图库游标互不干扰
//!
//! ## 实现思路
//!
//! 对外仅暴露少量稳定 API：
//! - `serve`：参数解析 → 完整处理链路 → 传输封装
//! - `serve_test_pattern`：生成固定测试图
//! - `gallery_position`：读取图库游标快照

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::transport::{self, WrappedBody};
use super::{ImageConfig, ImageError, ImageHandler, RequestParameters};

/// 图片服务状态。
///
/// 以 `Arc<ImageServiceState>` 形式注入路由层，内部持有 `ImageHandler`。
pub struct ImageServiceState {
    handler: ImageHandler,
    request_seq: AtomicU64,
}

impl ImageServiceState {
    /// 使用默认配置创建服务状态。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use pixel_gateway::image_handler::ImageServiceState;
    ///
    /// let service = ImageServiceState::new()?;
    /// # Ok::<(), pixel_gateway::image_handler::ImageError>(())
    /// ```
    pub fn new() -> Result<Self, ImageError> {
        Self::with_config(ImageConfig::default())
    }

    /// 使用自定义配置创建服务状态。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use pixel_gateway::image_handler::{ImageConfig, ImageServiceState};
    ///
    /// let mut config = ImageConfig::default();
    /// config.allow_private_network = true;
    /// let service = ImageServiceState::with_config(config)?;
    /// # Ok::<(), pixel_gateway::image_handler::ImageError>(())
    /// ```
    pub fn with_config(config: ImageConfig) -> Result<Self, ImageError> {
        let handler = ImageHandler::new(config)?;
        Ok(Self {
            handler,
            request_seq: AtomicU64::new(0),
        })
    }

    /// 处理一次图片请求。
    ///
    /// `kind` 为来源类型（`local` / `http` / `gallery` 及别名），其余参数取自查询串。
    pub async fn serve(
        &self,
        kind: Option<&str>,
        query: &HashMap<String, String>,
    ) -> Result<WrappedBody, ImageError> {
        let request_id = self.request_seq.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("📥 请求 #{} - kind={:?} query={:?}", request_id, kind, query);

        let params = match RequestParameters::from_query(kind, query) {
            Ok(params) => params,
            Err(err) => {
                log::warn!("⚠️ 请求 #{} 参数无效：{}", request_id, err);
                return Err(err);
            }
        };

        let payload = self.handler.process(params).await.inspect_err(|err| {
            log::warn!(
                "❌ 请求 #{} 失败 - code={} stage={}：{}",
                request_id,
                err.code(),
                err.stage(),
                err
            );
        })?;

        let wrapped = transport::wrap(payload);
        log::info!(
            "📤 请求 #{} 完成 - {} {} 字节",
            request_id,
            wrapped.content_type,
            wrapped.content_length()
        );
        Ok(wrapped)
    }

    /// 生成测试图并按原始帧封装。
    pub fn serve_test_pattern(&self) -> Result<WrappedBody, ImageError> {
        self.handler.render_test_pattern().map(transport::wrap)
    }

    /// 图库游标 `(cursor, len)` 快照。
    pub async fn gallery_position(&self) -> (usize, usize) {
        self.handler.gallery().position().await
    }

    /// 图库列表累计拉取次数。
    pub fn gallery_refresh_count(&self) -> u64 {
        self.handler.gallery().refresh_count()
    }
}
