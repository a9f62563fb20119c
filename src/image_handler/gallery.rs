//! # 图库分页来源
//!
//! ## 设计思路
//!
//! 图库列表与游标是整个服务唯一的共享可变状态，由 `GalleryFeed` 显式持有，
//! 随 `ImageHandler` 创建、随服务进程销毁，不再使用全局变量。
//!
//! ## 实现思路
//!
//! - `GalleryCache`：列表 + 游标，保证 `0 <= cursor <= len`，`cursor == len` 即耗尽。
//! - `GalleryFeed::next_item`：在异步互斥锁内完成“检查耗尽 → 必要时同步重新拉取 → 取当前项并前移游标”，
//!   保证并发请求不会拿到同一下标，也不会同时替换列表。
//! - 图片本身的下载在释放锁之后进行，不阻塞其他请求取号。

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use tokio::sync::Mutex;

use super::{ImageConfig, ImageError, ImageHandler};

/// 图库条目。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GalleryItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub animated: bool,
    pub link: String,
}

#[derive(Debug, Deserialize)]
struct GalleryListing {
    data: Vec<GalleryItem>,
}

/// 解析图库接口响应体 `{data:[...]}`。
pub fn parse_gallery_listing(body: &[u8]) -> Result<Vec<GalleryItem>, ImageError> {
    serde_json::from_slice::<GalleryListing>(body)
        .map(|listing| listing.data)
        .map_err(|e| ImageError::GalleryParse(format!("JSON 解析失败：{}", e)))
}

/// 图库列表与游标。
#[derive(Debug, Default)]
pub struct GalleryCache {
    items: Vec<GalleryItem>,
    cursor: usize,
}

impl GalleryCache {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 空列表同样视为耗尽。
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.items.len()
    }

    /// 替换列表并重置游标。
    pub fn replace(&mut self, items: Vec<GalleryItem>) {
        self.items = items;
        self.cursor = 0;
    }

    /// 取出当前项并前移游标；已耗尽时返回 `None`，游标不越界。
    pub fn take_next(&mut self) -> Option<GalleryItem> {
        let item = self.items.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(item)
    }
}

/// 图库分页取号器。
#[derive(Debug, Default)]
pub struct GalleryFeed {
    cache: Mutex<GalleryCache>,
    refresh_count: AtomicU64,
}

impl GalleryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计拉取列表次数（用于日志与测试）。
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// 当前 `(cursor, len)` 快照。
    pub async fn position(&self) -> (usize, usize) {
        let cache = self.cache.lock().await;
        (cache.cursor(), cache.len())
    }

    /// 取下一条目。
    ///
    /// 缓存为空或已耗尽时，先在锁内调用 `fetch` 同步拉取一次新列表。
    /// 拉取失败或返回空列表时缓存保持原状，下一次请求会重新拉取。
    pub async fn next_item<F, Fut>(&self, fetch: F) -> Result<GalleryItem, ImageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<GalleryItem>, ImageError>>,
    {
        let mut cache = self.cache.lock().await;

        if cache.is_exhausted() {
            let items = fetch().await?;
            if items.is_empty() {
                return Err(ImageError::GalleryFetch("图库返回空列表".to_string()));
            }

            let generation = self.refresh_count.fetch_add(1, Ordering::SeqCst) + 1;
            log::info!("🖼️ 图库列表已刷新 - 第 {} 次，共 {} 项", generation, items.len());
            cache.replace(items);
        }

        let position = cache.cursor();
        let item = cache
            .take_next()
            .ok_or_else(|| ImageError::GalleryFetch("图库游标越界".to_string()))?;

        log::debug!("🖼️ 图库取号 - {}/{} id={}", position + 1, cache.len(), item.id);
        Ok(item)
    }
}

impl ImageHandler {
    /// 请求图库接口并解析条目列表。
    pub(super) async fn fetch_gallery_listing(
        config: &ImageConfig,
    ) -> Result<Vec<GalleryItem>, ImageError> {
        let endpoint = config
            .gallery_endpoint
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ImageError::GalleryFetch("未配置图库接口地址".to_string()))?;
        let client_id = config
            .gallery_client_id
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ImageError::GalleryFetch("未配置图库接口凭据".to_string()))?;

        log::info!("🌐 拉取图库列表 - {}", Self::redact_url_for_log(endpoint));

        let client = Self::build_http_client(config)?;
        let mut response = client
            .get(endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Client-ID {}", client_id))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ImageError::Timeout(format!("图库请求超时（{}秒）", config.download_timeout))
                } else {
                    ImageError::GalleryFetch(format!("请求失败：{}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::GalleryFetch(format!("HTTP {}", status.as_u16())));
        }

        if let Some(size) = response.content_length() {
            if size > config.max_file_size {
                return Err(ImageError::ResourceLimit(format!("图库响应过大：{} 字节", size)));
            }
        }

        // 分块响应没有 Content-Length，读取过程中按累计字节数限流
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                ImageError::Timeout(format!("图库响应读取超时（{}秒）", config.download_timeout))
            } else {
                ImageError::GalleryFetch(format!("读取响应失败：{}", e))
            }
        })? {
            if (body.len() + chunk.len()) as u64 > config.max_file_size {
                return Err(ImageError::ResourceLimit(format!(
                    "图库响应过大：超过 {} 字节",
                    config.max_file_size
                )));
            }
            body.extend_from_slice(&chunk);
        }

        parse_gallery_listing(&body)
    }
}
