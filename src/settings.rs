//! # 网关设置
//!
//! 启动时从可选 JSON 文件读取设置，再用环境变量覆盖图库相关项，
//! 最终合并到 `ImageConfig` 默认值之上。缺省字段沿用默认值。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::image_handler::{ImageConfig, ResizeFilter};

pub const ENV_GALLERY_ENDPOINT: &str = "GALLERY_ENDPOINT";
pub const ENV_GALLERY_CLIENT_ID: &str = "GALLERY_CLIENT_ID";

/// 设置文件内容，全部字段可选。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub max_file_size: Option<u64>,
    pub download_timeout: Option<u64>,
    pub connect_timeout: Option<u64>,
    pub stream_first_byte_timeout_ms: Option<u64>,
    pub stream_chunk_timeout_ms: Option<u64>,
    pub max_redirects: Option<usize>,
    pub allow_private_network: Option<bool>,
    pub resolve_dns_for_url_safety: Option<bool>,
    pub max_decoded_pixels: Option<u64>,
    pub resize_filter: Option<String>,
    pub local_root: Option<PathBuf>,
    pub gallery_endpoint: Option<String>,
    pub gallery_client_id: Option<String>,
}

impl GatewaySettings {
    /// 读取设置文件；未指定路径时返回空设置。
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("读取设置文件失败 {}: {}", path.display(), e))
        })?;
        let parsed = Self::from_json(&content)?;
        log::info!("⚙️ 已加载设置文件: {}", path.display());
        Ok(parsed)
    }

    pub fn from_json(content: &str) -> Result<Self, AppError> {
        serde_json::from_str(content)
            .map_err(|e| AppError::Config(format!("解析设置文件失败: {}", e)))
    }

    /// 用进程环境变量覆盖图库配置。
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// 用任意键值来源覆盖图库配置；空值视为未设置。
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(endpoint) = non_empty(ENV_GALLERY_ENDPOINT) {
            self.gallery_endpoint = Some(endpoint);
        }
        if let Some(client_id) = non_empty(ENV_GALLERY_CLIENT_ID) {
            self.gallery_client_id = Some(client_id);
        }
        self
    }

    /// 合并到默认配置并校验。
    pub fn into_image_config(self) -> Result<ImageConfig, AppError> {
        let mut config = ImageConfig::default();

        if let Some(value) = self.max_file_size {
            config.max_file_size = value;
        }
        if let Some(value) = self.download_timeout {
            config.download_timeout = value;
        }
        if let Some(value) = self.connect_timeout {
            config.connect_timeout = value;
        }
        if let Some(value) = self.stream_first_byte_timeout_ms {
            config.stream_first_byte_timeout_ms = value;
        }
        if let Some(value) = self.stream_chunk_timeout_ms {
            config.stream_chunk_timeout_ms = value;
        }
        if let Some(value) = self.max_redirects {
            config.max_redirects = value;
        }
        if let Some(value) = self.allow_private_network {
            config.allow_private_network = value;
        }
        if let Some(value) = self.resolve_dns_for_url_safety {
            config.resolve_dns_for_url_safety = value;
        }
        if let Some(value) = self.max_decoded_pixels {
            config.max_decoded_pixels = value;
        }
        if let Some(name) = self.resize_filter.as_deref() {
            config.resize_filter = ResizeFilter::from_str(name)
                .map_err(|e| AppError::Config(e.to_string()))?;
        }
        config.local_root = self.local_root;
        config.gallery_endpoint = self.gallery_endpoint;
        config.gallery_client_id = self.gallery_client_id;

        config
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }
}
