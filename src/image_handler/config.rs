//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ImageConfig`，保证运行时行为可观测、可调整、可测试。
//! 图库地址与凭据同样属于配置，不在代码中以字面量出现。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的保守配置（网络调用全部有上限）。
//! - `ResizeFilter` 负责滤镜名称解析与反向输出，并映射到 `fast_image_resize`。
//! - `validate` 在启动阶段拒绝明显错误的参数组合。

use std::path::PathBuf;

use fast_image_resize as fr;
use image::imageops::FilterType;

use super::ImageError;

/// 图片处理配置。
///
/// 字段覆盖了下载、本地读取、解码与缩放四个阶段，以及图库接入参数。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 下载/读取原始字节时允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 单次网络请求总超时时间（秒）。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 下载首包超时时间（毫秒）。
    pub stream_first_byte_timeout_ms: u64,
    /// 下载分块读取超时时间（毫秒）。
    pub stream_chunk_timeout_ms: u64,
    /// 最大重定向次数，避免无限跳转或恶意链路。
    pub max_redirects: usize,
    /// 是否允许访问内网或本地地址（默认关闭，防 SSRF）。
    pub allow_private_network: bool,
    /// 是否对域名执行 DNS 解析后再做内网 IP 拦截。
    pub resolve_dns_for_url_safety: bool,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 缩放滤镜。
    pub resize_filter: ResizeFilter,
    /// 本地文件根目录；设置后本地来源只能读取该目录内的文件。
    pub local_root: Option<PathBuf>,
    /// 图库接口地址。
    pub gallery_endpoint: Option<String>,
    /// 图库接口凭据（`Authorization: Client-ID <id>`）。
    pub gallery_client_id: Option<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: 20 * 1024 * 1024,
            download_timeout: 30,
            connect_timeout: 8,
            stream_first_byte_timeout_ms: 10_000,
            stream_chunk_timeout_ms: 15_000,
            max_redirects: 5,
            allow_private_network: false,
            resolve_dns_for_url_safety: true,
            max_decoded_pixels: 40_000_000,
            resize_filter: ResizeFilter::Lanczos3,
            local_root: None,
            gallery_endpoint: None,
            gallery_client_id: None,
        }
    }
}

impl ImageConfig {
    /// 启动阶段的参数校验。
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.max_file_size == 0 {
            return Err(ImageError::InvalidParameter("max_file_size 不能为 0".to_string()));
        }
        if !(1..=300).contains(&self.download_timeout) {
            return Err(ImageError::InvalidParameter(
                "download_timeout 必须在 1~300 秒之间".to_string(),
            ));
        }
        if !(1..=120).contains(&self.connect_timeout) {
            return Err(ImageError::InvalidParameter(
                "connect_timeout 必须在 1~120 秒之间".to_string(),
            ));
        }
        if !(500..=120_000).contains(&self.stream_first_byte_timeout_ms) {
            return Err(ImageError::InvalidParameter(
                "stream_first_byte_timeout_ms 必须在 500~120000 毫秒之间".to_string(),
            ));
        }
        if !(500..=120_000).contains(&self.stream_chunk_timeout_ms) {
            return Err(ImageError::InvalidParameter(
                "stream_chunk_timeout_ms 必须在 500~120000 毫秒之间".to_string(),
            ));
        }
        if self.max_decoded_pixels == 0 {
            return Err(ImageError::InvalidParameter("max_decoded_pixels 不能为 0".to_string()));
        }
        Ok(())
    }
}

/// 缩放滤镜（面向配置文件的语义名称）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    /// 从外部字符串解析滤镜。
    ///
    /// # 示例
    /// ```rust
    /// use pixel_gateway::image_handler::ResizeFilter;
    ///
    /// let filter = ResizeFilter::from_str("lanczos3")?;
    /// assert_eq!(filter.as_str(), "lanczos3");
    /// # Ok::<(), pixel_gateway::image_handler::ImageError>(())
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Result<Self, ImageError> {
        match name.trim().to_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "bilinear" | "triangle" => Ok(Self::Bilinear),
            "catmullrom" | "catmull-rom" => Ok(Self::CatmullRom),
            "lanczos3" | "lanczos" => Ok(Self::Lanczos3),
            other => Err(ImageError::InvalidParameter(format!(
                "未知缩放滤镜：{}（可选：nearest / bilinear / catmullrom / lanczos3）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::CatmullRom => "catmullrom",
            Self::Lanczos3 => "lanczos3",
        }
    }

    pub(crate) fn to_fast_filter(self) -> fr::FilterType {
        match self {
            Self::Nearest => fr::FilterType::Box,
            Self::Bilinear => fr::FilterType::Bilinear,
            Self::CatmullRom => fr::FilterType::CatmullRom,
            Self::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }

    /// `fast_image_resize` 失败时回退 `image` 自带缩放所用的滤镜。
    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}
