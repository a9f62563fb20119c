//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排与配置管理，不直接与 HTTP 框架绑定。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 按来源加载原始字节（本地 / URL / 图库）
//! 3. 解码并归一化到 240×320 画布
//! 4. 按输出容器编码
//!
//! ## 实现思路
//!
//! - 配置在启动时校验后只读持有，每次请求克隆一份快照，移交给阻塞任务。
//! - 图库游标由 `GalleryFeed` 持有，整个处理器共享一份。
//! - 解码/缩放/编码是 CPU 密集操作，放到 `spawn_blocking` 中执行，不占用异步工作线程。
//! - 记录 `load/decode/normalize/encode/total` 阶段耗时，便于性能诊断。

use std::time::Instant;

use image::{DynamicImage, ImageBuffer, Rgba};

use super::encoder::{self, EncodedPayload};
use super::gallery::GalleryFeed;
use super::pipeline::{CANVAS_HEIGHT, CANVAS_WIDTH};
use super::source::{OutputContainer, RawImageData, RequestParameters};
use super::{ImageConfig, ImageError, ImageSource};

/// 测试图固定使用的色深。
const TEST_PATTERN_DEPTH: u16 = 18;

/// 图片处理器。
///
/// 封装了配置状态与图库游标，并编排各子模块实现完整流程。
pub struct ImageHandler {
    config: ImageConfig,
    pub(super) gallery: GalleryFeed,
}

impl ImageHandler {
    /// 根据初始配置创建处理器。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use pixel_gateway::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default())?;
    /// # Ok::<(), pixel_gateway::image_handler::ImageError>(())
    /// ```
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        config.validate()?;
        Ok(Self {
            config,
            gallery: GalleryFeed::new(),
        })
    }

    /// 获取配置快照（解码阶段需要跨线程持有所有权）。
    pub(super) fn config_snapshot(&self) -> ImageConfig {
        self.config.clone()
    }

    /// 图库取号器（只读视图）。
    pub fn gallery(&self) -> &GalleryFeed {
        &self.gallery
    }

    /// 处理主入口：加载 → 解码 → 归一化 → 编码。
    pub async fn process(&self, params: RequestParameters) -> Result<EncodedPayload, ImageError> {
        let config = self.config_snapshot();
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = self.acquire(&params.source, &config).await?;
        let load_elapsed = load_start.elapsed();

        let container = params.container;
        let bits = params.bits;
        let (payload, decode_ms, normalize_ms, encode_ms) =
            tokio::task::spawn_blocking(move || -> Result<_, ImageError> {
                let decode_start = Instant::now();
                let decoded = Self::decode_image(raw, &config)?;
                let decode_ms = decode_start.elapsed().as_millis();

                let normalize_start = Instant::now();
                let normalized = Self::normalize_for_canvas(
                    decoded,
                    config.resize_filter,
                    container.needs_vertical_flip(),
                );
                let normalize_ms = normalize_start.elapsed().as_millis();

                let encode_start = Instant::now();
                let payload = Self::encode_payload(&normalized, container, bits)?;
                let encode_ms = encode_start.elapsed().as_millis();

                Ok((payload, decode_ms, normalize_ms, encode_ms))
            })
            .await
            .map_err(|e| ImageError::Encode(format!("图片处理任务异常终止：{}", e)))??;

        log::info!(
            "✅ 图片处理完成 - source={:?} container={:?} load={}ms decode={}ms normalize={}ms encode={}ms total={}ms",
            params.source.kind(),
            container,
            load_elapsed.as_millis(),
            decode_ms,
            normalize_ms,
            encode_ms,
            total_start.elapsed().as_millis()
        );

        Ok(payload)
    }

    /// 按来源加载原始字节。
    async fn acquire(
        &self,
        source: &ImageSource,
        config: &ImageConfig,
    ) -> Result<RawImageData, ImageError> {
        match source {
            ImageSource::FilePath(path) => self.load_from_file(path, config).await,
            ImageSource::Url(url) => self.load_from_url(url, config).await,
            ImageSource::Gallery => {
                let item = self
                    .gallery
                    .next_item(|| Self::fetch_gallery_listing(config))
                    .await?;
                log::info!(
                    "🖼️ 图库条目 - id={} title={} animated={}",
                    item.id,
                    item.title.as_deref().unwrap_or("-"),
                    item.animated
                );
                self.load_from_url(&item.link, config).await
            }
        }
    }

    pub(super) fn encode_payload(
        image: &DynamicImage,
        container: OutputContainer,
        bits: u16,
    ) -> Result<EncodedPayload, ImageError> {
        match container {
            OutputContainer::Bitmap => encoder::encode_bitmap(image).map(EncodedPayload::Bitmap),
            OutputContainer::RawFrame => {
                encoder::encode_raw_frame(image, bits).map(EncodedPayload::Frame)
            }
        }
    }

    /// 生成 240×320 红色渐变测试图：`red = (x * 254) / 240`，绿/蓝为 0。
    pub fn generate_test_pattern() -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_fn(CANVAS_WIDTH, CANVAS_HEIGHT, |x, _| {
            Rgba([((x * 254) / CANVAS_WIDTH) as u8, 0x00, 0x00, 0xFF])
        }))
    }

    /// 测试图始终以 18 位原始帧输出。
    pub fn render_test_pattern(&self) -> Result<EncodedPayload, ImageError> {
        let pattern = Self::generate_test_pattern();
        Self::encode_payload(&pattern, OutputContainer::RawFrame, TEST_PATTERN_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::encoder::{FRAME_HEADER_LEN, FrameHeader};
    use image::{GenericImageView, ImageFormat};
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn write_png(tag: &str, width: u32, height: u32) -> PathBuf {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!("pixel-gateway-{}-{}.png", tag, nanos));
        std::fs::write(&path, cursor.into_inner()).expect("write temp png failed");
        path
    }

    fn local_params(path: &PathBuf, container: OutputContainer, bits: u16) -> RequestParameters {
        RequestParameters {
            source: ImageSource::FilePath(path.to_string_lossy().into_owned()),
            container,
            bits,
        }
    }

    #[tokio::test]
    async fn local_raw16_frame_keeps_small_image_size() {
        let path = write_png("raw16", 100, 100);
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let payload = handler
            .process(local_params(&path, OutputContainer::RawFrame, 16))
            .await
            .expect("pipeline should succeed");

        let EncodedPayload::Frame(frame) = payload else {
            panic!("expected raw frame");
        };
        assert_eq!(
            frame.header(),
            FrameHeader { width: 100, height: 100, depth: 16 }
        );
        assert_eq!(frame.payload().len(), 100 * 100 * 2);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn large_local_image_is_filled_to_canvas() {
        let path = write_png("large", 1024, 768);
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let payload = handler
            .process(local_params(&path, OutputContainer::RawFrame, 18))
            .await
            .expect("pipeline should succeed");

        let EncodedPayload::Frame(frame) = payload else {
            panic!("expected raw frame");
        };
        assert_eq!((frame.width(), frame.height()), (240, 320));
        assert_eq!(frame.as_bytes().len(), FRAME_HEADER_LEN + 240 * 320 * 3);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn bitmap_output_is_vertically_flipped() {
        let path = write_png("bmp", 8, 6);
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");

        let payload = handler
            .process(local_params(&path, OutputContainer::Bitmap, 18))
            .await
            .expect("pipeline should succeed");

        let EncodedPayload::Bitmap(bytes) = payload else {
            panic!("expected bitmap");
        };
        let decoded = image::load_from_memory(&bytes).expect("bmp should decode").to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 6));

        // 第 0 行应为源图最后一行：G 通道 = y % 255
        assert_eq!(decoded.get_pixel(0, 0)[1], 5);
        assert_eq!(decoded.get_pixel(0, 5)[1], 0);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_file_surfaces_io_error() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let result = handler
            .process(RequestParameters {
                source: ImageSource::FilePath("/no/such/test.png".into()),
                container: OutputContainer::RawFrame,
                bits: 16,
            })
            .await;

        assert!(matches!(result, Err(ImageError::FileSystem(_))));
    }

    #[tokio::test]
    async fn gallery_without_configuration_fails_and_keeps_cursor() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let result = handler
            .process(RequestParameters {
                source: ImageSource::Gallery,
                container: OutputContainer::Bitmap,
                bits: 18,
            })
            .await;

        assert!(matches!(result, Err(ImageError::GalleryFetch(_))));
        assert_eq!(handler.gallery().position().await, (0, 0));
    }

    #[test]
    fn test_pattern_is_a_red_gradient() {
        let pattern = ImageHandler::generate_test_pattern();
        assert_eq!(pattern.dimensions(), (240, 320));

        let rgba = pattern.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(rgba.get_pixel(239, 319).0, [((239 * 254) / 240) as u8, 0, 0, 255]);
    }

    #[test]
    fn rendered_test_pattern_is_raw_18_bit() {
        let handler = ImageHandler::new(ImageConfig::default()).expect("handler init failed");
        let EncodedPayload::Frame(frame) = handler.render_test_pattern().expect("render") else {
            panic!("expected raw frame");
        };

        assert_eq!(&frame.as_bytes()[..6], &[0x00, 0xF0, 0x01, 0x40, 0x00, 0x12]);
        assert_eq!(frame.payload().len(), 240 * 320 * 3);
        assert_eq!(frame.payload()[0], 0);
        assert_eq!(frame.payload()[239 * 3], ((239 * 254) / 240) as u8);
    }

    #[test]
    fn config_snapshot_reflects_validated_startup_config() {
        let mut config = ImageConfig::default();
        config.max_file_size = 1234;
        config.gallery_client_id = Some("abc".into());

        let handler = ImageHandler::new(config).expect("handler init failed");
        let snapshot = handler.config_snapshot();
        assert_eq!(snapshot.max_file_size, 1234);
        assert_eq!(snapshot.gallery_client_id.as_deref(), Some("abc"));
    }

    #[test]
    fn handler_rejects_invalid_configuration() {
        let mut config = ImageConfig::default();
        config.download_timeout = 0;
        assert!(matches!(
            ImageHandler::new(config),
            Err(ImageError::InvalidParameter(_))
        ));
    }
}
