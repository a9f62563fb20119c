//! # 解码与归一化流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → 固定画布”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素上限快速拒绝
//! 3. 完整解码
//! 4. 超出 240×320 时先居中裁剪到目标宽高比，再缩放到画布（不放大小图）
//! 5. 按输出容器决定是否垂直翻转

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use std::io::Cursor;

use super::config::ResizeFilter;
use super::encoder::truncate_to_rgba8;
use super::source::RawImageData;
use super::{ImageConfig, ImageError, ImageHandler};

/// 设备画布宽度。
pub const CANVAS_WIDTH: u32 = 240;
/// 设备画布高度。
pub const CANVAS_HEIGHT: u32 = 320;

impl ImageHandler {
    /// 将原始字节解码为图像。
    pub(crate) fn decode_image(
        raw: RawImageData,
        config: &ImageConfig,
    ) -> Result<DynamicImage, ImageError> {
        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

        let (width, height) = decoded.dimensions();
        Self::validate_pixel_limits(config, width, height)?;

        log::info!(
            "✅ 图片解码成功 - 来源: {} 尺寸: {}x{}",
            raw.source_hint,
            width,
            height
        );

        Ok(decoded)
    }

    /// 归一化到设备画布。
    ///
    /// 宽高均不超过画布时原样返回；否则输出恰好为 240×320。
    pub(crate) fn normalize_for_canvas(
        image: DynamicImage,
        filter: ResizeFilter,
        flip_vertical: bool,
    ) -> DynamicImage {
        let (width, height) = image.dimensions();

        let fitted = if width > CANVAS_WIDTH || height > CANVAS_HEIGHT {
            let (left, top, crop_width, crop_height) = Self::center_crop_region(width, height);
            let cropped = image.crop_imm(left, top, crop_width, crop_height);

            log::info!(
                "🧩 画布归一化：{}x{} -> 裁剪 {}x{}@({},{}) -> {}x{}（filter={}）",
                width,
                height,
                crop_width,
                crop_height,
                left,
                top,
                CANVAS_WIDTH,
                CANVAS_HEIGHT,
                filter.as_str()
            );

            match Self::resize_with_fast_image_resize(&cropped, CANVAS_WIDTH, CANVAS_HEIGHT, filter) {
                Ok(resized) => resized,
                Err(err) => {
                    log::warn!(
                        "⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}",
                        err
                    );
                    cropped.resize_exact(CANVAS_WIDTH, CANVAS_HEIGHT, filter.to_image_filter())
                }
            }
        } else {
            image
        };

        if flip_vertical {
            fitted.flipv()
        } else {
            fitted
        }
    }

    /// 计算居中裁剪区域，使裁剪后宽高比与画布一致。
    ///
    /// 返回 `(left, top, width, height)`。
    pub(crate) fn center_crop_region(width: u32, height: u32) -> (u32, u32, u32, u32) {
        let (w, h) = (width as u64, height as u64);
        let (cw, ch) = (CANVAS_WIDTH as u64, CANVAS_HEIGHT as u64);

        let (crop_width, crop_height) = if w * ch > h * cw {
            // 过宽：保留全部高度，裁左右
            let target = ((h * cw + ch / 2) / ch).clamp(1, w);
            (target, h)
        } else {
            // 过高：保留全部宽度，裁上下
            let target = ((w * ch + cw / 2) / cw).clamp(1, h);
            (w, target)
        };

        let left = (w - crop_width) / 2;
        let top = (h - crop_height) / 2;
        (left as u32, top as u32, crop_width as u32, crop_height as u32)
    }

    /// 仅通过内存中的图片头信息读取宽高。
    ///
    /// 用于在完整解码前做像素限制检查。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ImageError::Decode(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(
        config: &ImageConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ImageError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > config.max_decoded_pixels {
            return Err(ImageError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: ResizeFilter,
    ) -> Result<DynamicImage, ImageError> {
        let src = truncate_to_rgba8(image);
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ImageError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(filter.to_fast_filter()));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| ImageError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }
}
