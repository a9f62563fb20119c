//! # 像素编码模块
//!
//! ## 设计思路
//!
//! 两种输出：
//! - 位图容器：标准 24 位 BMP 文件。
//! - 原始帧：6 字节大端头（宽、高、色深）+ 按行优先排列的逐像素数据。
//!
//! ## 通道位宽约定
//!
//! 所有通道先截断到 8 位（8 位源图原样保留，16 位样本取高 8 位，不做舍入），
//! 再按目标位宽取高位：
//! - 16 位：`(r >> 3) << 11 | (g >> 2) << 5 | (b >> 3)`，大端写出
//! - 18 位：直接写出 8 位 R、G、B，丢弃 alpha

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgba, RgbaImage};

use super::ImageError;

/// 原始帧头长度（字节）。
pub const FRAME_HEADER_LEN: usize = 6;

/// 受支持的色深。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// 16 位：5/6/5 打包为一个字。
    Rgb565,
    /// 18 位：每通道一个字节。
    Rgb666,
}

impl BitDepth {
    pub fn from_tag(tag: i64) -> Result<Self, ImageError> {
        match tag {
            16 => Ok(Self::Rgb565),
            18 => Ok(Self::Rgb666),
            other => Err(ImageError::UnsupportedDepth(other)),
        }
    }

    pub fn tag(self) -> u16 {
        match self {
            Self::Rgb565 => 16,
            Self::Rgb666 => 18,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb565 => 2,
            Self::Rgb666 => 3,
        }
    }
}

/// 原始帧头。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: u16,
    pub height: u16,
    pub depth: u16,
}

impl FrameHeader {
    pub fn to_bytes(self) -> [u8; FRAME_HEADER_LEN] {
        let [w0, w1] = self.width.to_be_bytes();
        let [h0, h1] = self.height.to_be_bytes();
        let [d0, d1] = self.depth.to_be_bytes();
        [w0, w1, h0, h1, d0, d1]
    }

    /// 从帧缓冲的前 6 字节读取帧头；不足 6 字节返回 `None`。
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..FRAME_HEADER_LEN)?;
        Some(Self {
            width: u16::from_be_bytes([header[0], header[1]]),
            height: u16::from_be_bytes([header[2], header[3]]),
            depth: u16::from_be_bytes([header[4], header[5]]),
        })
    }
}

/// 编码后的原始帧。
#[derive(Debug, Clone)]
pub struct PixelFrame {
    header: FrameHeader,
    /// 帧头 + 像素数据。
    data: Vec<u8>,
}

impl PixelFrame {
    pub fn header(&self) -> FrameHeader {
        self.header
    }

    pub fn width(&self) -> u16 {
        self.header.width
    }

    pub fn height(&self) -> u16 {
        self.header.height
    }

    pub fn depth(&self) -> u16 {
        self.header.depth
    }

    /// 完整帧缓冲（含帧头）。
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 帧头之后的像素数据。
    pub fn payload(&self) -> &[u8] {
        &self.data[FRAME_HEADER_LEN..]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// 编码阶段输出。
#[derive(Debug, Clone)]
pub enum EncodedPayload {
    /// 完整 BMP 文件字节。
    Bitmap(Vec<u8>),
    /// 原始帧。
    Frame(PixelFrame),
}

/// 按宽、高、色深计算完整帧长度（含帧头）。
pub fn frame_len(width: u16, height: u16, depth: BitDepth) -> usize {
    FRAME_HEADER_LEN + width as usize * height as usize * depth.bytes_per_pixel()
}

/// 将 8 位 RGB 打包为 RGB565。
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

/// 编码原始帧。
///
/// 色深不受支持返回 `UnsupportedDepth`；宽或高超过 65535 返回 `Encode`。
pub fn encode_raw_frame(image: &DynamicImage, bits: u16) -> Result<PixelFrame, ImageError> {
    let depth = BitDepth::from_tag(i64::from(bits))?;
    let (raw_width, raw_height) = image.dimensions();

    let width = u16::try_from(raw_width)
        .map_err(|_| ImageError::Encode(format!("宽度超出帧头上限：{}", raw_width)))?;
    let height = u16::try_from(raw_height)
        .map_err(|_| ImageError::Encode(format!("高度超出帧头上限：{}", raw_height)))?;

    let header = FrameHeader {
        width,
        height,
        depth: depth.tag(),
    };

    let rgba = truncate_to_rgba8(image);
    let mut data = Vec::with_capacity(frame_len(width, height, depth));
    data.extend_from_slice(&header.to_bytes());

    for pixel in rgba.pixels() {
        let [r, g, b, _] = pixel.0;
        match depth {
            BitDepth::Rgb565 => data.extend_from_slice(&pack_rgb565(r, g, b).to_be_bytes()),
            BitDepth::Rgb666 => data.extend_from_slice(&[r, g, b]),
        }
    }

    if data.len() != frame_len(width, height, depth) {
        return Err(ImageError::Encode("编码后帧长度异常".to_string()));
    }

    Ok(PixelFrame { header, data })
}

/// 将任意位深的图像降为 8 位 RGBA：8 位样本原样保留，更宽的样本取高 8 位（截断，不做舍入）。
pub(crate) fn truncate_to_rgba8(image: &DynamicImage) -> RgbaImage {
    let color = image.color();
    if color.bytes_per_pixel() == color.channel_count() {
        return image.to_rgba8();
    }

    let wide = image.to_rgba16();
    ImageBuffer::from_fn(wide.width(), wide.height(), |x, y| {
        let [r, g, b, a] = wide.get_pixel(x, y).0;
        Rgba([(r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8, (a >> 8) as u8])
    })
}

/// 编码为 24 位 BMP 文件。
pub fn encode_bitmap(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let rgb = DynamicImage::ImageRgba8(truncate_to_rgba8(image)).to_rgb8();
    let rgb = DynamicImage::ImageRgb8(rgb);
    let mut cursor = Cursor::new(Vec::new());
    rgb.write_to(&mut cursor, ImageFormat::Bmp)
        .map_err(|e| ImageError::Encode(format!("BMP 编码失败：{}", e)))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use proptest::prelude::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn header_is_big_endian_width_height_depth() {
        let frame = encode_raw_frame(&solid(240, 320, [0, 0, 0, 255]), 18)
            .expect("encode should succeed");

        assert_eq!(&frame.as_bytes()[..6], &[0x00, 0xF0, 0x01, 0x40, 0x00, 0x12]);
        assert_eq!(
            FrameHeader::parse(frame.as_bytes()),
            Some(FrameHeader { width: 240, height: 320, depth: 18 })
        );
    }

    #[test]
    fn payload_lengths_follow_depth() {
        let image = solid(100, 100, [10, 20, 30, 255]);

        let frame16 = encode_raw_frame(&image, 16).expect("16-bit encode should succeed");
        assert_eq!(frame16.payload().len(), 100 * 100 * 2);

        let frame18 = encode_raw_frame(&image, 18).expect("18-bit encode should succeed");
        assert_eq!(frame18.payload().len(), 100 * 100 * 3);
        assert_eq!(frame18.as_bytes().len(), FRAME_HEADER_LEN + 100 * 100 * 3);
    }

    #[test]
    fn rgb565_keeps_high_bits_of_each_channel() {
        assert_eq!(pack_rgb565(0xFF, 0xFF, 0xFF), 0xFFFF);
        assert_eq!(pack_rgb565(0, 0, 0), 0x0000);
        assert_eq!(pack_rgb565(0xFF, 0, 0), 0xF800);
        assert_eq!(pack_rgb565(0, 0xFF, 0), 0x07E0);
        assert_eq!(pack_rgb565(0, 0, 0xFF), 0x001F);
        // 低位被截断，不做四舍五入
        assert_eq!(pack_rgb565(0x07, 0x03, 0x07), 0x0000);
        assert_eq!(pack_rgb565(0x08, 0x04, 0x08), 0x0841);
    }

    #[test]
    fn rgb565_entries_are_written_big_endian() {
        let frame = encode_raw_frame(&solid(1, 1, [0xFF, 0, 0, 255]), 16)
            .expect("encode should succeed");
        assert_eq!(frame.payload(), &[0xF8, 0x00]);
    }

    #[test]
    fn rgb666_writes_channels_and_drops_alpha() {
        let frame = encode_raw_frame(&solid(2, 1, [0x12, 0x34, 0x56, 0x00]), 18)
            .expect("encode should succeed");
        assert_eq!(frame.payload(), &[0x12, 0x34, 0x56, 0x12, 0x34, 0x56]);
    }

    #[test]
    fn sixteen_bit_sources_are_reduced_before_packing() {
        let white = DynamicImage::ImageRgba16(ImageBuffer::from_pixel(
            1,
            1,
            Rgba([0xFFFF_u16, 0xFFFF, 0xFFFF, 0xFFFF]),
        ));
        let frame = encode_raw_frame(&white, 16).expect("encode should succeed");
        assert_eq!(frame.payload(), &[0xFF, 0xFF]);

        let frame = encode_raw_frame(&white, 18).expect("encode should succeed");
        assert_eq!(frame.payload(), &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn sixteen_bit_samples_are_truncated_not_rounded() {
        let source = DynamicImage::ImageRgba16(ImageBuffer::from_pixel(
            1,
            1,
            Rgba([0x00FF_u16, 0x80FF, 0x7FC0, 0xFFFF]),
        ));

        let frame = encode_raw_frame(&source, 18).expect("encode should succeed");
        assert_eq!(frame.payload(), &[0x00, 0x80, 0x7F]);

        let frame = encode_raw_frame(&source, 16).expect("encode should succeed");
        assert_eq!(frame.payload(), &pack_rgb565(0x00, 0x80, 0x7F).to_be_bytes());
        assert_eq!(frame.payload(), &[0x04, 0x0F]);
    }

    #[test]
    fn sixteen_bit_rgb_without_alpha_is_truncated_too() {
        let source = DynamicImage::ImageRgb16(ImageBuffer::from_pixel(
            1,
            1,
            image::Rgb([0x01FF_u16, 0xFE80, 0x0080]),
        ));

        let frame = encode_raw_frame(&source, 18).expect("encode should succeed");
        assert_eq!(frame.payload(), &[0x01, 0xFE, 0x00]);

        let bmp = encode_bitmap(&source).expect("bmp encode should succeed");
        let decoded = image::load_from_memory(&bmp).expect("bmp should decode").to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [0x01, 0xFE, 0x00]);
    }

    #[test]
    fn pixels_are_row_major_from_origin() {
        let image = DynamicImage::ImageRgba8(ImageBuffer::from_fn(2, 2, |x, y| {
            Rgba([(x + 2 * y) as u8, 0, 0, 255])
        }));
        let frame = encode_raw_frame(&image, 18).expect("encode should succeed");
        let reds: Vec<u8> = frame.payload().chunks(3).map(|px| px[0]).collect();
        assert_eq!(reds, vec![0, 1, 2, 3]);
    }

    #[test]
    fn unsupported_depth_is_rejected() {
        let result = encode_raw_frame(&solid(1, 1, [0, 0, 0, 255]), 24);
        assert!(matches!(result, Err(ImageError::UnsupportedDepth(24))));
    }

    #[test]
    fn oversized_width_is_an_encode_error() {
        let result = encode_raw_frame(&solid(65_536, 1, [0, 0, 0, 255]), 18);
        assert!(matches!(result, Err(ImageError::Encode(_))));
    }

    #[test]
    fn bitmap_container_is_a_bmp_file() {
        let bytes = encode_bitmap(&solid(3, 2, [1, 2, 3, 255])).expect("bmp encode should succeed");

        assert_eq!(&bytes[..2], b"BM");
        let width = i32::from_le_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]);
        let height = i32::from_le_bytes([bytes[22], bytes[23], bytes[24], bytes[25]]);
        assert_eq!(width, 3);
        assert_eq!(height.abs(), 2);

        let decoded = image::load_from_memory(&bytes).expect("bmp should decode");
        assert_eq!(decoded.dimensions(), (3, 2));
    }

    proptest! {
        #[test]
        fn frame_length_is_deterministic(width in 1u32..64, height in 1u32..64, sixteen in any::<bool>()) {
            let bits = if sixteen { 16 } else { 18 };
            let frame = encode_raw_frame(&solid(width, height, [7, 7, 7, 255]), bits).unwrap();
            let depth = BitDepth::from_tag(i64::from(bits)).unwrap();

            prop_assert_eq!(frame.as_bytes().len(), frame_len(width as u16, height as u16, depth));
            prop_assert_eq!(
                FrameHeader::parse(frame.as_bytes()),
                Some(FrameHeader { width: width as u16, height: height as u16, depth: bits })
            );
        }
    }
}
