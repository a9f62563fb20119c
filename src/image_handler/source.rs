//! # 数据源与请求参数
//!
//! ## 设计思路
//!
//! 将“外部输入语义”和“流水线中间结果”解耦：
//! - `SourceKind` / `ImageSource` 表示外部来源语义（解析阶段产物）
//! - `RequestParameters` 表示一次请求的完整参数
//! - `RawImageData` 表示已加载但未解码的字节
//!
//! ## 实现思路
//!
//! 所有查询参数都按“缺省 / 非法 / 合法”三态解析：
//! 只有缺省才使用默认值，非法值一律显式拒绝。
//! 解析阶段不触碰任何文件系统或网络资源。

use std::collections::HashMap;

use super::ImageError;
use super::encoder::BitDepth;

/// 未指定 `bits` 时使用的色深。
pub const DEFAULT_BIT_DEPTH: u16 = 18;

/// 请求声明的来源类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    Http,
    Gallery,
}

impl SourceKind {
    /// 解析来源类型；缺省或无法识别均返回 `InvalidSource`。
    pub fn parse(kind: Option<&str>) -> Result<Self, ImageError> {
        let Some(kind) = kind else {
            return Err(ImageError::InvalidSource("未声明来源类型".to_string()));
        };

        match kind.trim().to_ascii_lowercase().as_str() {
            "local" | "file" => Ok(Self::Local),
            "http" | "url" => Ok(Self::Http),
            "gallery" | "random" => Ok(Self::Gallery),
            other => Err(ImageError::InvalidSource(format!(
                "未知来源类型：{}（可选：local / http / gallery）",
                other
            ))),
        }
    }

    /// 查询参数中承载地址/路径的键（按优先级）。
    fn location_keys(self) -> &'static [&'static str] {
        match self {
            Self::Local => &["img", "path"],
            Self::Http => &["img", "url"],
            Self::Gallery => &[],
        }
    }
}

/// 图片输入来源（已解析）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// 本地文件路径来源。
    FilePath(String),
    /// 网络地址来源。
    Url(String),
    /// 图库分页来源。
    Gallery,
}

impl ImageSource {
    /// 由来源类型与可选地址组装来源。
    ///
    /// 除图库外都必须提供地址，否则返回 `MissingParameter`。
    pub fn resolve(kind: SourceKind, location: Option<String>) -> Result<Self, ImageError> {
        let location = location.filter(|value| !value.trim().is_empty());

        match (kind, location) {
            (SourceKind::Gallery, _) => Ok(Self::Gallery),
            (SourceKind::Local, Some(path)) => Ok(Self::FilePath(path)),
            (SourceKind::Http, Some(url)) => Ok(Self::Url(url)),
            (SourceKind::Local, None) => Err(ImageError::MissingParameter(
                "本地来源需要 img 或 path 参数".to_string(),
            )),
            (SourceKind::Http, None) => Err(ImageError::MissingParameter(
                "网络来源需要 img 或 url 参数".to_string(),
            )),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::FilePath(_) => SourceKind::Local,
            Self::Url(_) => SourceKind::Http,
            Self::Gallery => SourceKind::Gallery,
        }
    }
}

/// 输出容器。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContainer {
    /// 标准 BMP 文件，原样输出。
    Bitmap,
    /// 6 字节头 + 像素数据，Base64 输出。
    RawFrame,
}

impl OutputContainer {
    /// 缺省为 `Bitmap`；空串或未知值返回 `InvalidParameter`。
    pub fn parse(format: Option<&str>) -> Result<Self, ImageError> {
        let Some(format) = format else {
            return Ok(Self::Bitmap);
        };

        match format.trim().to_ascii_lowercase().as_str() {
            "bmp" => Ok(Self::Bitmap),
            "raw" => Ok(Self::RawFrame),
            other => Err(ImageError::InvalidParameter(format!(
                "未知输出格式：'{}'（可选：bmp / raw）",
                other
            ))),
        }
    }

    /// BMP 按自下而上的行序扫描，需要先做垂直翻转。
    pub fn needs_vertical_flip(self) -> bool {
        matches!(self, Self::Bitmap)
    }
}

/// 解析 `bits` 参数：缺省为 18，非数字或空串返回 `InvalidParameter`。
///
/// 任何十进制整数都视为合法输入，取值是否受支持由编码器判定（`UnsupportedDepth`）。
pub fn parse_bit_depth(bits: Option<&str>) -> Result<i64, ImageError> {
    let Some(bits) = bits else {
        return Ok(i64::from(DEFAULT_BIT_DEPTH));
    };

    bits.trim()
        .parse::<i64>()
        .map_err(|_| ImageError::InvalidParameter(format!("bits 不是有效整数：'{}'", bits)))
}

/// 一次请求的完整参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParameters {
    pub source: ImageSource,
    pub container: OutputContainer,
    pub bits: u16,
}

impl RequestParameters {
    /// 从查询参数解析。
    ///
    /// 校验顺序：来源类型 → 地址 → 输出格式 → 色深。
    /// 原始帧模式下的色深在此处即被校验，保证非法请求不会触发任何 I/O。
    pub fn from_query(
        kind: Option<&str>,
        query: &HashMap<String, String>,
    ) -> Result<Self, ImageError> {
        let kind = SourceKind::parse(kind)?;
        let location = kind
            .location_keys()
            .iter()
            .find_map(|key| query.get(*key).filter(|value| !value.trim().is_empty()))
            .cloned();
        let source = ImageSource::resolve(kind, location)?;

        let container = OutputContainer::parse(query.get("format").map(String::as_str))?;
        let requested = parse_bit_depth(query.get("bits").map(String::as_str))?;
        let bits = match container {
            OutputContainer::RawFrame => BitDepth::from_tag(requested)?.tag(),
            // 位图不使用色深，越界值不影响输出
            OutputContainer::Bitmap => u16::try_from(requested).unwrap_or(DEFAULT_BIT_DEPTH),
        };

        Ok(Self {
            source,
            container,
            bits,
        })
    }
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn source_kind_rejects_absent_and_unknown() {
        assert!(matches!(SourceKind::parse(None), Err(ImageError::InvalidSource(_))));
        assert!(matches!(
            SourceKind::parse(Some("ftp")),
            Err(ImageError::InvalidSource(_))
        ));
        assert_eq!(SourceKind::parse(Some("Gallery")).ok(), Some(SourceKind::Gallery));
    }

    #[test]
    fn resolve_requires_location_except_for_gallery() {
        assert!(matches!(
            ImageSource::resolve(SourceKind::Local, None),
            Err(ImageError::MissingParameter(_))
        ));
        assert!(matches!(
            ImageSource::resolve(SourceKind::Http, Some("  ".into())),
            Err(ImageError::MissingParameter(_))
        ));
        assert_eq!(
            ImageSource::resolve(SourceKind::Gallery, None).ok(),
            Some(ImageSource::Gallery)
        );
    }

    #[test]
    fn container_parsing_is_three_way() {
        assert_eq!(OutputContainer::parse(None).ok(), Some(OutputContainer::Bitmap));
        assert_eq!(OutputContainer::parse(Some("RAW")).ok(), Some(OutputContainer::RawFrame));
        assert!(matches!(
            OutputContainer::parse(Some("")),
            Err(ImageError::InvalidParameter(_))
        ));
        assert!(matches!(
            OutputContainer::parse(Some("png")),
            Err(ImageError::InvalidParameter(_))
        ));
    }

    #[test]
    fn bit_depth_parsing_is_three_way() {
        assert_eq!(parse_bit_depth(None).ok(), Some(18));
        assert_eq!(parse_bit_depth(Some("16")).ok(), Some(16));
        assert_eq!(parse_bit_depth(Some("70000")).ok(), Some(70_000));
        assert_eq!(parse_bit_depth(Some("-1")).ok(), Some(-1));
        assert!(matches!(parse_bit_depth(Some("")), Err(ImageError::InvalidParameter(_))));
        assert!(matches!(
            parse_bit_depth(Some("sixteen")),
            Err(ImageError::InvalidParameter(_))
        ));
        // 非零非法值不会再被悄悄替换成默认值
        assert!(matches!(parse_bit_depth(Some("0x10")), Err(ImageError::InvalidParameter(_))));
    }

    #[test]
    fn from_query_prefers_img_over_alternate_key() {
        let params = RequestParameters::from_query(
            Some("http"),
            &query(&[("img", "https://a.example/1.png"), ("url", "https://b.example/2.png")]),
        )
        .expect("valid query should parse");

        assert_eq!(params.source, ImageSource::Url("https://a.example/1.png".into()));
        assert_eq!(params.container, OutputContainer::Bitmap);
        assert_eq!(params.bits, DEFAULT_BIT_DEPTH);
    }

    #[test]
    fn from_query_accepts_path_for_local() {
        let params = RequestParameters::from_query(
            Some("local"),
            &query(&[("path", "test.png"), ("format", "raw"), ("bits", "16")]),
        )
        .expect("valid query should parse");

        assert_eq!(params.source, ImageSource::FilePath("test.png".into()));
        assert_eq!(params.container, OutputContainer::RawFrame);
        assert_eq!(params.bits, 16);
    }

    #[test]
    fn from_query_rejects_unsupported_depth_for_raw_only() {
        let raw = RequestParameters::from_query(
            Some("gallery"),
            &query(&[("format", "raw"), ("bits", "24")]),
        );
        assert!(matches!(raw, Err(ImageError::UnsupportedDepth(24))));

        for (value, expected) in [("70000", 70_000_i64), ("-16", -16), ("0", 0)] {
            let result = RequestParameters::from_query(
                Some("local"),
                &query(&[("img", "a.png"), ("format", "raw"), ("bits", value)]),
            );
            assert!(
                matches!(result, Err(ImageError::UnsupportedDepth(v)) if v == expected),
                "bits={}",
                value
            );
        }

        let bmp = RequestParameters::from_query(Some("gallery"), &query(&[("bits", "24")]));
        assert!(bmp.is_ok());

        let bmp = RequestParameters::from_query(Some("gallery"), &query(&[("bits", "70000")]))
            .expect("depth is irrelevant for bitmaps");
        assert_eq!(bmp.bits, DEFAULT_BIT_DEPTH);
    }

    #[test]
    fn from_query_reports_source_before_other_problems() {
        let result = RequestParameters::from_query(
            Some("carrier-pigeon"),
            &query(&[("format", "nope"), ("bits", "x")]),
        );
        assert!(matches!(result, Err(ImageError::InvalidSource(_))));
    }
}
