//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“参数解析 → 来源加载 → 解码归一化 → 编码 → 传输封装 → HTTP 路由”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `routes`：仅做查询参数/响应适配（薄封装）
//! - `service`：承载可注入状态（`ImageServiceState`）
//! - `handler`：编排整条处理流水线
//! - `loader`：负责 URL/文件加载与安全校验
//! - `gallery`：负责图库列表拉取与分页游标
//! - `pipeline`：负责解码、像素限制、裁剪缩放到 240×320
//! - `encoder`：负责原始帧（RGB565/RGB666）与 BMP 编码
//! - `transport`：负责 Base64 / 二进制响应体封装
//! - `config/error/source`：配置、错误、请求参数模型
//!
//! ## 实现思路
//!
//! 对外仅暴露必要类型与路由构建函数，内部细节保持 `mod` 私有。
//! 通过 `ImageServiceState` 注入状态，测试可创建独立实例。
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 设备 GET 请求
//!    ↓
//! routes.rs（查询参数适配）
//!    ↓
//! service.rs（State 注入、参数解析、服务入口）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs / gallery.rs（来源加载 + URL/体积安全校验）
//!    ├─ pipeline.rs（解码 + 像素限制 + 画布归一化）
//!    └─ encoder.rs（原始帧 / BMP）
//!    ↓
//! transport.rs（Base64 或二进制）
//!    ↓
//! 返回响应或 AppError
//! ```
//!
//! ## 分层职责建议
//!
//! - 路径/参数名变更优先改 `routes.rs` 与 `source.rs`
//! - 配置与策略变更优先改 `config.rs`
//! - 业务流程顺序变更优先改 `handler.rs`
//! - 单阶段行为优化分别改 `loader/gallery/pipeline/encoder`

mod config;
mod encoder;
mod error;
mod gallery;
mod handler;
mod loader;
mod pipeline;
pub mod routes;
mod service;
mod source;
pub mod transport;

pub use config::{ImageConfig, ResizeFilter};
pub use encoder::{
    BitDepth, EncodedPayload, FRAME_HEADER_LEN, FrameHeader, PixelFrame, encode_bitmap,
    encode_raw_frame, frame_len, pack_rgb565,
};
pub use error::ImageError;
pub use gallery::{GalleryFeed, GalleryItem, parse_gallery_listing};
pub use pipeline::{CANVAS_HEIGHT, CANVAS_WIDTH};
pub use routes::router;
pub use service::ImageServiceState;
pub use source::{
    DEFAULT_BIT_DEPTH, ImageSource, OutputContainer, RequestParameters, SourceKind,
    parse_bit_depth,
};
pub use transport::{WrappedBody, wrap};

/// 内部核心编排器，不直接暴露给路由层。
pub(crate) use handler::ImageHandler;
