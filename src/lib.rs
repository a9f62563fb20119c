//! # 像素网关 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              小屏设备 (240×320 LCD, HTTP GET)             │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ HTTP (Base64 原始帧 / BMP / `<code>: <message>`)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            网关 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型 → HTTP 响应)      │
//! │  │                                                       │
//! │  ├─ settings ─── JSON 设置文件 + 环境变量覆盖             │
//! │  │                                                       │
//! │  └─ image_handler                                        │
//! │      ├─ routes / service   路由与共享状态                 │
//! │      ├─ loader / gallery   本地·网络·图库来源             │
//! │      ├─ pipeline           解码·裁剪·缩放·翻转            │
//! │      ├─ encoder            RGB565 / RGB666 / BMP          │
//! │      └─ transport          Base64 或二进制                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，所有路由处理函数的错误类型 |
//! | [`image_handler`] | 从文件/URL/图库加载图片，归一化并编码为设备帧 |
//! | [`settings`] | 启动设置的读取、环境变量覆盖与校验 |

pub mod error;
pub mod image_handler;
pub mod settings;
