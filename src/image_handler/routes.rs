//! # HTTP 路由层
//!
//! ## 设计思路
//!
//! 路由层仅做查询参数接收与响应返回，不承载业务逻辑。
//! 所有实际处理交由 `ImageServiceState`，保持处理函数薄、稳定、易测试。
//!
//! | 路径 | 来源 |
//! |------|------|
//! | `/image` | 网络地址（`img` 或 `url`） |
//! | `/local` | 本地文件（`img` 或 `path`） |
//! | `/random` | 图库分页 |
//! | `/frame` | 由 `source` 参数指定 |
//! | `/gen` | 固定测试图 |
//! | `/health` | 存活探针 |

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;

use super::service::ImageServiceState;
use crate::error::AppError;

type SharedState = Arc<ImageServiceState>;
type QueryMap = HashMap<String, String>;

/// 组装全部路由。
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/image", get(image_route))
        .route("/local", get(local_route))
        .route("/random", get(random_route))
        .route("/frame", get(frame_route))
        .route("/gen", get(gen_route))
        .route("/health", get(health_route))
        .with_state(state)
}

async fn respond(
    state: &ImageServiceState,
    kind: Option<&str>,
    query: &QueryMap,
) -> Result<Response, AppError> {
    let wrapped = state.serve(kind, query).await?;
    Ok(wrapped.into_response()?)
}

/// 网络图片。
async fn image_route(
    State(state): State<SharedState>,
    Query(query): Query<QueryMap>,
) -> Result<Response, AppError> {
    respond(&state, Some("http"), &query).await
}

/// 本地图片。
async fn local_route(
    State(state): State<SharedState>,
    Query(query): Query<QueryMap>,
) -> Result<Response, AppError> {
    respond(&state, Some("local"), &query).await
}

/// 图库下一张。
async fn random_route(
    State(state): State<SharedState>,
    Query(query): Query<QueryMap>,
) -> Result<Response, AppError> {
    respond(&state, Some("gallery"), &query).await
}

/// 通用入口，来源类型取自 `source` 参数（缺省即 `InvalidSource`）。
async fn frame_route(
    State(state): State<SharedState>,
    Query(query): Query<QueryMap>,
) -> Result<Response, AppError> {
    let kind = query.get("source").cloned();
    respond(&state, kind.as_deref(), &query).await
}

async fn gen_route(State(state): State<SharedState>) -> Result<Response, AppError> {
    let wrapped = state.serve_test_pattern()?;
    Ok(wrapped.into_response()?)
}

async fn health_route() -> &'static str {
    "OK"
}
