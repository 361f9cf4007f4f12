use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_db::{BlogPostRow, PostTagRow, TagRow};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct TagItem {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<TagRow> for TagItem {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PostItem {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<TagItem>,
}

impl PostItem {
    pub(super) fn with_tags(row: BlogPostRow, tags: Vec<TagItem>) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            summary: row.summary,
            content: row.content,
            cover_image_url: row.cover_image_url,
            is_published: row.is_published,
            published_at: row.published_at,
            updated_at: row.updated_at,
            tags,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PostQuery {
    pub tag: Option<String>,
    pub limit: Option<i64>,
}

/// Attach each post's tags, preserving post order.
pub(super) fn attach_tags(posts: Vec<BlogPostRow>, tags: Vec<PostTagRow>) -> Vec<PostItem> {
    let mut by_post: HashMap<i64, Vec<TagItem>> = HashMap::new();
    for tag in tags {
        by_post.entry(tag.post_id).or_default().push(TagItem {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        });
    }

    posts
        .into_iter()
        .map(|post| {
            let tags = by_post.remove(&post.id).unwrap_or_default();
            PostItem::with_tags(post, tags)
        })
        .collect()
}

pub(super) async fn list_tags(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<TagItem>>>, ApiError> {
    let rows = storefront_db::list_tags(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        rows.into_iter().map(TagItem::from).collect(),
    )))
}

pub(super) async fn list_posts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PostQuery>,
) -> Result<Json<ApiResponse<Vec<PostItem>>>, ApiError> {
    let rid = &req_id.0;
    let tag = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let posts = storefront_db::list_published_posts(&state.pool, tag, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let tags = storefront_db::list_tags_for_posts(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, attach_tags(posts, tags))))
}

pub(super) async fn get_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<PostItem>>, ApiError> {
    let rid = &req_id.0;
    let post = storefront_db::get_published_post_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("post '{slug}' not found")))?;

    let tags = storefront_db::list_tags_for_posts(&state.pool, &[post.id])
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let item = attach_tags(vec![post], tags)
        .pop()
        .ok_or_else(|| ApiError::new(rid, "internal_error", "post disappeared"))?;
    Ok(Json(ApiResponse::new(req_id.0, item)))
}
