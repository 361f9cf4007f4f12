//! Blog administration: tags, posts and the tags attached to each post.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use storefront_core::slug_from_name;
use storefront_db::{NewBlogPost, UpdateBlogPost};

use crate::middleware::RequestId;

use super::super::blog::{attach_tags, PostItem, TagItem};
use super::super::extract::{Admin, ApiJson};
use super::super::{
    double_option, map_db_error, required_text, ApiError, ApiResponse, AppState,
};
use super::Deleted;

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreateTagRequest {
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct CreatePostRequest {
    pub title: String,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(in crate::api) struct UpdatePostRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub summary: Option<Option<String>>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub cover_image_url: Option<Option<String>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct TagIdsRequest {
    pub tag_ids: Vec<i64>,
}

fn slug_or_name(request_id: &str, explicit: Option<&str>, name: &str) -> Result<String, ApiError> {
    let slug = slug_from_name(explicit.unwrap_or(name));
    if slug.is_empty() {
        return Err(ApiError::new(
            request_id,
            "validation_error",
            "slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

async fn post_with_tags(
    state: &AppState,
    request_id: &str,
    row: storefront_db::BlogPostRow,
) -> Result<PostItem, ApiError> {
    let tags = storefront_db::list_tags_for_posts(&state.pool, &[row.id])
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    attach_tags(vec![row], tags)
        .pop()
        .ok_or_else(|| ApiError::new(request_id, "internal_error", "post disappeared"))
}

pub(in crate::api) async fn create_tag(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    ApiJson(body): ApiJson<CreateTagRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TagItem>>), ApiError> {
    let rid = &req_id.0;
    let name = required_text(rid, "name", &body.name, 100)?;
    let slug = slug_or_name(rid, body.slug.as_deref(), &name)?;

    let row = storefront_db::create_tag(&state.pool, &name, &slug)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, row.into()))))
}

pub(in crate::api) async fn delete_tag(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    let rid = &req_id.0;
    let deleted = storefront_db::delete_tag(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", format!("tag {id} not found")));
    }
    Ok(Json(ApiResponse::new(req_id.0, Deleted { id, deleted })))
}

pub(in crate::api) async fn create_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Admin(admin): Admin,
    ApiJson(body): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PostItem>>), ApiError> {
    let rid = &req_id.0;
    let title = required_text(rid, "title", &body.title, MAX_TITLE_LEN)?;
    let slug = slug_or_name(rid, body.slug.as_deref(), &title)?;
    if body.content.trim().is_empty() {
        return Err(ApiError::new(rid, "validation_error", "content must not be empty"));
    }

    let row = storefront_db::create_blog_post(
        &state.pool,
        &NewBlogPost {
            slug: &slug,
            title: &title,
            summary: body.summary.as_deref(),
            content: &body.content,
            cover_image_url: body.cover_image_url.as_deref(),
            is_published: body.is_published,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(post_id = row.id, admin_id = %admin.id, published = row.is_published, "blog post created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, PostItem::with_tags(row, Vec::new()))),
    ))
}

/// PATCH /api/v1/admin/blog/posts/{id}
///
/// Publishing stamps `published_at` the first time only; unpublishing keeps it.
pub(in crate::api) async fn update_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<UpdatePostRequest>,
) -> Result<Json<ApiResponse<PostItem>>, ApiError> {
    let rid = &req_id.0;
    let title = body
        .title
        .as_deref()
        .map(|t| required_text(rid, "title", t, MAX_TITLE_LEN))
        .transpose()?;
    if body.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(ApiError::new(rid, "validation_error", "content must not be empty"));
    }

    let update = UpdateBlogPost {
        title: title.as_deref(),
        summary: body.summary.as_ref().map(|s| s.as_deref()),
        content: body.content.as_deref(),
        cover_image_url: body.cover_image_url.as_ref().map(|u| u.as_deref()),
        is_published: body.is_published,
    };
    let row = storefront_db::update_blog_post(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("post {id} not found")))?;

    let data = post_with_tags(&state, rid, row).await?;
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

pub(in crate::api) async fn delete_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    let rid = &req_id.0;
    let deleted = storefront_db::delete_blog_post(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", format!("post {id} not found")));
    }
    Ok(Json(ApiResponse::new(req_id.0, Deleted { id, deleted })))
}

/// PUT /api/v1/admin/blog/posts/{id}/tags: replace the post's tag set.
pub(in crate::api) async fn set_post_tags(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    _admin: Admin,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<TagIdsRequest>,
) -> Result<Json<ApiResponse<Vec<TagItem>>>, ApiError> {
    let rid = &req_id.0;
    storefront_db::set_post_tags(&state.pool, id, &body.tag_ids)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let tags = storefront_db::list_tags_for_posts(&state.pool, &[id])
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let data = tags
        .into_iter()
        .map(|t| TagItem {
            id: t.id,
            name: t.name,
            slug: t.slug,
        })
        .collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}
