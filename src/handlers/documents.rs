use axum::{
    body::Body,
    extract::{
        multipart::MultipartError, FromRequest, Multipart, Path, Query, Request, State,
    },
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{CreateDocumentRequest, Document, UpdateDocumentRequest};
use crate::state::AppState;
use crate::storage;

const DOCUMENT_COLUMNS: &str =
    "id, title, content, file_path, category_id, user_id, created_at, updated_at";

/// The `?category_id=` filter, parsed at the router boundary. The literal
/// string "null" is the sentinel for uncategorized documents.
#[derive(Debug, PartialEq)]
enum CategoryFilter {
    All,
    Uncategorized,
    In(i32),
}

impl CategoryFilter {
    fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        match raw {
            None | Some("") => Ok(CategoryFilter::All),
            Some("null") => Ok(CategoryFilter::Uncategorized),
            Some(value) => value
                .parse()
                .map(CategoryFilter::In)
                .map_err(|_| ApiError::bad_request("invalid category_id filter")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category_id: Option<String>,
}

/// GET /documents - newest first, optionally filtered by category
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let filter = CategoryFilter::parse(query.category_id.as_deref())?;

    let documents = match filter {
        CategoryFilter::All => {
            sqlx::query_as::<_, Document>(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at DESC"
            ))
            .fetch_all(&state.pool)
            .await?
        }
        CategoryFilter::Uncategorized => {
            sqlx::query_as::<_, Document>(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE category_id IS NULL \
                 ORDER BY created_at DESC"
            ))
            .fetch_all(&state.pool)
            .await?
        }
        CategoryFilter::In(id) => {
            sqlx::query_as::<_, Document>(&format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE category_id = $1 \
                 ORDER BY created_at DESC"
            ))
            .bind(id)
            .fetch_all(&state.pool)
            .await?
        }
    };

    Ok(Json(documents))
}

/// POST /documents - create from a JSON body or a multipart form
///
/// Multipart fields: title, content, category_id, file. The authenticated
/// user is stamped as owner either way.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    request: Request,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        create_from_multipart(state, user, multipart).await
    } else {
        let Json(body) = Json::<CreateDocumentRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        create_from_json(state, user, body).await
    }
}

async fn create_from_json(
    state: AppState,
    user: AuthUser,
    body: CreateDocumentRequest,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let document = insert_document(
        &state,
        &body.title,
        &body.content,
        "",
        body.category_id,
        user.id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

async fn create_from_multipart(
    state: AppState,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let mut file_path = String::new();

    match multipart_document(&state, user.id, &mut multipart, &mut file_path).await {
        Ok(document) => Ok((StatusCode::CREATED, Json(document))),
        Err(err) => {
            // The blob is written before the insert; remove it on any
            // failure so a failed create leaves nothing behind.
            if !file_path.is_empty() {
                if let Err(cleanup) = state.storage.remove(&file_path).await {
                    tracing::warn!("failed to remove orphaned upload {}: {}", file_path, cleanup);
                }
            }
            Err(err)
        }
    }
}

async fn multipart_document(
    state: &AppState,
    user_id: i32,
    multipart: &mut Multipart,
    file_path: &mut String,
) -> Result<Document, ApiError> {
    let mut title = String::new();
    let mut content = String::new();
    let mut category_id: Option<i32> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => {
                title = field.text().await.map_err(multipart_error)?;
            }
            "content" => {
                content = field.text().await.map_err(multipart_error)?;
            }
            "category_id" => {
                let value = field.text().await.map_err(multipart_error)?;
                category_id = value.parse().ok();
            }
            "file" => {
                let original = field.file_name().unwrap_or("upload").to_string();
                let (path, mut blob) = state.storage.create(&original).await.map_err(|e| {
                    tracing::error!("failed to create blob for upload: {}", e);
                    ApiError::internal("failed to store uploaded file")
                })?;
                *file_path = path;

                // Stream the upload to disk chunk by chunk instead of
                // buffering the whole part in memory.
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    blob.write_all(&chunk).await.map_err(|e| {
                        tracing::error!("failed to write blob {}: {}", file_path, e);
                        ApiError::internal("failed to store uploaded file")
                    })?;
                }
                blob.flush().await.map_err(|e| {
                    tracing::error!("failed to flush blob {}: {}", file_path, e);
                    ApiError::internal("failed to store uploaded file")
                })?;
            }
            _ => {}
        }
    }

    insert_document(state, &title, &content, file_path, category_id, user_id).await
}

/// Body-limit overruns surface mid-read as multipart errors; keep the 413
/// they carry instead of flattening everything to 400.
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("request body exceeds the upload size limit")
    } else {
        ApiError::bad_request(err.to_string())
    }
}

async fn insert_document(
    state: &AppState,
    title: &str,
    content: &str,
    file_path: &str,
    category_id: Option<i32>,
    user_id: i32,
) -> Result<Document, ApiError> {
    let document = sqlx::query_as::<_, Document>(&format!(
        "INSERT INTO documents (title, content, file_path, category_id, user_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(title)
    .bind(content)
    .bind(file_path)
    .bind(category_id)
    .bind(user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(document)
}

/// GET /documents/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Document>, ApiError> {
    let document = sqlx::query_as::<_, Document>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("document not found"))?;

    Ok(Json(document))
}

/// PUT /documents/:id - full replace of title/content/category
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    let document = sqlx::query_as::<_, Document>(&format!(
        "UPDATE documents SET title = $1, content = $2, category_id = $3, updated_at = now()
         WHERE id = $4
         RETURNING {DOCUMENT_COLUMNS}"
    ))
    .bind(&body.title)
    .bind(&body.content)
    .bind(body.category_id)
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("document not found"))?;

    Ok(Json(document))
}

/// DELETE /documents/:id
///
/// The row delete is the atomic step; removing the blob afterwards is
/// best-effort and failures are only logged.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let (file_path,) =
        sqlx::query_as::<_, (String,)>("DELETE FROM documents WHERE id = $1 RETURNING file_path")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("document not found"))?;

    if !file_path.is_empty() {
        if let Err(e) = state.storage.remove(&file_path).await {
            tracing::warn!("failed to remove blob {} for deleted document: {}", file_path, e);
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /documents/:id/download - stream the stored file as an attachment
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let (file_path,) =
        sqlx::query_as::<_, (String,)>("SELECT file_path FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("document not found"))?;

    if file_path.is_empty() {
        return Err(ApiError::not_found("document has no uploaded file"));
    }

    let file = tokio::fs::File::open(&file_path).await.map_err(|e| {
        tracing::error!("failed to open blob {}: {}", file_path, e);
        ApiError::internal("failed to open stored file")
    })?;

    let stream = ReaderStream::new(file);

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", storage::base_name(&file_path)),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("failed to build response: {e}")))
}
