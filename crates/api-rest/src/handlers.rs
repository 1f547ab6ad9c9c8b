use crate::AppState;
use axum::{
    body::Body,
    extract::{Multipart, Path as AxumPath, State},
    http::{header, StatusCode},
    response::{Json, Response},
};
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use upload_files::StorageError;
use utoipa::ToSchema;

const FILE_FIELD: &str = "file";
const OCTET_STREAM: &str = "application/octet-stream";

/// Bytes escaped when a stored name becomes a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

type ApiError = (StatusCode, &'static str);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// One stored entry as shown in a listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoredFileRes {
    pub name: String,
    /// Download location relative to the server root
    pub url: String,
    pub size_bytes: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListFilesRes {
    pub files: Vec<StoredFileRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadRes {
    pub name: String,
    pub message: String,
}

/// Multipart form accepted by `POST /files`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Maps a storage failure to a status code, logging it at the matching level.
fn storage_error(context: &str, err: &StorageError) -> ApiError {
    let response = match err {
        StorageError::EmptyFile(_) => (StatusCode::BAD_REQUEST, "Failed to store empty file"),
        StorageError::PathTraversal(_) => (
            StatusCode::BAD_REQUEST,
            "File name must not leave the storage directory",
        ),
        StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found"),
        StorageError::Configuration(_)
        | StorageError::Init(_)
        | StorageError::Write(_)
        | StorageError::Read(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    };

    if response.0.is_server_error() {
        tracing::error!("{context} error: {:?}", err);
    } else {
        tracing::warn!("{context} rejected: {}", err);
    }

    response
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Upload storage is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "Stored files", body = ListFilesRes),
        (status = 500, description = "Internal server error")
    )
)]
/// List every file stored directly under the storage root
///
/// Size and modification time are read from the filesystem at listing time; an entry
/// removed mid-listing is reported without them.
pub(crate) async fn list_files(
    State(state): State<AppState>,
) -> Result<Json<ListFilesRes>, ApiError> {
    let entries = state
        .storage
        .load_all()
        .map_err(|e| storage_error("List files", &e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| storage_error("List files", &e))?;
        let name = entry.to_string_lossy().into_owned();
        let metadata = std::fs::metadata(state.storage.load(&name)).ok();

        files.push(StoredFileRes {
            url: format!("/files/{}", utf8_percent_encode(&name, PATH_SEGMENT)),
            size_bytes: metadata.as_ref().map(|m| m.len()),
            modified: metadata
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from),
            name,
        });
    }

    Ok(Json(ListFilesRes { files }))
}

#[utoipa::path(
    post,
    path = "/files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = UploadRes),
        (status = 400, description = "Missing, empty or unsafe upload"),
        (status = 500, description = "Internal server error")
    )
)]
/// Store the multipart `file` field under its client-supplied file name
///
/// An existing file of the same name is replaced.
pub(crate) async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadRes>), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Upload multipart read error: {}", e);
        (StatusCode::BAD_REQUEST, "Malformed multipart body")
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or((StatusCode::BAD_REQUEST, "Missing file name"))?;
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!(file = %filename, "Upload body read error: {}", e);
            (StatusCode::BAD_REQUEST, "Could not read uploaded file")
        })?;

        let stored = state
            .storage
            .store(&filename, data.as_ref())
            .map_err(|e| storage_error("Upload", &e))?;
        let name = stored.to_string_lossy().into_owned();

        return Ok((
            StatusCode::CREATED,
            Json(UploadRes {
                message: format!("You successfully uploaded {name}!"),
                name,
            }),
        ));
    }

    Err((StatusCode::BAD_REQUEST, "Missing multipart field 'file'"))
}

#[utoipa::path(
    get,
    path = "/files/{filename}",
    params(
        ("filename" = String, Path, description = "Name of the stored file")
    ),
    responses(
        (status = 200, description = "File content streamed as an attachment"),
        (status = 400, description = "Unsafe file name"),
        (status = 404, description = "File not found"),
        (status = 500, description = "Internal server error")
    )
)]
/// Stream a stored file back as an attachment
pub(crate) async fn download_file(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Response, ApiError> {
    let resource = state
        .storage
        .load_as_resource(&filename)
        .map_err(|e| storage_error("Download", &e))?;

    let file = resource.open().map_err(|e| {
        tracing::error!(file = %filename, "Download open error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?;
    let body = Body::from_stream(ReaderStream::new(tokio::fs::File::from_std(file)));

    let attachment_name: String = resource
        .filename()
        .unwrap_or(filename.as_str())
        .chars()
        .filter(|c| *c != '"' && !c.is_control())
        .collect();

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            resource.media_type().unwrap_or(OCTET_STREAM),
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{attachment_name}\""),
        )
        .body(body)
        .map_err(|e| {
            tracing::error!(file = %filename, "Download response error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })
}
