use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};

use faceclass_core::decoding::domain::image_source::{ImageSource, InputError};
use faceclass_core::pipeline::classify_image_use_case::{Classification, ClassifyError};

use crate::app::AppState;
use crate::error::classification_error;
use crate::routes::upload::{save_upload, UploadedFile};

/// Form field carrying the base64 image.
pub const IMAGE_FIELD: &str = "image_data";
/// Form field carrying an image file.
pub const FILE_FIELD: &str = "file";

/// Classifies the image posted as `image_data` or as a `file` part.
///
/// Answers with an array of results: one per qualifying face, empty when no
/// face qualifies, a single error entry when the request or image is bad.
pub async fn handler_classify(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut image_data: Option<Bytes> = None;
    let mut file: Option<UploadedFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return classification_error(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed multipart body: {e}"),
                )
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return classification_error(
                    StatusCode::BAD_REQUEST,
                    format!("Malformed multipart body: {e}"),
                )
            }
        };
        match name.as_str() {
            IMAGE_FIELD => image_data = Some(bytes),
            FILE_FIELD if !file_name.is_empty() => file = Some(UploadedFile { file_name, bytes }),
            _ => {}
        }
    }

    // Nothing is written to the upload dir unless the model can answer.
    if file.is_some() && !state.use_case.artifacts().is_loaded() {
        return model_unavailable(ClassifyError::ModelUnavailable);
    }

    let source = match file {
        Some(file) => match save_upload(&state.upload_dir, &file).await {
            Ok(path) => ImageSource::File(path),
            Err(e) => {
                let status = e.status();
                return classification_error(status, e.to_string());
            }
        },
        None => match image_data {
            Some(bytes) => match ImageSource::from_base64_bytes(&bytes) {
                Ok(source) => source,
                Err(e) => return input_error(e),
            },
            None => return input_error(InputError::MissingImage),
        },
    };

    let use_case = state.use_case.clone();
    let outcome = tokio::task::spawn_blocking(move || use_case.execute_source(&source)).await;

    match outcome {
        Ok(Ok(classification @ Classification::Undecodable(_))) => {
            (StatusCode::BAD_REQUEST, Json(classification.into_results())).into_response()
        }
        Ok(Ok(classification)) => Json(classification.into_results()).into_response(),
        Ok(Err(ClassifyError::Input(e))) => input_error(e),
        Ok(Err(e @ ClassifyError::ModelUnavailable)) => model_unavailable(e),
        Err(e) => {
            error!("Classification task failed: {e}");
            classification_error(StatusCode::INTERNAL_SERVER_ERROR, "Classification failed")
        }
    }
}

fn model_unavailable(e: ClassifyError) -> Response {
    error!("Rejected classification: {e}");
    classification_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
}

fn input_error(e: InputError) -> Response {
    warn!("Rejected classification request: {e}");
    classification_error(StatusCode::BAD_REQUEST, e.to_string())
}
