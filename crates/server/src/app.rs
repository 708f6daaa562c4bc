use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use faceclass_core::pipeline::classify_image_use_case::ClassifyImageUseCase;

use crate::routes::{assets, classify, upload};

#[derive(Clone)]
pub struct AppState {
    pub use_case: Arc<ClassifyImageUseCase>,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        use_case: ClassifyImageUseCase,
        upload_dir: PathBuf,
        static_dir: PathBuf,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            use_case: Arc::new(use_case),
            upload_dir,
            static_dir,
            max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/", get(assets::handler_index))
        .route("/favicon.ico", get(assets::handler_favicon))
        .route("/health", get(assets::handler_health))
        .route("/classify_image", post(classify::handler_classify))
        .route("/CLASSIFY_IMAGES", post(classify::handler_classify))
        .route("/upload", post(upload::handler_upload))
        .route("/file-upload", post(upload::handler_file_upload))
        .nest_service("/static", static_files)
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use faceclass_core::classification::domain::class_label_map::ClassLabelMap;
    use faceclass_core::classification::domain::classifier::{
        Classifier, ClassifierError, Prediction,
    };
    use faceclass_core::classification::infrastructure::artifact_loader::{
        ArtifactLoader, ArtifactPaths, Artifacts,
    };
    use faceclass_core::decoding::infrastructure::raster_image_decoder::RasterImageDecoder;
    use faceclass_core::detection::domain::face_locator::{FaceCrop, FaceLocator};
    use faceclass_core::features::domain::feature_vector::FeatureVector;
    use faceclass_core::shared::frame::Frame;
    use faceclass_core::shared::region::Region;

    const BOUNDARY: &str = "faceclass-test-boundary";

    // --- Stubs ---

    /// Treats the whole picture as one face, or sees none at all.
    struct WholeFrame {
        enabled: bool,
    }

    impl FaceLocator for WholeFrame {
        fn locate(&self, frame: &Frame) -> Vec<FaceCrop> {
            if !self.enabled {
                return Vec::new();
            }
            let region = Region::new(0, 0, frame.width() as i32, frame.height() as i32);
            frame
                .crop(&region)
                .map(|image| vec![FaceCrop { region, image }])
                .unwrap_or_default()
        }
    }

    struct FixedClassifier;

    impl Classifier for FixedClassifier {
        fn predict(&self, _features: &FeatureVector) -> Result<Prediction, ClassifierError> {
            Ok(Prediction {
                label: 1,
                probabilities: vec![0.25, 0.75],
            })
        }
    }

    fn loaded_artifacts() -> Arc<ArtifactLoader> {
        Arc::new(ArtifactLoader::preloaded(Artifacts {
            labels: ClassLabelMap::new(vec![("lovelace".into(), 0), ("hopper".into(), 1)])
                .unwrap(),
            classifier: Box::new(FixedClassifier),
        }))
    }

    fn app(root: &Path, artifacts: Arc<ArtifactLoader>, faces: bool) -> Router {
        let use_case = ClassifyImageUseCase::new(
            Box::new(RasterImageDecoder::new()),
            Box::new(WholeFrame { enabled: faces }),
            artifacts,
        );
        let static_dir = root.join("static");
        router(AppState::new(
            use_case,
            static_dir.join("uploads"),
            static_dir,
            1024 * 1024,
        ))
    }

    fn png() -> Vec<u8> {
        let img = image::RgbImage::from_fn(24, 24, |x, y| image::Rgb([(x * 10) as u8, (y * 10) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn data_uri() -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(png()))
    }

    /// Parts are (field name, file name, content).
    fn multipart(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, file_name, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    // --- Tests ---

    #[tokio::test]
    async fn test_classify_base64_image() {
        let dir = tempfile::tempdir().unwrap();
        let uri = data_uri();
        let request = multipart("/classify_image", &[("image_data", None, uri.as_bytes())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::OK);
        let results = body.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["class"], "hopper");
        assert_eq!(results[0]["class_probability"], serde_json::json!([25.0, 75.0]));
        assert_eq!(results[0]["class_dictionary"]["lovelace"], 0);
        assert!(results[0].get("error").is_none());
    }

    #[tokio::test]
    async fn test_uppercase_route_is_an_alias() {
        let dir = tempfile::tempdir().unwrap();
        let uri = data_uri();
        let request = multipart("/CLASSIFY_IMAGES", &[("image_data", None, uri.as_bytes())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["class"], "hopper");
    }

    #[tokio::test]
    async fn test_no_face_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let uri = data_uri();
        let request = multipart("/classify_image", &[("image_data", None, uri.as_bytes())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), false), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_missing_image_data_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart("/classify_image", &[("other", None, b"x".as_slice())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body[0]["error"], "No image data provided");
        assert_eq!(body[0]["class"], Value::Null);
    }

    #[tokio::test]
    async fn test_binary_image_data_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart("/classify_image", &[("image_data", None, [0xffu8, 0xfe, 0x00].as_slice())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body[0]["error"], "Image data must be a base64 string");
    }

    #[tokio::test]
    async fn test_undecodable_image_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart(
            "/classify_image",
            &[("image_data", None, b"data:image/png;base64,%%%".as_slice())],
        );

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body[0]["error"].as_str().unwrap();
        assert!(message.starts_with("Could not decode image"), "{message}");
    }

    #[tokio::test]
    async fn test_unloaded_model_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(ArtifactLoader::new(ArtifactPaths::default_in(dir.path())));
        let uri = data_uri();
        let request = multipart("/classify_image", &[("image_data", None, uri.as_bytes())]);

        let (status, body) = send(app(dir.path(), loader, true), request).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body[0]["error"], "Model not loaded");
    }

    #[tokio::test]
    async fn test_unloaded_model_keeps_upload_off_disk() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(ArtifactLoader::new(ArtifactPaths::default_in(dir.path())));
        let image = png();
        let request = multipart("/classify_image", &[("file", Some("me.png"), image.as_slice())]);

        let (status, body) = send(app(dir.path(), loader, true), request).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body[0]["error"], "Model not loaded");
        assert!(!dir.path().join("static/uploads/me.png").exists());
    }

    #[tokio::test]
    async fn test_classify_uploaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let image = png();
        let request = multipart("/classify_image", &[("file", Some("me.png"), image.as_slice())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["class"], "hopper");
        assert!(dir.path().join("static/uploads/me.png").exists());
    }

    #[tokio::test]
    async fn test_upload_returns_servable_url() {
        let dir = tempfile::tempdir().unwrap();
        let image = png();
        let request = multipart("/upload", &[("file", Some("../portrait.png"), image.as_slice())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["file_url"], "/static/uploads/portrait.png");

        let served = app(dir.path(), loaded_artifacts(), true)
            .oneshot(get_request("/static/uploads/portrait.png"))
            .await
            .unwrap();
        assert_eq!(served.status(), StatusCode::OK);
        let bytes = served.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), image.as_slice());
    }

    #[tokio::test]
    async fn test_upload_without_file_part() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart("/upload", &[("image_data", None, b"abc".as_slice())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file part in the request");
    }

    #[tokio::test]
    async fn test_upload_with_empty_filename() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart("/file-upload", &[("file", Some(""), b"abc".as_slice())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file selected for upload");
    }

    #[tokio::test]
    async fn test_file_upload_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let request = multipart("/file-upload", &[("file", Some("notes.jpg"), b"jpeg".as_slice())]);

        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "File uploaded successfully");
        let saved = dir.path().join("static").join("uploads").join("notes.jpg");
        assert_eq!(body["file_path"], saved.display().to_string());
        assert_eq!(std::fs::read(saved).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_health_reports_model_state() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(app(dir.path(), loaded_artifacts(), true), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "status": "ok", "model_loaded": true }));

        let loader = Arc::new(ArtifactLoader::new(ArtifactPaths::default_in(dir.path())));
        let (_, body) = send(app(dir.path(), loader, true), get_request("/health")).await;
        assert_eq!(body["model_loaded"], false);
    }

    #[tokio::test]
    async fn test_favicon_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), loaded_artifacts(), true)
            .oneshot(get_request("/favicon.ico"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_index_page() {
        let dir = tempfile::tempdir().unwrap();
        let missing = app(dir.path(), loaded_artifacts(), true)
            .oneshot(get_request("/"))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/app.html"), "<h1>classifier</h1>").unwrap();
        let found = app(dir.path(), loaded_artifacts(), true)
            .oneshot(get_request("/"))
            .await
            .unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        let bytes = found.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), b"<h1>classifier</h1>");
    }
}
