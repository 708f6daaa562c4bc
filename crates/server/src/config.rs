use std::path::PathBuf;

use clap::Parser;

use faceclass_core::shared::constants::{
    DEFAULT_ARTIFACTS_DIR, DEFAULT_CASCADES_DIR, DEFAULT_MODEL_NAME,
};

/// HTTP front end for the face classifier.
#[derive(Parser, Debug, Clone)]
#[command(name = "faceclass-server")]
pub struct Config {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "FACECLASS_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory uploaded files are stored in.
    #[arg(long, env = "FACECLASS_UPLOAD_DIR", default_value = "static/uploads")]
    pub upload_dir: PathBuf,

    /// Directory holding the class dictionary and the trained model.
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Model file name inside the artifacts directory (.onnx or .json).
    #[arg(long, default_value = DEFAULT_MODEL_NAME)]
    pub model_file: String,

    /// Directory holding the face and eye Haar cascades.
    #[arg(long, default_value = DEFAULT_CASCADES_DIR)]
    pub cascades_dir: PathBuf,

    /// Directory served under /static; must contain app.html.
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,

    /// Largest accepted request body, in megabytes.
    #[arg(long, default_value_t = 16)]
    pub max_upload_mb: usize,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}
