use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;

use faceclass_core::classification::domain::classification_result::ClassificationResult;
use faceclass_core::classification::infrastructure::artifact_loader::{
    ArtifactLoader, ArtifactPaths,
};
use faceclass_core::decoding::infrastructure::raster_image_decoder::RasterImageDecoder;
use faceclass_core::detection::infrastructure::cascade_loader::load_face_locator_or_disabled;
use faceclass_core::pipeline::classify_image_use_case::{ClassifyError, ClassifyImageUseCase};
use faceclass_core::shared::constants::{
    DEFAULT_ARTIFACTS_DIR, DEFAULT_CASCADES_DIR, DEFAULT_MODEL_NAME, IMAGE_EXTENSIONS,
};

/// Classify the faces in image files and print the results as JSON.
#[derive(Parser)]
#[command(name = "faceclass")]
struct Cli {
    /// Image files to classify.
    images: Vec<PathBuf>,

    /// Text file holding a base64 image payload (repeatable).
    #[arg(long = "base64", value_name = "FILE")]
    base64_files: Vec<PathBuf>,

    /// Directory holding the class dictionary and the trained model.
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    artifacts_dir: PathBuf,

    /// Model file name inside the artifacts directory (.onnx or .json).
    #[arg(long, default_value = DEFAULT_MODEL_NAME)]
    model_file: String,

    /// Directory holding the face and eye Haar cascades.
    #[arg(long, default_value = DEFAULT_CASCADES_DIR)]
    cascades_dir: PathBuf,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let loader = Arc::new(ArtifactLoader::new(ArtifactPaths::in_dir(
        &cli.artifacts_dir,
        &cli.model_file,
    )));
    loader.load()?;

    let use_case = ClassifyImageUseCase::new(
        Box::new(RasterImageDecoder::new()),
        load_face_locator_or_disabled(&cli.cascades_dir),
        loader,
    );

    let mut report = Vec::new();
    for path in &cli.images {
        if !is_image(path) {
            log::warn!("{} does not look like an image file", path.display());
        }
        let results = classify(&use_case, None, Some(path))?;
        report.push(json!({ "input": path.display().to_string(), "results": results }));
    }
    for path in &cli.base64_files {
        let payload = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read base64 file {}: {e}", path.display()))?;
        let results = classify(&use_case, Some(&payload), None)?;
        report.push(json!({ "input": path.display().to_string(), "results": results }));
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Input errors become an error entry for that input; an unavailable model
/// aborts the run.
fn classify(
    use_case: &ClassifyImageUseCase,
    base64: Option<&str>,
    path: Option<&Path>,
) -> Result<Vec<ClassificationResult>, Box<dyn std::error::Error>> {
    match use_case.execute(base64, path) {
        Ok(classification) => {
            let results = classification.into_results();
            log::info!("{} result(s)", results.len());
            Ok(results)
        }
        Err(ClassifyError::Input(e)) => Ok(vec![ClassificationResult::error(e.to_string())]),
        Err(e @ ClassifyError::ModelUnavailable) => Err(e.into()),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.images.is_empty() && cli.base64_files.is_empty() {
        return Err("Provide at least one image file or --base64 file".into());
    }
    for path in cli.images.iter().chain(&cli.base64_files) {
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
    }
    if !cli.artifacts_dir.is_dir() {
        return Err(format!(
            "Artifacts directory not found: {}",
            cli.artifacts_dir.display()
        )
        .into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
