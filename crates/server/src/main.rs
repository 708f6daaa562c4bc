mod app;
mod config;
mod error;
mod routes;

use std::process;
use std::sync::Arc;

use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use faceclass_core::classification::infrastructure::artifact_loader::{
    ArtifactLoader, ArtifactPaths,
};
use faceclass_core::decoding::infrastructure::raster_image_decoder::RasterImageDecoder;
use faceclass_core::detection::infrastructure::cascade_loader::load_face_locator_or_disabled;
use faceclass_core::pipeline::classify_image_use_case::ClassifyImageUseCase;

use crate::app::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // A failed load leaves the server up; classification answers 503.
    let loader = Arc::new(ArtifactLoader::new(ArtifactPaths::in_dir(
        &config.artifacts_dir,
        &config.model_file,
    )));
    let startup = loader.clone();
    tokio::task::spawn_blocking(move || startup.load_or_log()).await?;

    let use_case = ClassifyImageUseCase::new(
        Box::new(RasterImageDecoder::new()),
        load_face_locator_or_disabled(&config.cascades_dir),
        loader,
    );
    let state = AppState::new(
        use_case,
        config.upload_dir.clone(),
        config.static_dir.clone(),
        config.max_upload_bytes(),
    );

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app::router(state)).await?;
    Ok(())
}
