use futures::StreamExt;
use genstudio::logger::{self, LogLevel, LoggerConfig};
use genstudio::{
    GenerationController, GenerationRequest, GenerationStatus, ImageData, SimulatedBackend,
    StudioConfig, StyleOption,
};
use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let mut logger_config = LoggerConfig::development()
        .with_level(LogLevel::Info)
        .with_json_output(env::var("GENSTUDIO_LOG_JSON").map_or(false, |val| val == "true"));
    if let Ok(path) = env::var("GENSTUDIO_LOG_FILE") {
        logger_config = logger_config.with_file_output(&path);
    }
    logger::init_with_config(logger_config)?;
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = StudioConfig::from_env();
    logger::log_config_info(&config);

    let backend = Arc::new(SimulatedBackend::new(config.backend.clone())?);
    let controller = GenerationController::from_config(backend, &config);
    let max_retries = controller.policy().max_retries;

    // Print every transition as the studio would show it.
    let mut transitions = Box::pin(controller.transition_stream());
    let watcher = tokio::spawn(async move {
        while let Some(state) = transitions.next().await {
            log::info!(
                "📺 {} | {}",
                state.status,
                state.status_message(max_retries)
            );
        }
    });

    let image = load_reference_image()?;
    log::info!(
        "🖼️  Reference image: {} ({} bytes, preview {} chars)",
        image.file_name,
        image.len(),
        image.to_data_url().len()
    );

    // 1. A full generation with retries
    log::info!("🎨 Requesting a Vintage generation...");
    let request = GenerationRequest::new("red scarf", StyleOption::Vintage, image.clone())?;
    match controller.generate(request).await {
        Ok(generation) => {
            log::info!("✅ Generated {} -> {}", generation.id, generation.image_url);
        }
        Err(e) => {
            log::error!("❌ Generation failed: {}", e);
        }
    }

    // 2. Abort a generation half-way through
    log::info!("🛑 Requesting a Cyberpunk generation and aborting it...");
    let request = GenerationRequest::new("neon alley", StyleOption::Cyberpunk, image)?;
    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.generate(request).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.abort();
    match pending.await? {
        Ok(generation) => log::warn!("⚠️  Finished before abort: {}", generation.id),
        Err(e) => log::info!("✅ {}", e),
    }
    if controller.state().status == GenerationStatus::Aborted {
        log::info!("📺 {}", controller.state().status_message(max_retries));
    }

    // 3. History panel
    log::info!("📚 Recent generations:");
    match controller.recent_generations().await {
        Ok(generations) => {
            for generation in generations {
                log::info!(
                    "  {} | {} | {} | {}",
                    generation.created_at.format("%H:%M:%S"),
                    generation.style,
                    generation.prompt,
                    generation.image_url
                );
            }
        }
        Err(e) => log::error!("❌ Failed to load generation history: {}", e),
    }

    controller.reset();
    drop(controller);
    watcher.abort();

    log::info!("🎉 Done");
    Ok(())
}

/// Reads the image named by `GENSTUDIO_IMAGE`, or falls back to a tiny PNG.
fn load_reference_image() -> Result<ImageData, Box<dyn std::error::Error>> {
    match env::var("GENSTUDIO_IMAGE") {
        Ok(path) => {
            let bytes = fs::read(&path)?;
            let content_type = if path.to_lowercase().ends_with(".png") {
                "image/png"
            } else {
                "image/jpeg"
            };
            let image = ImageData::new(path.clone(), content_type, bytes);
            image.validate()?;
            Ok(image)
        }
        Err(_) => {
            log::warn!("⚠️  GENSTUDIO_IMAGE not set, using a built-in placeholder");
            Ok(ImageData::new(
                "placeholder.png",
                "image/png",
                vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a],
            ))
        }
    }
}
