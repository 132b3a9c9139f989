//! Render a synthetic photo with a few filtered faces through the
//! background worker and write the results next to the working directory.
//!
//! Usage:
//!   RUST_LOG=facefilter=debug cargo run --example render_demo [output_dir]

use std::path::PathBuf;

use facefilter::{
    FaceSession, FilterKind, Point, Rect, RegionTarget, RenderKey, RenderWorker, SessionCommand,
    WorkerEvent,
};
use image::{DynamicImage, Rgba, RgbaImage};
use tracing_subscriber::EnvFilter;

fn synthetic_photo(width: u32, height: u32) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let checker = ((x / 16 + y / 16) % 2) as u8 * 60;
        *pixel = Rgba([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            128u8.saturating_add(checker),
            255,
        ]);
    }
    img
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("facefilter_demo"));
    std::fs::create_dir_all(&output_dir)?;

    let session = FaceSession::new(DynamicImage::ImageRgba8(synthetic_photo(800, 600)))?;
    let worker = RenderWorker::start(session);

    worker.submit(SessionCommand::AddDetected(vec![
        Rect::new(0.1, 0.5, 0.15, 0.2),
        Rect::new(0.45, 0.45, 0.12, 0.16),
    ]))?;
    worker.submit(SessionCommand::AddRegion(Point::new(0.8, 0.3)))?;
    worker.submit(SessionCommand::SetFilter(
        RegionTarget::Index(0),
        FilterKind::GaussianBlur.with_parameter(12.0),
    ))?;
    worker.submit(SessionCommand::SetFilter(
        RegionTarget::Index(1),
        FilterKind::HexagonalPixellate.with_parameter(10.0),
    ))?;
    worker.submit(SessionCommand::SetOvershoot(RegionTarget::Index(2), 0.3))?;

    let requests = [RenderKey::Result, RenderKey::Overview, RenderKey::Preview(1)];
    for key in requests {
        worker.render(key)?;
    }

    let mut remaining = requests.len();
    while remaining > 0 {
        match worker.events().recv()? {
            WorkerEvent::Rendered { key, image, .. } => {
                let name = match key {
                    RenderKey::Result => "result.png".to_string(),
                    RenderKey::Overview => "overview.png".to_string(),
                    RenderKey::Preview(index) => format!("preview_{index}.png"),
                };
                let path = output_dir.join(&name);
                image.save(&path)?;
                println!("{name}: {}x{}", image.width(), image.height());
                remaining -= 1;
            }
            WorkerEvent::RegionsChanged { count, .. } => println!("regions: {count}"),
            WorkerEvent::Failed { key, error, .. } => {
                eprintln!("{key:?} failed: {error}");
                if key.is_some() {
                    remaining -= 1;
                }
            }
        }
    }

    Ok(())
}
