//! Detect faces in a photo with the SeetaFace model and blur them.
//!
//! Usage:
//!   cargo run --example detect_and_blur --features rustface -- \
//!       <seeta_fd_frontal_v1.0.bin> <input> <output.png> [filter-name]

use facefilter::{FaceSession, FilterKind, RegionTarget, RustfaceDetector};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("usage: {} <model> <input> <output> [filter-name]", args[0]);
        std::process::exit(2);
    }
    let kind = match args.get(4) {
        Some(name) => FilterKind::from_name(name).ok_or_else(|| format!("unknown filter: {name}"))?,
        None => FilterKind::GaussianBlur,
    };

    let detector = RustfaceDetector::from_model_path(&args[1])?;
    let input = std::fs::read(&args[2])?;
    let mut session = FaceSession::from_bytes(&input)?.face_detector(Box::new(detector));

    let found = session.detect_faces()?;
    println!("found {found} face(s)");
    for (index, region) in session.regions().iter().enumerate() {
        println!("  face {index}: {:?}", region.bounding_box);
    }

    // Strength follows the largest face
    let filter = session.suggested_filter(kind);
    session.set_filter(RegionTarget::All, filter)?;
    session.set_overshoot(RegionTarget::All, 0.1)?;

    session.render_result()?.save(&args[3])?;
    println!("wrote {} with {}", args[3], filter.name());
    Ok(())
}
