use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::{info, warn};
use planar_object_tracker::data_loader::{create_from_train_folder, frames};
use planar_object_tracker::io::{load_model, object_from_json, save_model, write_report};
use planar_object_tracker::synthetic::{drifting_offsets, frame_with_object, textured_object};
use planar_object_tracker::{
    DetectionResult, OrbExtractor, PipelineConfig, TrainedModel, tracker_from_config,
};

#[derive(Parser)]
#[command(version, about, author)]
struct PdrsCli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on a folder of images and track the object through a folder of frames
    Track {
        /// folder with the training images, all of the same size
        train: String,

        /// folder with the frames, processed in path order
        frames: String,

        /// pipeline configuration JSON
        #[arg(short, long)]
        config: Option<String>,

        /// load extracted training features from this file instead of the train folder
        #[arg(long)]
        model: Option<String>,

        /// write the extracted training features to this file
        #[arg(long)]
        save_model: Option<String>,

        /// per-frame JSON report
        #[arg(short, long)]
        report: Option<String>,

        /// run the static detector on every frame, without temporal bridging
        #[arg(long)]
        static_only: bool,
    },
    /// Write a synthetic training image and frame sequence
    Generate {
        /// output directory; `train/` and `frames/` are created inside
        output: String,

        #[arg(short, long, default_value = "40")]
        num_frames: usize,

        #[arg(long, default_value = "320")]
        width: u32,

        #[arg(long, default_value = "240")]
        height: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = PdrsCli::parse();
    match cli.command {
        Commands::Track {
            train,
            frames,
            config,
            model,
            save_model: save_path,
            report,
            static_only,
        } => {
            let config: PipelineConfig = match config {
                Some(path) => object_from_json(&path)?,
                None => PipelineConfig::default(),
            };
            let trained = match model {
                Some(path) => load_model(&path)?,
                None => {
                    let extractor = OrbExtractor::new(config.extractor.clone());
                    create_from_train_folder(&train, &extractor)?
                }
            };
            if let Some(path) = save_path {
                save_model(&path, &trained)?;
                info!("saved model to {}", path);
            }
            track(trained, &config, &frames, report.as_deref(), static_only)?;
        }
        Commands::Generate {
            output,
            num_frames,
            width,
            height,
        } => generate(&output, num_frames, width, height)?,
    }
    Ok(())
}

fn track(
    model: TrainedModel,
    config: &PipelineConfig,
    frames_folder: &str,
    report: Option<&str>,
    static_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut detector = tracker_from_config(Arc::new(model), config);
    let mut results: Vec<(String, DetectionResult)> = Vec::new();
    let now = Instant::now();
    for (path, frame) in frames(frames_folder)? {
        let result = if static_only {
            detector.static_detector().detect_in(&frame)
        } else {
            detector.detect_in(&frame)
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        match result.offset {
            Some(o) if result.bridged => info!("{}: bridged at ({:.1}, {:.1})", name, o.x, o.y),
            Some(o) => info!(
                "{}: found at ({:.1}, {:.1}), {} inliers",
                name, o.x, o.y, result.inliers
            ),
            None => info!("{}: not found", name),
        }
        results.push((name, result));
    }
    let duration_sec = now.elapsed().as_secs_f64();
    if results.is_empty() {
        warn!("no frames in {}", frames_folder);
        return Ok(());
    }
    println!(
        "Tracked {} frames in {:.3} sec, {:.1} FPS",
        results.len(),
        duration_sec,
        results.len() as f64 / duration_sec.max(f64::EPSILON)
    );
    if let Some(path) = report {
        write_report(path, &results, duration_sec)?;
    }
    Ok(())
}

fn generate(
    output_dir: &str,
    num_frames: usize,
    width: u32,
    height: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;

    let train_dir = Path::new(output_dir).join("train");
    let frames_dir = Path::new(output_dir).join("frames");
    fs::create_dir_all(&train_dir)?;
    fs::create_dir_all(&frames_dir)?;

    let object = textured_object(100, 80, 6, 7);
    object.save(train_dir.join("object.png"))?;

    // the object disappears for a short stretch in the middle
    let gap_start = num_frames / 2;
    let absent: Vec<usize> = (gap_start..(gap_start + 2).min(num_frames)).collect();
    let offsets = drifting_offsets(num_frames, (20, 30), (2, 1), &absent);
    for (i, offset) in offsets.iter().enumerate() {
        let frame = frame_with_object(width, height, 128, &object, *offset);
        frame.save(frames_dir.join(format!("{:06}.png", i)))?;
    }

    println!("Generated {} frames in {}", num_frames, output_dir);
    Ok(())
}
