use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::model::TrainedModel;
use crate::types::DetectionResult;

/// Serializes an object to a pretty-printed JSON file.
pub fn object_to_json<T: Serialize>(output_path: impl AsRef<Path>, object: &T) -> std::io::Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> std::io::Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Caches extracted training features so they need not be recomputed.
///
/// The extractor configuration is not stored; load the model with the
/// same configuration it was trained with.
pub fn save_model(output_path: impl AsRef<Path>, model: &TrainedModel) -> std::io::Result<()> {
    object_to_json(output_path, model)
}

/// Loads a model written by [`save_model`], re-checking the size invariant.
pub fn load_model(file_path: impl AsRef<Path>) -> std::io::Result<TrainedModel> {
    let model: TrainedModel = object_from_json(file_path)?;
    TrainedModel::from_processed(model.into_images())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[derive(Debug, Serialize)]
struct FrameReport<'a> {
    frame: usize,
    name: &'a str,
    #[serde(flatten)]
    result: &'a DetectionResult,
}

#[derive(Debug, Serialize)]
struct DetectionReport<'a> {
    frames: Vec<FrameReport<'a>>,
    found: usize,
    bridged: usize,
    duration_sec: f64,
    fps: f64,
}

/// Writes per-frame results and throughput as JSON.
///
/// `results` pairs a frame name with its result, in frame order.
pub fn write_report(
    output_path: impl AsRef<Path>,
    results: &[(String, DetectionResult)],
    duration_sec: f64,
) -> std::io::Result<()> {
    let frames: Vec<FrameReport> = results
        .iter()
        .enumerate()
        .map(|(frame, (name, result))| FrameReport {
            frame,
            name,
            result,
        })
        .collect();
    let fps = if duration_sec > 0.0 {
        results.len() as f64 / duration_sec
    } else {
        0.0
    };
    let report = DetectionReport {
        found: results.iter().filter(|(_, r)| r.found()).count(),
        bridged: results.iter().filter(|(_, r)| r.bridged).count(),
        frames,
        duration_sec,
        fps,
    };
    object_to_json(output_path, &report)
}
