use crate::types::ImageSize;

/// Failure while building a [`crate::model::TrainedModel`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingError {
    /// No usable training image was supplied.
    EmptyTrainingSet,
    /// Training images must all share the size of the first one.
    InconsistentImageSize {
        index: usize,
        expected: ImageSize,
        found: ImageSize,
    },
    /// The training folder could not be enumerated.
    Folder { path: String, message: String },
}

impl std::fmt::Display for TrainingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTrainingSet => write!(f, "training set contains no usable image"),
            Self::InconsistentImageSize {
                index,
                expected,
                found,
            } => write!(
                f,
                "training image {} is {}, expected {} like the first image",
                index, found, expected
            ),
            Self::Folder { path, message } => {
                write!(f, "cannot read training folder {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for TrainingError {}

/// Per-frame problem. Never escapes `detect_in`; it degrades to "not found".
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    Empty { size: ImageSize },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty { size } => write!(f, "frame has no pixels ({})", size),
        }
    }
}

impl std::error::Error for FrameError {}
