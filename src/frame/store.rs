//! Frame storage: numbered image files on disk and in-memory sequences.
//!
//! Sequences are 1-based and contiguous. On disk a frame is addressed as
//! `<dir>/<prefix><zero-padded index>.<extension>`, e.g. `frame_0030.png`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ResourceError, Result};
use crate::frame::types::Frame;

/// File naming convention for numbered frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameNaming {
    pub prefix: String,
    pub extension: String,
    pub index_width: usize,
}

impl Default for FrameNaming {
    fn default() -> Self {
        Self {
            prefix: "frame_".to_string(),
            extension: "png".to_string(),
            index_width: 4,
        }
    }
}

impl FrameNaming {
    pub fn file_name(&self, index: usize) -> String {
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            self.extension,
            width = self.index_width
        )
    }
}

/// Anything that can hand out source frames by 1-based index
pub trait FrameSource: Sync {
    /// Number of frames in the contiguous run `1..=len`
    fn len(&self) -> usize;

    /// Load frame `index` (1-based)
    fn load(&self, index: usize) -> Result<Frame>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, index: usize) -> bool {
        index >= 1 && index <= self.len()
    }
}

/// Receiver of output frames, numbered contiguously from 1 in push order
pub trait FrameSink {
    fn push(&mut self, frame: Frame) -> Result<()>;

    /// Frames accepted so far
    fn written(&self) -> usize;
}

/// An in-memory sequence; works both as a source and as a sink
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySequence {
    frames: Vec<Frame>,
}

impl MemorySequence {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Frame by 1-based index
    pub fn get(&self, index: usize) -> Option<&Frame> {
        index.checked_sub(1).and_then(|i| self.frames.get(i))
    }
}

impl From<Vec<Frame>> for MemorySequence {
    fn from(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl FromIterator<Frame> for MemorySequence {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl FrameSource for MemorySequence {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn load(&self, index: usize) -> Result<Frame> {
        self.get(index).cloned().ok_or_else(|| {
            ResourceError::SourceOutOfRange {
                index,
                len: self.frames.len(),
            }
            .into()
        })
    }
}

impl FrameSink for MemorySequence {
    fn push(&mut self, frame: Frame) -> Result<()> {
        self.frames.push(frame);
        Ok(())
    }

    fn written(&self) -> usize {
        self.frames.len()
    }
}

/// Numbered frames inside a directory
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
    naming: FrameNaming,
    len: usize,
}

impl FrameStore {
    /// Open a directory and measure its contiguous run of frames starting at 1
    pub fn open<P: AsRef<Path>>(dir: P, naming: FrameNaming) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ResourceError::MissingFrame {
                index: 1,
                path: dir.join(naming.file_name(1)).display().to_string(),
            }
            .into());
        }

        let mut len = 0;
        while dir.join(naming.file_name(len + 1)).is_file() {
            len += 1;
        }

        if dir.join(naming.file_name(len + 2)).is_file() {
            warn!(
                "Frame {} is missing in {:?}; frames after the gap are ignored",
                len + 1,
                dir
            );
        }

        info!("Opened frame store {:?} with {} frames", dir, len);
        Ok(Self { dir, naming, len })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(self.naming.file_name(index))
    }
}

impl FrameSource for FrameStore {
    fn len(&self) -> usize {
        self.len
    }

    fn load(&self, index: usize) -> Result<Frame> {
        let path = self.path_for(index);
        if !self.contains(index) || !path.is_file() {
            return Err(ResourceError::MissingFrame {
                index,
                path: path.display().to_string(),
            }
            .into());
        }
        debug!("Loading source frame {} from {:?}", index, path);
        Frame::open(&path)
    }
}

/// Writes output frames into a freshly cleared directory
///
/// **Destructive**: [`FrameWriter::create`] deletes the target directory and
/// everything inside it before recreating it empty. There is no append mode.
#[derive(Debug)]
pub struct FrameWriter {
    dir: PathBuf,
    naming: FrameNaming,
    written: usize,
}

impl FrameWriter {
    pub fn create<P: AsRef<Path>>(dir: P, naming: FrameNaming) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() {
            warn!("Clearing output directory {:?} (existing contents are deleted)", dir);
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            naming,
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSink for FrameWriter {
    fn push(&mut self, frame: Frame) -> Result<()> {
        let index = self.written + 1;
        let path = self.dir.join(self.naming.file_name(index));
        frame.save(&path)?;
        self.written = index;
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }
}
