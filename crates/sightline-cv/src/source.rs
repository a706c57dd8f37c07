//! Frame providers
//!
//! The provider variant is chosen once from configuration and never changes
//! while the pipeline runs.

use crate::Result;
use crate::traits::FrameSource;
use crate::utils::ImageUtils;
use anyhow::{Context, bail};
use image::RgbImage;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions picked up from an image directory
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// One captured frame at model input resolution
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

/// Where frames come from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Solid black frames, for tensor replay and tests.
    #[default]
    Blank,
    /// The same still image every cycle.
    Still { path: PathBuf },
    /// Every image of a directory in file name order, looping.
    Directory { dir: PathBuf },
}

/// Frame source selected from a [`SourceConfig`]
#[derive(Debug, Clone)]
pub struct FrameProvider {
    provider: Provider,
    next_index: u64,
}

#[derive(Debug, Clone)]
enum Provider {
    Blank {
        width: u32,
        height: u32,
    },
    Still {
        image: RgbImage,
    },
    Directory {
        paths: Vec<PathBuf>,
        width: u32,
        height: u32,
        cursor: usize,
    },
}

impl FrameProvider {
    /// Build the provider for `config`, producing `width` x `height` frames.
    pub fn from_config(config: &SourceConfig, width: u32, height: u32) -> Result<Self> {
        let provider = match config {
            SourceConfig::Blank => Provider::Blank { width, height },
            SourceConfig::Still { path } => Provider::Still {
                image: ImageUtils::fit_to_input(ImageUtils::load_rgb(path)?, width, height),
            },
            SourceConfig::Directory { dir } => {
                let paths = list_images(dir)?;
                if paths.is_empty() {
                    bail!("No images found in {:?}", dir);
                }
                Provider::Directory {
                    paths,
                    width,
                    height,
                    cursor: 0,
                }
            }
        };

        Ok(Self {
            provider,
            next_index: 0,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self.provider {
            Provider::Blank { .. } => "blank",
            Provider::Still { .. } => "still",
            Provider::Directory { .. } => "directory",
        }
    }

    fn next_image(&mut self) -> Result<RgbImage> {
        match &mut self.provider {
            Provider::Blank { width, height } => Ok(RgbImage::new(*width, *height)),
            Provider::Still { image } => Ok(image.clone()),
            Provider::Directory {
                paths,
                width,
                height,
                cursor,
            } => {
                let path = &paths[*cursor];
                *cursor = (*cursor + 1) % paths.len();
                debug!("Reading frame from {:?}", path);
                Ok(ImageUtils::fit_to_input(
                    ImageUtils::load_rgb(path)?,
                    *width,
                    *height,
                ))
            }
        }
    }
}

impl FrameSource for FrameProvider {
    fn next_frame(&mut self) -> Result<Frame> {
        let image = self.next_image()?;
        let frame = Frame {
            index: self.next_index,
            image,
        };
        self.next_index += 1;
        Ok(frame)
    }
}

/// Image files directly inside `dir`, sorted by file name
pub fn list_images<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let supported = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));

        if supported && path.is_file() {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
