//! Image assets and the background loader that decodes them.
//!
//! Every texture the showroom needs (stand artwork, wipe patterns and the
//! environment map) is listed in an [`AssetManifest`]. [`AssetLoader::spawn`]
//! decodes the whole manifest on a worker thread and reports through
//! [`LoadEvent`]s that the frame driver polls once per tick. A load either
//! completes in full or fails; there is no partial set and no retry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use image::{Rgba32FImage, RgbaImage};
use log::{debug, info};

use crate::config::ShowroomConfig;
use crate::error::{Result, VitrineError};

/// A decoded image.
#[derive(Clone, Debug)]
pub enum Asset {
    /// 8-bit sRGB color.
    Image(RgbaImage),
    /// Linear floating point radiance.
    Hdr(Rgba32FImage),
}

impl Asset {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Asset::Image(image) => image.dimensions(),
            Asset::Hdr(image) => image.dimensions(),
        }
    }
}

/// Named assets resolved against a root directory.
#[derive(Clone, Debug)]
pub struct AssetManifest {
    root: PathBuf,
    names: Vec<String>,
}

impl AssetManifest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            names: Vec::new(),
        }
    }

    /// Artwork of every stand, every wipe pattern and the environment map.
    pub fn from_config(config: &ShowroomConfig) -> Self {
        let mut manifest = Self::new(&config.asset_root);
        for stand in &config.stands {
            manifest.push(&stand.texture);
        }
        for pattern in &config.transition.patterns {
            manifest.push(pattern);
        }
        manifest.push(&config.environment_map);
        manifest
    }

    /// Adds `name` unless it is already listed.
    pub fn push(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Decoded assets keyed by manifest name.
#[derive(Clone, Debug, Default)]
pub struct AssetSet {
    assets: HashMap<String, Asset>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, asset: Asset) {
        self.assets.insert(name.into(), asset);
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.get(name)
    }

    pub fn image(&self, name: &str) -> Option<&RgbaImage> {
        match self.assets.get(name)? {
            Asset::Image(image) => Some(image),
            Asset::Hdr(_) => None,
        }
    }

    pub fn hdr(&self, name: &str) -> Option<&Rgba32FImage> {
        match self.assets.get(name)? {
            Asset::Hdr(image) => Some(image),
            Asset::Image(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Asset)> {
        self.assets.iter().map(|(name, asset)| (name.as_str(), asset))
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress { loaded: usize, total: usize },
    Complete(AssetSet),
    Failed { name: String, reason: String },
}

/// Decodes one file. `.hdr` files keep their float radiance.
pub fn decode(path: &Path) -> std::result::Result<Asset, image::ImageError> {
    let is_hdr = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hdr"));
    let image = image::open(path)?;
    Ok(if is_hdr {
        Asset::Hdr(image.to_rgba32f())
    } else {
        Asset::Image(image.to_rgba8())
    })
}

/// Decodes every manifest entry in order, stopping at the first failure.
pub fn load_all(manifest: &AssetManifest, mut progress: impl FnMut(usize, usize)) -> Result<AssetSet> {
    let total = manifest.len();
    let mut set = AssetSet::new();
    for (index, name) in manifest.names().iter().enumerate() {
        let path = manifest.path(name);
        let asset = decode(&path).map_err(|e| VitrineError::AssetLoad {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        debug!("decoded {} ({:?})", path.display(), asset.dimensions());
        set.insert(name.clone(), asset);
        progress(index + 1, total);
    }
    Ok(set)
}

/// Handle to a manifest being decoded on a worker thread.
pub struct AssetLoader {
    events: Receiver<LoadEvent>,
    finished: bool,
}

impl AssetLoader {
    pub fn spawn(manifest: AssetManifest) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                let progress_tx = tx.clone();
                let event = match load_all(&manifest, |loaded, total| {
                    let _ = progress_tx.send(LoadEvent::Progress { loaded, total });
                }) {
                    Ok(set) => {
                        info!("loaded {} assets", set.len());
                        LoadEvent::Complete(set)
                    }
                    Err(VitrineError::AssetLoad { name, reason }) => LoadEvent::Failed { name, reason },
                    Err(other) => LoadEvent::Failed {
                        name: String::new(),
                        reason: other.to_string(),
                    },
                };
                let _ = tx.send(event);
            })?;
        Ok(Self {
            events: rx,
            finished: false,
        })
    }

    /// Next pending event, if any. After `Complete` or `Failed` this returns `None`.
    pub fn poll(&mut self) -> Option<LoadEvent> {
        if self.finished {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => {
                if matches!(event, LoadEvent::Complete(_) | LoadEvent::Failed { .. }) {
                    self.finished = true;
                }
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(LoadEvent::Failed {
                    name: String::new(),
                    reason: "asset loader stopped unexpectedly".to_string(),
                })
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
