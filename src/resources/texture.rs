//! The texture resource cache.
//!
//! Maps texture identifiers to uploaded textures. An identifier is one of
//!
//! - an alias registered by the engine (`"global"`, `"particle"`, ...)
//! - a resource in `domain:relative/path.png` form, looked up under
//!   `<resource_root>/assets/<domain>/relative/path.png`
//! - a plain path relative to the resource root
//! - a URL (anything containing `://`), downloaded once and decoded as a
//!   still image or, for `image/gif`, as an animation
//!
//! The first resolution of an identifier does all the work; every later one
//! is a map lookup. Nothing is ever evicted or retried: failures are cached
//! as the missing texture so a broken link costs one request per process.

use std::{
    collections::HashMap,
    io::Read,
    path::{Component, Path, PathBuf},
};

use image::RgbaImage;
use instant::Duration;
use reqwest::Url;

use crate::{
    backend::Backend,
    config::RenderConfig,
    data_structures::{
        handle::TextureHandle,
        renderable::{GLOBAL_TEXTURE_NAME, PARTICLE_TEXTURE_NAME},
        texture::missing_texture_image,
    },
    error::TextureError,
    resources::{
        animation::{AnimatedSequence, AnimationFrame, decode_gif},
        fetch::{ContentKind, Fetcher, accepted_content_types, classify},
    },
};

#[derive(Clone, Debug, PartialEq)]
pub enum TextureEntry {
    /// A local resource, or the fallback if it could not be loaded.
    Static(TextureHandle),
    /// A downloaded still image, or the fallback together with the reason.
    Remote {
        handle: TextureHandle,
        error: Option<TextureError>,
    },
    Animated(AnimatedSequence),
}

impl TextureEntry {
    pub fn handle_at(&self, elapsed: Duration) -> TextureHandle {
        match self {
            TextureEntry::Static(handle) => *handle,
            TextureEntry::Remote { handle, .. } => *handle,
            TextureEntry::Animated(sequence) => sequence.texture_at(elapsed),
        }
    }

    pub fn error(&self) -> Option<&TextureError> {
        match self {
            TextureEntry::Remote { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}

/// Outcome of resolving an identifier. `handle` is always usable.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub handle: TextureHandle,
    pub error: Option<TextureError>,
}

pub struct TextureCache<B: Backend> {
    textures: Vec<B::Texture>,
    entries: HashMap<String, TextureEntry>,
    aliases: HashMap<String, TextureHandle>,
    missing: TextureHandle,
    resource_root: PathBuf,
    accepted: Vec<String>,
    fetcher: Box<dyn Fetcher>,
}

impl<B: Backend> TextureCache<B> {
    /// Uploads the fallback texture; it is handle 0 for the cache's lifetime.
    pub fn new(
        backend: &mut B,
        config: &RenderConfig,
        fetcher: Box<dyn Fetcher>,
    ) -> anyhow::Result<Self> {
        let missing = backend.upload_texture(
            &missing_texture_image(config.missing_texture_size),
            "missing texture",
        )?;
        Ok(Self {
            textures: vec![missing],
            entries: HashMap::new(),
            aliases: HashMap::new(),
            missing: TextureHandle(0),
            resource_root: config.resource_root.clone(),
            accepted: accepted_content_types(),
            fetcher,
        })
    }

    pub fn missing_texture(&self) -> TextureHandle {
        self.missing
    }

    /// Content types a remote texture may be served with.
    pub fn accepted_content_types(&self) -> &[String] {
        &self.accepted
    }

    /// Number of resolved identifiers, aliases excluded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.aliases.contains_key(identifier) || self.entries.contains_key(identifier)
    }

    pub fn entry(&self, identifier: &str) -> Option<&TextureEntry> {
        self.entries.get(identifier)
    }

    /// Number of uploaded textures, the fallback and alias textures included.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&B::Texture> {
        self.textures.get(handle.index())
    }

    /// Uploads `image` and makes `alias` resolve to it.
    pub fn register_alias(
        &mut self,
        backend: &mut B,
        alias: &str,
        image: &RgbaImage,
    ) -> anyhow::Result<TextureHandle> {
        let texture = backend.upload_texture(image, alias)?;
        let handle = self.push(texture);
        self.aliases.insert(alias.to_string(), handle);
        Ok(handle)
    }

    /// Resolves `identifier`, loading it on first use.
    ///
    /// `elapsed` selects the frame of animated textures.
    pub fn resolve(&mut self, backend: &mut B, identifier: &str, elapsed: Duration) -> Resolution {
        if let Some(&handle) = self.aliases.get(identifier) {
            return Resolution {
                handle,
                error: None,
            };
        }
        if !self.entries.contains_key(identifier) {
            let entry = self.load(backend, identifier);
            self.entries.insert(identifier.to_string(), entry);
        }
        let entry = &self.entries[identifier];
        Resolution {
            handle: entry.handle_at(elapsed),
            error: entry.error().cloned(),
        }
    }

    /// Resolves and binds `identifier` for the next draw.
    ///
    /// Something is always bound. `Err` means the fallback texture was bound
    /// in its place.
    pub fn bind(
        &mut self,
        backend: &mut B,
        identifier: &str,
        elapsed: Duration,
    ) -> Result<TextureHandle, TextureError> {
        let Resolution { handle, error } = self.resolve(backend, identifier, elapsed);
        backend.bind_texture(&self.textures[handle.index()]);
        backend.state_mut().bound_texture = Some(handle);
        match error {
            Some(error) => Err(error),
            None => Ok(handle),
        }
    }

    /// Downloads a remote texture ahead of its first draw.
    ///
    /// Only the call that performs the download reports its failure; an
    /// identifier that is already cached returns `Ok` without any I/O.
    pub fn download(&mut self, backend: &mut B, url: &str) -> Result<(), TextureError> {
        if self.contains(url) {
            return Ok(());
        }
        let entry = self.load_remote(backend, url);
        let result = match entry.error() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        };
        self.entries.insert(url.to_string(), entry);
        result
    }

    /// Where a local identifier is looked up.
    ///
    /// Identifiers come from content packs, so the result always stays under
    /// the resource root: leading `/` are dropped and any `..` component
    /// makes the identifier unresolvable (`None`).
    pub fn local_path(&self, identifier: &str) -> Option<PathBuf> {
        let relative = match identifier.split_once(':') {
            Some((domain, path)) => format!("assets/{domain}/{}", path.replace(':', "/")),
            None => identifier.to_string(),
        };
        let mut path = self.resource_root.clone();
        for component in Path::new(&relative).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir | Component::RootDir => {}
                Component::ParentDir | Component::Prefix(_) => return None,
            }
        }
        Some(path)
    }

    fn push(&mut self, texture: B::Texture) -> TextureHandle {
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(texture);
        handle
    }

    fn upload(
        &mut self,
        backend: &mut B,
        image: &RgbaImage,
        label: &str,
    ) -> Result<TextureHandle, TextureError> {
        let texture = backend
            .upload_texture(image, label)
            .map_err(|e| upload_error(label, e))?;
        Ok(self.push(texture))
    }

    fn load(&mut self, backend: &mut B, identifier: &str) -> TextureEntry {
        if identifier.contains("://") {
            self.load_remote(backend, identifier)
        } else if identifier == GLOBAL_TEXTURE_NAME || identifier == PARTICLE_TEXTURE_NAME {
            log::warn!("Texture alias {identifier} was never registered. Reverting to fallback texture.");
            TextureEntry::Static(self.missing)
        } else {
            TextureEntry::Static(self.load_local(backend, identifier))
        }
    }

    fn load_local(&mut self, backend: &mut B, identifier: &str) -> TextureHandle {
        let Some(path) = self.local_path(identifier) else {
            log::warn!("Texture {identifier} points outside the resource root. Reverting to fallback texture.");
            return self.missing;
        };
        if !path.is_file() {
            log::warn!("{}", TextureError::ResourceNotFound(path.display().to_string()));
            return self.missing;
        }
        let image = match image::open(&path) {
            Ok(image) => image.to_rgba8(),
            Err(e) => {
                log::warn!("{} ({})", TextureError::decode(e), path.display());
                return self.missing;
            }
        };
        match self.upload(backend, &image, identifier) {
            Ok(handle) => {
                log::debug!("Loaded texture {identifier} from {}", path.display());
                handle
            }
            Err(e) => {
                log::warn!("{e}");
                self.missing
            }
        }
    }

    fn load_remote(&mut self, backend: &mut B, identifier: &str) -> TextureEntry {
        match self.fetch_remote(backend, identifier) {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!("{error}");
                TextureEntry::Remote {
                    handle: self.missing,
                    error: Some(error),
                }
            }
        }
    }

    fn fetch_remote(&mut self, backend: &mut B, identifier: &str) -> Result<TextureEntry, TextureError> {
        let url = Url::parse(identifier).map_err(|e| TextureError::MalformedUrl {
            url: identifier.to_string(),
            reason: e.to_string(),
        })?;
        let fetched = self.fetcher.fetch(&url)?;
        let kind = classify(fetched.content_type.as_deref(), &self.accepted)?;

        let mut bytes = Vec::new();
        let mut body = fetched.body;
        body.read_to_end(&mut bytes)
            .map_err(|e| TextureError::Network {
                url: identifier.to_string(),
                reason: e.to_string(),
            })?;

        match kind {
            ContentKind::Animated => {
                let decoded = decode_gif(&bytes)?;
                // Upload everything before touching the arena so a failure
                // halfway leaves no unreachable frames behind.
                let mut uploaded = Vec::with_capacity(decoded.len());
                for (index, frame) in decoded.iter().enumerate() {
                    let label = format!("{identifier}#{index}");
                    let texture = backend
                        .upload_texture(&frame.image, &label)
                        .map_err(|e| upload_error(&label, e))?;
                    uploaded.push(texture);
                }
                let frames: Vec<_> = uploaded
                    .into_iter()
                    .zip(decoded)
                    .map(|(texture, frame)| AnimationFrame {
                        texture: self.push(texture),
                        delay: frame.delay,
                    })
                    .collect();
                log::info!("Decoded {} animation frames from {identifier}", frames.len());
                Ok(TextureEntry::Animated(AnimatedSequence::new(frames)?))
            }
            ContentKind::Still => {
                let image = image::load_from_memory(&bytes)
                    .map_err(TextureError::decode)?
                    .to_rgba8();
                let handle = self.upload(backend, &image, identifier)?;
                Ok(TextureEntry::Remote {
                    handle,
                    error: None,
                })
            }
        }
    }
}

fn upload_error(label: &str, err: anyhow::Error) -> TextureError {
    TextureError::Upload {
        label: label.to_string(),
        reason: format!("{err:#}"),
    }
}
