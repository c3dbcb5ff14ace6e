//! SoundFont loading and sharing

use crate::config::SynthConfig;
use crate::error::{Error, Result};
use crate::soundfont::SoundFontSynth;
use core::sync::atomic::{AtomicUsize, Ordering};
use dashmap::DashMap;
use rustysynth::SoundFont;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Key of a parsed SoundFont inside a [`SoundFontLibrary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SoundFontHandle(usize);

impl SoundFontHandle {
    pub fn id(&self) -> usize {
        self.0
    }
}

/// Cache of parsed SoundFonts, so one file backs any number of engines.
///
/// Shareable across threads; lookups never block loads of other files.
#[derive(Default)]
pub struct SoundFontLibrary {
    fonts: DashMap<SoundFontHandle, Arc<SoundFont>>,
    by_path: DashMap<PathBuf, SoundFontHandle>,
    next_id: AtomicUsize,
}

impl SoundFontLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.sf2` file. Loading the same path again reuses the first parse.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<SoundFontHandle> {
        let path = path.as_ref();
        if let Some(cached) = self.by_path.get(path) {
            return Ok(*cached);
        }

        let mut reader = BufReader::new(File::open(path)?);
        let soundfont = parse(&mut reader, &path.display().to_string())?;
        let handle = self.insert(soundfont);
        self.by_path.insert(path.to_path_buf(), handle);
        Ok(handle)
    }

    /// Parse SoundFont bytes. Every call yields a new handle.
    pub fn load_bytes(&self, data: &[u8]) -> Result<SoundFontHandle> {
        let mut reader = data;
        let soundfont = parse(&mut reader, "memory")?;
        Ok(self.insert(soundfont))
    }

    fn insert(&self, soundfont: SoundFont) -> SoundFontHandle {
        let handle = SoundFontHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.fonts.insert(handle, Arc::new(soundfont));
        handle
    }

    pub fn get(&self, handle: &SoundFontHandle) -> Option<Arc<SoundFont>> {
        self.fonts.get(handle).map(|font| Arc::clone(font.value()))
    }

    /// New engine playing a cached SoundFont.
    pub fn synth(&self, handle: &SoundFontHandle, config: &SynthConfig) -> Result<SoundFontSynth> {
        match self.get(handle) {
            Some(soundfont) => SoundFontSynth::new(soundfont, config),
            None => Err(Error::SoundFont(format!(
                "SoundFont {} is not loaded",
                handle.id()
            ))),
        }
    }

    /// Forget a SoundFont. Engines built from it keep playing.
    pub fn unload(&self, handle: &SoundFontHandle) -> bool {
        self.by_path.retain(|_, cached| cached != handle);
        self.fonts.remove(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Loaded handles in load order.
    pub fn handles(&self) -> Vec<SoundFontHandle> {
        let mut handles: Vec<SoundFontHandle> = self.fonts.iter().map(|font| *font.key()).collect();
        handles.sort_by_key(SoundFontHandle::id);
        handles
    }
}

fn parse<R: Read>(reader: &mut R, source: &str) -> Result<SoundFont> {
    let soundfont = SoundFont::new(reader)
        .map_err(|e| Error::SoundFont(format!("Could not load SoundFont ({}): {}", source, e)))?;
    debug!(
        "Loaded SoundFont from {}: {} presets",
        source,
        soundfont.get_presets().len()
    );
    Ok(soundfont)
}
