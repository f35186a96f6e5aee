//! Ambience Registry - the sound-file registry (C1).
//!
//! Owns every decoded float32 stereo PCM buffer the engine can play,
//! keyed by an opaque string id. All decoding happens here, at
//! registry-construction (or explicit-load) time, never on the audio
//! thread — the mixer only ever does an id lookup into an already
//! immutable, shared buffer.

mod decode;
mod error;

pub use decode::{Decoder, TARGET_SAMPLE_RATE, WavDecoder};
pub use error::{Error, Result};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// A decoded, immutable sound file shared by every layer-sound that
/// references its id.
#[derive(Debug, Clone)]
pub struct SoundFile {
    id: String,
    name: String,
    original_filename: String,
    peak_volume: f32,
    duration_ms: u32,
    /// Interleaved stereo float32 PCM at 48 kHz, in `[-1.0, 1.0]`.
    pcm: Arc<Vec<f32>>,
    usage_count: Arc<AtomicU32>,
}

impl SoundFile {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// `max|sample|` across the decoded buffer; used for equal-peak
    /// normalization (spec §3, `effects.normalize`).
    pub fn peak_volume(&self) -> f32 {
        self.peak_volume
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Shared, immutable interleaved stereo PCM buffer.
    pub fn pcm(&self) -> &Arc<Vec<f32>> {
        &self.pcm
    }

    /// Number of stereo frames in the buffer.
    pub fn num_frames(&self) -> usize {
        self.pcm.len() / 2
    }

    /// Current usage count (times this file's sound was selected as the
    /// active sound, or triggered from the soundboard).
    pub fn usage_count(&self) -> u32 {
        self.usage_count.load(Ordering::Relaxed)
    }

    /// Increment the usage counter. Lock-free: callable from the audio
    /// thread without touching the mixer mutex.
    pub fn bump_usage(&self) {
        self.usage_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Registry of decoded sound files, keyed by id.
///
/// Reloading a workspace that references the same file ids never
/// re-decodes: entries are retained across `AppState` generations, and
/// only ids not already present trigger a fresh [`Self::load`].
pub struct SoundFileRegistry {
    decoders: Vec<Box<dyn Decoder>>,
    files: HashMap<String, SoundFile>,
}

impl SoundFileRegistry {
    /// Create a registry with the built-in WAV decoder registered.
    pub fn new() -> Self {
        Self {
            decoders: vec![Box::new(WavDecoder)],
            files: HashMap::new(),
        }
    }

    /// Register an additional decoder (e.g. for MP3/OGG support supplied
    /// by a downstream build).
    pub fn register_decoder(&mut self, decoder: Box<dyn Decoder>) {
        self.decoders.push(decoder);
    }

    fn decoder_for(&self, path: &Path) -> Result<&dyn Decoder> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        self.decoders
            .iter()
            .find(|d| d.extensions().contains(&ext.as_str()))
            .map(|d| d.as_ref())
            .ok_or_else(|| Error::UnsupportedFormat {
                path: path.to_path_buf(),
                supported: self
                    .decoders
                    .iter()
                    .flat_map(|d| d.extensions().iter().copied())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Decode and register a sound file under `id`, or return the
    /// already-loaded entry if `id` is already present (cross-reload
    /// buffer retention).
    pub fn load(
        &mut self,
        id: impl Into<String>,
        path: impl AsRef<Path>,
        original_filename: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<&SoundFile> {
        let id = id.into();
        if !self.files.contains_key(&id) {
            let path_ref: &Path = path.as_ref();
            let decoder = self.decoder_for(path_ref)?;
            let decoded = decoder.decode(path_ref)?;
            let peak_volume = decoded
                .interleaved
                .iter()
                .fold(0.0_f32, |acc, &s| acc.max(s.abs()));
            let duration_ms =
                ((decoded.num_frames() as f64) * 1000.0 / decoded.sample_rate as f64) as u32;

            let sound_file = SoundFile {
                id: id.clone(),
                name: name.into(),
                original_filename: original_filename.into(),
                peak_volume,
                duration_ms,
                pcm: Arc::new(decoded.interleaved),
                usage_count: Arc::new(AtomicU32::new(0)),
            };
            self.files.insert(id.clone(), sound_file);
        }
        Ok(self.files.get(&id).expect("just inserted"))
    }

    /// Look up an already-registered sound file by id.
    pub fn lookup(&self, id: &str) -> Option<&SoundFile> {
        self.files.get(id)
    }

    /// Drop a sound file from the registry. Used when a file is removed
    /// from the persisted workspace and is no longer referenced.
    pub fn remove(&mut self, id: &str) -> Option<SoundFile> {
        self.files.remove(id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|s| s.as_str())
    }
}

impl Default for SoundFileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a sound-file's on-disk path given an audio directory and id,
/// matching the reference layout of `{audio_dir}/{id}.{original_ext}`.
pub fn sound_file_path(audio_dir: &Path, id: &str, original_filename: &str) -> PathBuf {
    let ext = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("wav");
    audio_dir.join(format!("{id}.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * channels as usize {
            let sample = ((i % 100) as i16) * 100;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn load_and_lookup_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        write_test_wav(&path, 48_000, 2, 1000);

        let mut registry = SoundFileRegistry::new();
        let file = registry.load("abc", &path, "test.wav", "Test").unwrap();
        assert_eq!(file.id(), "abc");
        assert_eq!(file.num_frames(), 1000);
        assert!(registry.lookup("abc").is_some());
    }

    #[test]
    fn reload_same_id_does_not_redecode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        write_test_wav(&path, 48_000, 1, 500);

        let mut registry = SoundFileRegistry::new();
        registry.load("x", &path, "test.wav", "Test").unwrap();
        let first_ptr = Arc::as_ptr(registry.lookup("x").unwrap().pcm());

        // Remove the backing file, then "reload" the same id: since the
        // entry is already present, no decode is attempted.
        std::fs::remove_file(&path).unwrap();
        registry.load("x", &path, "test.wav", "Test").unwrap();
        let second_ptr = Arc::as_ptr(registry.lookup("x").unwrap().pcm());
        assert_eq!(first_ptr, second_ptr);
    }

    #[test]
    fn mono_upmixed_to_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_test_wav(&path, 48_000, 1, 200);

        let mut registry = SoundFileRegistry::new();
        let file = registry.load("m", &path, "mono.wav", "Mono").unwrap();
        assert_eq!(file.pcm().len(), 200 * 2);
    }

    #[test]
    fn usage_count_increments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.wav");
        write_test_wav(&path, 48_000, 2, 10);

        let mut registry = SoundFileRegistry::new();
        let file = registry.load("u", &path, "u.wav", "U").unwrap();
        assert_eq!(file.usage_count(), 0);
        file.bump_usage();
        file.bump_usage();
        assert_eq!(registry.lookup("u").unwrap().usage_count(), 2);
    }

    #[test]
    fn unsupported_extension_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp3");
        std::fs::File::create(&path).unwrap().write_all(b"id3").unwrap();

        let mut registry = SoundFileRegistry::new();
        let result = registry.load("mp3-1", &path, "clip.mp3", "Clip");
        assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
    }
}
