//! Streaming WAV-file [`Transport`] sink, used by the CLI's `run`
//! subcommand to capture a mix to disk and by tests that want to
//! inspect the final rendered audio.

use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::{Error, Result, Transport};

/// Writes every queued frame straight through to a 16-bit PCM WAV file.
/// Always reports itself connected and idle (no backpressure, no voice
/// activity) since there is no downstream consumer to model.
pub struct WavSinkTransport {
    writer: Option<WavWriter<std::io::BufWriter<std::fs::File>>>,
    path: PathBuf,
    frames_written: u64,
}

impl WavSinkTransport {
    /// Opens `path` for writing 48 kHz stereo 16-bit PCM.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(&path, spec).map_err(|source| Error::Wav {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            writer: Some(writer),
            path,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flushes and closes the file. Called automatically on drop, but
    /// exposed so callers can observe a finalization error.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(|source| Error::Wav {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl Transport for WavSinkTransport {
    fn queue_frame(&mut self, bytes: &[u8]) -> bool {
        let Some(writer) = self.writer.as_mut() else {
            return false;
        };
        for chunk in bytes.chunks_exact(2) {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            if writer.write_sample(sample).is_err() {
                return false;
            }
        }
        self.frames_written += 1;
        true
    }

    fn buffered_frames(&self) -> usize {
        0
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    fn ensure_connected(&mut self) {}

    fn has_voice_activity(&self) -> bool {
        false
    }
}

impl Drop for WavSinkTransport {
    fn drop(&mut self) {
        if self.writer.is_some() {
            let _ = self.finalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_interleaved_pcm_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        {
            let mut sink = WavSinkTransport::create(&path).unwrap();
            let frame: Vec<u8> = (0..1920i16 * 2)
                .flat_map(|i| (i % 100).to_le_bytes())
                .collect();
            assert!(sink.queue_frame(&frame));
            assert_eq!(sink.frames_written(), 1);
            sink.finalize().unwrap();
        }
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 48_000);
        assert_eq!(reader.len(), 1920 * 2);
    }

    #[test]
    fn queue_after_finalize_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("closed.wav");
        let mut sink = WavSinkTransport::create(&path).unwrap();
        sink.finalize().unwrap();
        assert!(!sink.queue_frame(&[0, 0, 0, 0]));
    }
}
