//! Decoders for the supported formats

use super::AudioFormat;
use anyhow::{Context, Result};
use std::path::Path;

/// Decoded mono signal at its native sample rate
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub source_channels: u16,
}

impl AudioData {
    /// Downmix interleaved samples by averaging channels
    pub fn from_interleaved(interleaved: &[f32], sample_rate: u32, channels: u16) -> Self {
        let samples = if channels <= 1 {
            interleaved.to_vec()
        } else {
            interleaved
                .chunks(channels as usize)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        Self {
            samples,
            sample_rate,
            source_channels: channels.max(1),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Keep at most the first `seconds` of audio
    pub fn truncate(&mut self, seconds: f64) {
        let keep = (seconds.max(0.0) * self.sample_rate as f64) as usize;
        self.samples.truncate(keep);
    }
}

/// Decode an audio file to mono
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    if !path.exists() {
        anyhow::bail!("Audio file not found: {}", path.display());
    }

    let audio = match AudioFormat::from_path(path) {
        AudioFormat::Wav => decode_wav(path)?,
        AudioFormat::Mp3 => decode_mp3(path)?,
        AudioFormat::Flac => decode_flac(path)?,
        AudioFormat::Ogg => decode_ogg(path)?,
        AudioFormat::Unknown => anyhow::bail!("Unsupported audio format: {}", path.display()),
    };

    if audio.sample_rate == 0 {
        anyhow::bail!("No audio frames in {}", path.display());
    }

    log::info!(
        "Decoded {}: {:.1}s at {} Hz ({} channels)",
        path.display(),
        audio.duration_secs(),
        audio.sample_rate,
        audio.source_channels
    );

    Ok(audio)
}

fn decode_wav(path: &Path) -> Result<AudioData> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(AudioData::from_interleaved(&samples, spec.sample_rate, spec.channels))
}

fn decode_mp3(path: &Path) -> Result<AudioData> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read MP3 file: {}", path.display()))?;

    let mut decoder = minimp3::Decoder::new(&data[..]);
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                samples.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => anyhow::bail!("MP3 decode error in {}: {}", path.display(), e),
        }
    }

    Ok(AudioData::from_interleaved(&samples, sample_rate, channels))
}

fn decode_flac(path: &Path) -> Result<AudioData> {
    let mut reader = claxon::FlacReader::open(path)
        .with_context(|| format!("Failed to open FLAC file: {}", path.display()))?;

    let info = reader.streaminfo();
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;
    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AudioData::from_interleaved(&samples, info.sample_rate, info.channels as u16))
}

fn decode_ogg(path: &Path) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open OGG file: {}", path.display()))?;

    let mut reader = lewton::inside_ogg::OggStreamReader::new(file)
        .with_context(|| format!("Invalid OGG Vorbis stream: {}", path.display()))?;

    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();
    while let Some(packet) = reader.read_dec_packet_itl()? {
        samples.extend(packet.iter().map(|&s| s as f32 / 32768.0));
    }

    Ok(AudioData::from_interleaved(&samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_downmix_averages_channels() {
        let audio = AudioData::from_interleaved(&[0.5, -0.5, 1.0, 0.0], 44100, 2);

        assert_eq!(audio.samples, vec![0.0, 0.5]);
        assert_eq!(audio.source_channels, 2);
    }

    #[test]
    fn test_truncate() {
        let mut audio = AudioData::from_interleaved(&vec![0.1; 48000 * 3], 48000, 1);
        audio.truncate(2.0);

        assert_eq!(audio.samples.len(), 96000);
        assert_relative_eq!(audio.duration_secs(), 2.0);
    }

    #[test]
    fn test_decode_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..1000 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let audio = decode_audio(&path).unwrap();

        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.samples.len(), 1000);
        assert_relative_eq!(audio.samples[0], 0.25, epsilon = 1e-4);
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(decode_audio(&dir.path().join("absent.wav")).is_err());

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "not audio").unwrap();
        assert!(decode_audio(&text).is_err());
    }
}
