use std::fs::File;
use std::io;
use std::path::Path;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Whisper's required sample rate
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to decode audio: {0}")]
    Decode(#[from] SymphoniaError),
    #[error("No decodable audio track found")]
    NoAudioTrack,
    #[error("Audio track does not declare a sample rate")]
    UnknownSampleRate,
    #[error("Failed to resample audio: {0}")]
    Resample(String),
    #[error("No audio data found in file")]
    NoAudioData,
}

/// Audio data prepared for Whisper transcription
#[derive(Debug, Clone)]
pub struct PreparedAudio {
    /// Audio samples at 16kHz mono, normalized to [-1.0, 1.0]
    pub samples_16khz: Vec<f32>,
    /// Sample rate of the source file
    pub source_sample_rate: u32,
    /// Channel count of the source file
    pub source_channels: usize,
    /// Duration in seconds
    pub duration_secs: f32,
}

/// Decode an audio file into 16kHz mono samples.
///
/// The container and codec are probed by symphonia; the file extension is
/// only used as a hint.
pub fn load_audio_file(path: &Path) -> Result<PreparedAudio, AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;
    let track_id = track.id;
    let source_sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::UnknownSampleRate)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())?;

    let mut mono = Vec::new();
    let mut source_channels = 1;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                source_channels = channels;

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                mono.extend(downmix_to_mono(buf.samples(), channels));
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // A corrupt packet is skipped, the rest of the stream is still usable
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if mono.is_empty() {
        return Err(AudioError::NoAudioData);
    }

    debug!(
        "Decoded {} samples at {}Hz ({} channel(s))",
        mono.len(),
        source_sample_rate,
        source_channels
    );

    let samples_16khz = resample_to_16k(&mono, source_sample_rate)?;
    let duration_secs = samples_16khz.len() as f32 / WHISPER_SAMPLE_RATE as f32;

    info!(
        "Prepared {:?}: {:.1}s of audio ({}Hz -> {}Hz)",
        path.file_name().unwrap_or_default(),
        duration_secs,
        source_sample_rate,
        WHISPER_SAMPLE_RATE
    );

    Ok(PreparedAudio {
        samples_16khz,
        source_sample_rate,
        source_channels,
        duration_secs,
    })
}

/// Average interleaved frames down to a single channel
fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Frames fed to the resampler per call
const RESAMPLE_CHUNK_FRAMES: usize = 4096;

/// Resample mono samples to Whisper's 16kHz.
///
/// Works through the input in fixed-size chunks so long recordings are not
/// copied into one resampler buffer. The filter delay is trimmed and the
/// output is cut to the exact resampled length.
fn resample_to_16k(samples: &[f32], from_sample_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_sample_rate == WHISPER_SAMPLE_RATE {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = WHISPER_SAMPLE_RATE as f64 / from_sample_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK_FRAMES, 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut resampled = Vec::with_capacity(expected_len + delay + resampler.output_frames_max());

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK_FRAMES);
    for chunk in &mut chunks {
        let waves_out = resampler
            .process(&[chunk][..], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        resampled.extend_from_slice(&waves_out[0]);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let waves_out = resampler
            .process_partial(Some(&[tail][..]), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        resampled.extend_from_slice(&waves_out[0]);
    }

    // Flush the samples still held back by the filter delay
    while resampled.len() < expected_len + delay {
        let waves_out = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if waves_out[0].is_empty() {
            break;
        }
        resampled.extend_from_slice(&waves_out[0]);
    }

    resampled.drain(..delay.min(resampled.len()));
    resampled.truncate(expected_len);

    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: u16, frames: usize) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..frames {
            let value = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_downmix_stereo() {
        let mono = downmix_to_mono(&[0.5, -0.5, 1.0, 0.0], 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let mono = downmix_to_mono(&[0.1, 0.2, 0.3], 1);
        assert_eq!(mono, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_load_16k_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "speech.wav", 16000, 1, 16000);

        let audio = load_audio_file(&path).unwrap();

        assert_eq!(audio.source_sample_rate, 16000);
        assert_eq!(audio.source_channels, 1);
        assert_eq!(audio.samples_16khz.len(), 16000);
        assert!((audio.duration_secs - 1.0).abs() < 0.001);
        assert!(audio.samples_16khz.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_load_stereo_wav_is_resampled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "call.wav", 8000, 2, 8000);

        let audio = load_audio_file(&path).unwrap();

        assert_eq!(audio.source_sample_rate, 8000);
        assert_eq!(audio.source_channels, 2);
        assert_eq!(audio.samples_16khz.len(), 16000);
        assert!((audio.duration_secs - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_resample_spans_many_chunks_with_tail() {
        // 3.5 chunks at 44.1kHz, so the last call is a partial one
        let frames = RESAMPLE_CHUNK_FRAMES * 3 + RESAMPLE_CHUNK_FRAMES / 2;
        let samples: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();

        let resampled = resample_to_16k(&samples, 44100).unwrap();

        let expected = (frames as f64 * 16000.0 / 44100.0).round() as usize;
        assert_eq!(resampled.len(), expected);
        assert!(resampled.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    }

    #[test]
    fn test_resample_shorter_than_one_chunk() {
        let samples = vec![0.25f32; 1000];

        let resampled = resample_to_16k(&samples, 48000).unwrap();

        assert_eq!(resampled.len(), 333);
    }

    #[test]
    fn test_resample_noop_at_16k() {
        let samples = vec![0.1f32, -0.1, 0.2];
        assert_eq!(resample_to_16k(&samples, 16000).unwrap(), samples);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_audio_file(Path::new("does/not/exist.ogg"));
        assert!(matches!(result, Err(AudioError::Io(_))));
    }

    #[test]
    fn test_load_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.ogg");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(load_audio_file(&path).is_err());
    }
}
