// Audio output - host playback of the core's PCM stream via cpal
//
// The emulator's ring buffer lives inside the core and is drained on the
// main thread; this module owns the staging buffer shared with the cpal
// callback thread. Underruns play silence rather than blocking.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

/// Core output format: 44.1kHz interleaved stereo 16-bit LE
const SAMPLE_RATE: u32 = 44_100;
const CHANNELS: u16 = 2;

/// Cap on buffered audio (~0.37s) so pausing does not build up latency
const MAX_STAGED_BYTES: usize = 64 * 1024;

/// Handle to the host audio device and the staging queue feeding it
pub struct AudioOutput {
    _stream: Stream,
    staged: Arc<Mutex<VecDeque<u8>>>,
}

impl AudioOutput {
    /// Open the default output device at the core's sample rate
    pub fn new() -> Result<AudioOutput, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no audio output device available")?;
        log::info!(
            "audio device: {}",
            device.name().unwrap_or_else(|_| "unknown".into())
        );

        let config = StreamConfig {
            channels: CHANNELS,
            sample_rate: SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let staged = Arc::new(Mutex::new(VecDeque::new()));
        let callback_staged = Arc::clone(&staged);

        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let mut queue = callback_staged.lock().unwrap();
                    for sample in out.iter_mut() {
                        *sample = match (queue.pop_front(), queue.pop_front()) {
                            (Some(low), Some(high)) => i16::from_le_bytes([low, high]),
                            _ => 0, // starved: play silence
                        };
                    }
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| format!("failed to build audio stream: {}", e))?;

        stream
            .play()
            .map_err(|e| format!("failed to start audio stream: {}", e))?;

        Ok(AudioOutput {
            _stream: stream,
            staged,
        })
    }

    /// Queue PCM bytes for the device, dropping input once the staging
    /// buffer is full
    pub fn push_samples(&self, pcm: &[u8]) {
        let mut queue = self.staged.lock().unwrap();
        let room = MAX_STAGED_BYTES.saturating_sub(queue.len());
        queue.extend(pcm.iter().take(room).copied());
    }

    /// Bytes currently waiting for the device
    pub fn staged_bytes(&self) -> usize {
        self.staged.lock().unwrap().len()
    }
}
