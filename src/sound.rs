//! Fire-and-forget sound cues
//!
//! A cpal output stream mixes a handful of square-wave voices with linear
//! pitch sweeps and decay envelopes; the game pushes voices and never waits.
//! The game-over jingle is a note sequence advanced by the per-frame
//! `update()` tick. Without an output device (or on wasm) every call is a
//! no-op.

#[cfg(not(target_arch = "wasm32"))]
mod engine {
    use std::sync::{Arc, Mutex};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleRate, Stream, StreamConfig};

    pub const SAMPLE_RATE: u32 = 44100;

    /// Descending jingle played on game over, one note per update step.
    const GAME_OVER_NOTES: [f32; 8] = [659.3, 587.3, 523.3, 440.0, 392.0, 329.6, 261.6, 196.0];
    const GAME_OVER_STEP_FRAMES: u8 = 8;

    struct Voice {
        freq_start: f32,
        freq_end: f32,
        len: u32,
        pos: u32,
        vol: f32,
        phase: f32,
    }

    impl Voice {
        fn next_sample(&mut self) -> f32 {
            let t = self.pos as f32 / self.len as f32;
            let freq = self.freq_start + (self.freq_end - self.freq_start) * t;
            self.phase = (self.phase + freq / SAMPLE_RATE as f32).fract();
            self.pos += 1;
            let amp = self.vol * (1.0 - t);
            if self.phase < 0.5 {
                amp
            } else {
                -amp
            }
        }
    }

    /// Voice list shared with the audio callback.
    struct MixerState {
        voices: Vec<Voice>,
    }

    pub struct SoundEngine {
        state: Arc<Mutex<MixerState>>,
        _stream: Option<Stream>,
        jingle_step: Option<usize>,
        jingle_timer: u8,
    }

    impl SoundEngine {
        pub fn new() -> Self {
            let state = Arc::new(Mutex::new(MixerState { voices: Vec::new() }));
            let stream = Self::init_stream(Arc::clone(&state));
            if stream.is_none() {
                println!("No audio output device, sound disabled");
            }
            Self {
                state,
                _stream: stream,
                jingle_step: None,
                jingle_timer: 0,
            }
        }

        fn init_stream(state: Arc<Mutex<MixerState>>) -> Option<Stream> {
            let host = cpal::default_host();
            let device = host.default_output_device()?;

            let config = StreamConfig {
                channels: 2,
                sample_rate: SampleRate(SAMPLE_RATE),
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut state = state.lock().unwrap();
                        for frame in data.chunks_mut(2) {
                            let mut sample = 0.0f32;
                            for voice in state.voices.iter_mut() {
                                sample += voice.next_sample();
                            }
                            let sample = sample.clamp(-1.0, 1.0);
                            for out in frame.iter_mut() {
                                *out = sample;
                            }
                        }
                        state.voices.retain(|v| v.pos < v.len);
                    },
                    |err| eprintln!("Audio stream error: {}", err),
                    None,
                )
                .ok()?;

            stream.play().ok()?;
            Some(stream)
        }

        fn push_voice(&self, freq_start: f32, freq_end: f32, seconds: f32, vol: f32) {
            let mut state = self.state.lock().unwrap();
            // Keep the mix bounded even if cues pile up.
            if state.voices.len() >= 8 {
                state.voices.remove(0);
            }
            state.voices.push(Voice {
                freq_start,
                freq_end,
                len: (seconds * SAMPLE_RATE as f32) as u32,
                pos: 0,
                vol,
                phase: 0.0,
            });
        }

        /// Low thunk when a fast drop begins.
        pub fn play_drop_sound(&self) {
            self.push_voice(170.0, 55.0, 0.10, 0.30);
        }

        /// Rising sweep plus a short high blip for a cleared layer.
        pub fn play_clear_level_sound(&self) {
            self.push_voice(330.0, 880.0, 0.22, 0.25);
            self.push_voice(1046.5, 1046.5, 0.07, 0.18);
        }

        pub fn start_game_over_sound(&mut self) {
            self.jingle_step = Some(0);
            self.jingle_timer = 0;
        }

        /// Per-frame tick: advances the game-over jingle sequencer.
        pub fn update(&mut self) {
            let Some(step) = self.jingle_step else {
                return;
            };
            if self.jingle_timer == 0 {
                let note = GAME_OVER_NOTES[step];
                self.push_voice(note, note * 0.97, 0.16, 0.22);
                self.jingle_step = if step + 1 < GAME_OVER_NOTES.len() {
                    Some(step + 1)
                } else {
                    None
                };
            }
            self.jingle_timer = (self.jingle_timer + 1) % GAME_OVER_STEP_FRAMES;
        }
    }

    impl Default for SoundEngine {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod engine {
    /// Stub engine for targets without cpal.
    pub struct SoundEngine;

    impl SoundEngine {
        pub fn new() -> Self {
            SoundEngine
        }
        pub fn play_drop_sound(&self) {}
        pub fn play_clear_level_sound(&self) {}
        pub fn start_game_over_sound(&mut self) {}
        pub fn update(&mut self) {}
    }

    impl Default for SoundEngine {
        fn default() -> Self {
            Self::new()
        }
    }
}

pub use engine::SoundEngine;
