//! Software audio mixer: a fixed table of voice slots behind one mutex.
//!
//! The main thread issues play/stop/volume/pause commands while the audio
//! callback thread drains the channels through `mix`. All channel state
//! lives behind a single `Mutex`, so every entry point serializes on it and
//! the callback never observes a half-updated channel.

use std::sync::Mutex;

use log::{debug, warn};

/// Fixed voice budget. Requests past this are dropped, not queued.
pub const NUM_CHANNELS: usize = 16;

/// Full volume on the 0..=255 scale used per channel and for the master.
pub const MAX_VOLUME: u8 = 255;

/// Source of mono signed 16-bit samples.
pub trait AudioStream: Send {
    /// Fill as much of `buffer` as possible, returning the sample count
    /// written. A short read is not necessarily the end of the stream.
    fn read_buffer(&mut self, buffer: &mut [i16]) -> usize;

    /// Whether the stream has no more samples to produce.
    fn end_of_data(&self) -> bool;
}

/// Ticket for a playing sound. Handles go stale once the channel ends or is
/// reused; commands through a stale handle are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundHandle {
    slot: usize,
    generation: u64,
}

struct Channel {
    sound_id: Option<u32>,
    stream: Box<dyn AudioStream>,
    volume: u8,
    paused: bool,
    generation: u64,
}

struct MixerState {
    channels: Vec<Option<Channel>>,
    master_volume: u8,
    paused: bool,
    next_generation: u64,
}

impl MixerState {
    fn channel_for_handle(&mut self, handle: SoundHandle) -> Option<&mut Channel> {
        self.channels[handle.slot]
            .as_mut()
            .filter(|channel| channel.generation == handle.generation)
    }
}

pub struct Mixer {
    state: Mutex<MixerState>,
}

impl Default for Mixer {
    fn default() -> Self {
        Mixer::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Mixer {
            state: Mutex::new(MixerState {
                channels: (0..NUM_CHANNELS).map(|_| None).collect(),
                master_volume: MAX_VOLUME,
                paused: false,
                next_generation: 1,
            }),
        }
    }

    /// Start a sound on the first free channel.
    ///
    /// A sound id already playing suppresses the new request, and a full
    /// channel table drops it with a warning; neither is an error to the
    /// caller.
    pub fn play_sound(
        &self,
        sound_id: Option<u32>,
        stream: Box<dyn AudioStream>,
        volume: u8,
    ) -> Option<SoundHandle> {
        let mut state = self.state.lock().unwrap();

        if let Some(id) = sound_id {
            let already_playing = state
                .channels
                .iter()
                .flatten()
                .any(|channel| channel.sound_id == Some(id));
            if already_playing {
                debug!("sound {id} already playing, request suppressed");
                return None;
            }
        }

        let Some(slot) = state.channels.iter().position(Option::is_none) else {
            warn!("all {NUM_CHANNELS} mixer channels busy, dropping sound {sound_id:?}");
            return None;
        };
        let generation = state.next_generation;
        state.next_generation += 1;
        state.channels[slot] = Some(Channel {
            sound_id,
            stream,
            volume,
            paused: false,
            generation,
        });
        Some(SoundHandle { slot, generation })
    }

    /// Stop the channel a handle refers to, if it is still that channel.
    pub fn stop_handle(&self, handle: SoundHandle) {
        let mut state = self.state.lock().unwrap();
        if state.channel_for_handle(handle).is_some() {
            state.channels[handle.slot] = None;
        }
    }

    /// Stop every channel playing the given sound id.
    pub fn stop_id(&self, sound_id: u32) {
        let mut state = self.state.lock().unwrap();
        for slot in state.channels.iter_mut() {
            if slot
                .as_ref()
                .is_some_and(|channel| channel.sound_id == Some(sound_id))
            {
                *slot = None;
            }
        }
    }

    pub fn stop_all(&self) {
        let mut state = self.state.lock().unwrap();
        for slot in state.channels.iter_mut() {
            *slot = None;
        }
    }

    pub fn set_channel_volume(&self, handle: SoundHandle, volume: u8) {
        let mut state = self.state.lock().unwrap();
        if let Some(channel) = state.channel_for_handle(handle) {
            channel.volume = volume;
        }
    }

    pub fn set_master_volume(&self, volume: u8) {
        self.state.lock().unwrap().master_volume = volume;
    }

    /// Pause or resume the whole mixer; channels keep their positions.
    pub fn pause_all(&self, paused: bool) {
        self.state.lock().unwrap().paused = paused;
    }

    pub fn pause_handle(&self, handle: SoundHandle, paused: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(channel) = state.channel_for_handle(handle) {
            channel.paused = paused;
        }
    }

    pub fn is_sound_active(&self, sound_id: u32) -> bool {
        self.state
            .lock()
            .unwrap()
            .channels
            .iter()
            .flatten()
            .any(|channel| channel.sound_id == Some(sound_id))
    }

    pub fn active_channels(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .channels
            .iter()
            .flatten()
            .count()
    }

    /// Whether a handle still refers to a live channel.
    pub fn is_handle_active(&self, handle: SoundHandle) -> bool {
        self.state.lock().unwrap().channel_for_handle(handle).is_some()
    }

    /// The audio callback: overwrite `buffer` with the sum of all playing
    /// channels, scaled by channel and master volume and clipped to the
    /// sample range. Channels whose streams report end of data are freed
    /// here, never by the command side.
    pub fn mix(&self, buffer: &mut [i16]) {
        buffer.fill(0);
        let mut state = self.state.lock().unwrap();
        if state.paused {
            return;
        }
        let master = state.master_volume as i32;

        let mut scratch = vec![0i16; buffer.len()];
        for slot in state.channels.iter_mut() {
            let Some(channel) = slot else { continue };
            if channel.paused {
                continue;
            }
            let read = channel.stream.read_buffer(&mut scratch);
            let gain = channel.volume as i32 * master;
            for (out, &sample) in buffer.iter_mut().zip(&scratch[..read]) {
                let mixed = *out as i32 + sample as i32 * gain / (255 * 255);
                *out = mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
            }
            if read < buffer.len() && channel.stream.end_of_data() {
                *slot = None;
            }
        }
    }
}

/// In-memory PCM stream, optionally looping over a sample range.
pub struct LinearStream {
    samples: Vec<i16>,
    pos: usize,
    loop_range: Option<(usize, usize)>,
}

impl LinearStream {
    pub fn new(samples: Vec<i16>) -> Self {
        LinearStream {
            samples,
            pos: 0,
            loop_range: None,
        }
    }

    /// Loop over `[loop_start, loop_end)` once playback reaches the loop
    /// end. The range is clamped to the sample data; an empty range
    /// disables looping.
    pub fn looping(samples: Vec<i16>, loop_start: usize, loop_end: usize) -> Self {
        let loop_end = loop_end.min(samples.len());
        let loop_range = (loop_start < loop_end).then_some((loop_start, loop_end));
        LinearStream {
            samples,
            pos: 0,
            loop_range,
        }
    }
}

impl AudioStream for LinearStream {
    fn read_buffer(&mut self, buffer: &mut [i16]) -> usize {
        let mut written = 0;
        while written < buffer.len() {
            let limit = match self.loop_range {
                Some((_, loop_end)) if self.pos < loop_end => loop_end,
                _ => self.samples.len(),
            };
            if self.pos >= limit {
                match self.loop_range {
                    Some((loop_start, _)) => {
                        self.pos = loop_start;
                        continue;
                    }
                    None => break,
                }
            }
            let take = (limit - self.pos).min(buffer.len() - written);
            buffer[written..written + take]
                .copy_from_slice(&self.samples[self.pos..self.pos + take]);
            self.pos += take;
            written += take;
        }
        written
    }

    fn end_of_data(&self) -> bool {
        self.loop_range.is_none() && self.pos >= self.samples.len()
    }
}
