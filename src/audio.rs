//! Sound playback seam.
//!
//! Stands play an ambient hum while hovered. Playback itself is outside this
//! crate; the showroom only tells an [`AudioSink`] which named sound to start
//! or stop.

use log::debug;

pub trait AudioSink {
    fn play(&mut self, name: &str);
    fn stop(&mut self, name: &str);
}

/// Sink that only records requests in the log.
#[derive(Debug, Default)]
pub struct LoggingAudio {
    playing: Vec<String>,
}

impl LoggingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self, name: &str) -> bool {
        self.playing.iter().any(|n| n == name)
    }
}

impl AudioSink for LoggingAudio {
    fn play(&mut self, name: &str) {
        debug!("audio: play {name}");
        if !self.is_playing(name) {
            self.playing.push(name.to_string());
        }
    }

    fn stop(&mut self, name: &str) {
        debug!("audio: stop {name}");
        self.playing.retain(|n| n != name);
    }
}

/// Records every call, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub calls: Vec<(bool, String)>,
}

#[cfg(test)]
impl RecordingAudio {
    pub fn plays(&self) -> usize {
        self.calls.iter().filter(|(play, _)| *play).count()
    }

    pub fn stops(&self) -> usize {
        self.calls.iter().filter(|(play, _)| !*play).count()
    }
}

#[cfg(test)]
impl AudioSink for RecordingAudio {
    fn play(&mut self, name: &str) {
        self.calls.push((true, name.to_string()));
    }

    fn stop(&mut self, name: &str) {
        self.calls.push((false, name.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_audio_tracks_playing_sounds() {
        let mut audio = LoggingAudio::new();
        audio.play("hum");
        audio.play("hum");
        assert!(audio.is_playing("hum"));
        audio.stop("hum");
        assert!(!audio.is_playing("hum"));
    }
}
