//! Supported output formats
//!
//! Maps each allowed file extension to the MIME type served on download and
//! to the ffmpeg encoder and muxer that actually produce it.

use std::fmt;

/// Audio output formats accepted by `/convert`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Ogg,
    M4a,
    Wma,
    Aac,
    Movpkg,
    Raw,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 9] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::Flac,
        AudioFormat::Ogg,
        AudioFormat::M4a,
        AudioFormat::Wma,
        AudioFormat::Aac,
        AudioFormat::Movpkg,
        AudioFormat::Raw,
    ];

    /// Format of the first pass, which strips the video stream
    pub const INTERMEDIATE: AudioFormat = AudioFormat::Mp3;

    /// Parse a client-supplied format name (case-insensitive, trimmed)
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(name))
    }

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wma => "wma",
            AudioFormat::Aac => "aac",
            AudioFormat::Movpkg => "movpkg",
            AudioFormat::Raw => "raw",
        }
    }

    /// Content-Type declared on download
    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wma => "audio/x-ms-wma",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Movpkg => "audio/mp4",
            AudioFormat::Raw => "audio/x-raw",
        }
    }

    /// ffmpeg audio encoder name (`-c:a`)
    pub fn encoder(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Wav | AudioFormat::Raw => "pcm_s16le",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "libvorbis",
            AudioFormat::M4a | AudioFormat::Aac | AudioFormat::Movpkg => "aac",
            AudioFormat::Wma => "wmav2",
        }
    }

    /// ffmpeg muxer name (`-f`). Always explicit: `movpkg` and `raw` are
    /// not extensions ffmpeg can guess a container from.
    pub fn muxer(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::M4a => "ipod",
            AudioFormat::Wma => "asf",
            AudioFormat::Aac => "adts",
            AudioFormat::Movpkg => "mp4",
            AudioFormat::Raw => "s16le",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
