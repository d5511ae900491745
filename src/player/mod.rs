mod gstreamer_player;

pub use gstreamer_player::GStreamerPlayer;

use gstreamer as gst;
use gstreamer::glib;
use thiserror::Error;

/// Coarse pipeline state as reported by the playback backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Playing,
    Paused,
    Stopped,
}

/// Notifications emitted by the backend. The UI mirrors its flags from these
/// and never sets them optimistically.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    StateChanged(PlayerState),
    DurationChanged,
    VolumeChanged { volume: f64, muted: bool },
    EndOfStream,
    Error(String),
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("required GStreamer element `{0}` is not available")]
    MissingElement(&'static str),
    #[error("pipeline has no message bus")]
    NoBus,
    #[error("failed to change pipeline state")]
    StateChange(#[from] gst::StateChangeError),
    #[error("seek was rejected by the pipeline")]
    SeekFailed,
    #[error(transparent)]
    Glib(#[from] glib::Error),
}
