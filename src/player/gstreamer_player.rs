use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use gtk4 as gtk;
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{PlayerError, PlayerEvent, PlayerState};

/// Playbin flags enabled while subtitles are hidden. The `text` flag is added
/// on top when captions are toggled on.
const BASE_PLAY_FLAGS: &str = "soft-colorbalance+deinterlace+soft-volume+audio+video";

/// Owns the GStreamer playbin and the video widget it renders into.
///
/// This is the single authority on playback state; the control surface reads
/// and writes it through these methods and follows its bus notifications.
/// Everything here runs on the GTK main thread.
pub struct GStreamerPlayer {
    playbin: gst::Element,
    video_widget: gtk::Picture,
    rate: Cell<f64>,
    captions_enabled: Cell<bool>,
    has_subtitles: Cell<bool>,
    bus_watch: RefCell<Option<gst::bus::BusWatchGuard>>,
}

impl GStreamerPlayer {
    pub fn new() -> Result<Self, PlayerError> {
        // playbin3 is the recommended playback element on modern GStreamer;
        // fall back to classic playbin where it is missing.
        let playbin = gst::ElementFactory::make("playbin3")
            .build()
            .or_else(|_| gst::ElementFactory::make("playbin").build())
            .map_err(|_| PlayerError::MissingElement("playbin"))?;

        let sink = gst::ElementFactory::make("gtk4paintablesink")
            .build()
            .map_err(|_| PlayerError::MissingElement("gtk4paintablesink"))?;

        let video_widget = gtk::Picture::new();
        let paintable = sink.property::<gtk::gdk::Paintable>("paintable");
        video_widget.set_paintable(Some(&paintable));

        playbin.set_property("video-sink", &sink);
        playbin.set_property_from_str("flags", BASE_PLAY_FLAGS);

        if let Some(factory) = playbin.factory() {
            info!("Using {} for playback", factory.name());
        }

        Ok(Self {
            playbin,
            video_widget,
            rate: Cell::new(1.0),
            captions_enabled: Cell::new(false),
            has_subtitles: Cell::new(false),
            bus_watch: RefCell::new(None),
        })
    }

    /// The widget the sink paints video frames into.
    pub fn video_widget(&self) -> gtk::Picture {
        self.video_widget.clone()
    }

    /// Load a local media file, with an optional subtitle sidecar, and preroll
    /// paused so the first frame is shown.
    pub fn load(&self, media: &Path, subtitles: Option<&Path>) -> Result<(), PlayerError> {
        let uri = glib::filename_to_uri(media, None)?;
        debug!("Loading media {}", uri);
        self.playbin.set_property("uri", uri.as_str());

        self.has_subtitles.set(false);
        if let Some(subtitles) = subtitles {
            let suburi = glib::filename_to_uri(subtitles, None)?;
            debug!("Loading subtitles {}", suburi);
            self.playbin.set_property("suburi", suburi.as_str());
            self.has_subtitles.set(true);
        }

        self.playbin.set_state(gst::State::Paused)?;
        Ok(())
    }

    /// Route bus messages and property notifications into `handler`.
    /// Messages arrive on the GTK main loop via the bus watch.
    pub fn connect_events(
        &self,
        handler: impl Fn(PlayerEvent) + 'static,
    ) -> Result<(), PlayerError> {
        let handler = Rc::new(handler);
        let bus = self.playbin.bus().ok_or(PlayerError::NoBus)?;

        let watch = {
            let handler = handler.clone();
            let playbin_name = self.playbin.name().to_string();
            bus.add_watch_local(move |_, msg| {
                use gst::MessageView;

                match msg.view() {
                    MessageView::Eos(_) => {
                        debug!("Bus message: end of stream");
                        handler(PlayerEvent::EndOfStream);
                    }
                    MessageView::Error(err) => {
                        warn!(
                            "Bus error from {:?}: {}",
                            err.src().map(|s| s.path_string()),
                            err.error()
                        );
                        handler(PlayerEvent::Error(err.error().to_string()));
                    }
                    MessageView::StateChanged(state_changed) => {
                        // Only the playbin's own transitions matter; child
                        // elements change state independently.
                        let from_playbin = state_changed
                            .src()
                            .is_some_and(|src| src.name() == playbin_name);
                        if from_playbin {
                            let state = match state_changed.current() {
                                gst::State::Playing => Some(PlayerState::Playing),
                                gst::State::Paused => Some(PlayerState::Paused),
                                gst::State::Ready | gst::State::Null => Some(PlayerState::Stopped),
                                _ => None,
                            };
                            if let Some(state) = state {
                                handler(PlayerEvent::StateChanged(state));
                            }
                        }
                    }
                    MessageView::DurationChanged(_) => {
                        handler(PlayerEvent::DurationChanged);
                    }
                    // The stream duration is reliably queryable once the
                    // initial preroll finishes.
                    MessageView::AsyncDone(_) => {
                        handler(PlayerEvent::DurationChanged);
                    }
                    _ => {}
                }

                glib::ControlFlow::Continue
            })
            .map_err(|_| PlayerError::NoBus)?
        };
        *self.bus_watch.borrow_mut() = Some(watch);

        for property in ["volume", "mute"] {
            let handler = handler.clone();
            self.playbin
                .connect_notify_local(Some(property), move |playbin, _| {
                    handler(PlayerEvent::VolumeChanged {
                        volume: playbin.property("volume"),
                        muted: playbin.property("mute"),
                    });
                });
        }

        Ok(())
    }

    pub fn play(&self) -> Result<(), PlayerError> {
        self.playbin.set_state(gst::State::Playing)?;
        Ok(())
    }

    pub fn pause(&self) -> Result<(), PlayerError> {
        self.playbin.set_state(gst::State::Paused)?;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        let (_, current, _) = self.playbin.state(gst::ClockTime::ZERO);
        current != gst::State::Playing
    }

    pub fn position(&self) -> Option<Duration> {
        self.playbin
            .query_position::<gst::ClockTime>()
            .map(|t| Duration::from_nanos(t.nseconds()))
    }

    pub fn duration(&self) -> Option<Duration> {
        self.playbin
            .query_duration::<gst::ClockTime>()
            .map(|t| Duration::from_nanos(t.nseconds()))
    }

    pub fn seek(&self, position: Duration) -> Result<(), PlayerError> {
        self.seek_with_rate(self.rate.get(), position)
    }

    /// Add `delta_seconds` to the current position, saturating at zero.
    /// The high end is left to the pipeline's own clamping.
    pub fn skip(&self, delta_seconds: i64) -> Result<(), PlayerError> {
        let current = self.position().unwrap_or(Duration::ZERO);
        let target = if delta_seconds < 0 {
            current.saturating_sub(Duration::from_secs(delta_seconds.unsigned_abs()))
        } else {
            current + Duration::from_secs(delta_seconds as u64)
        };
        self.seek(target)
    }

    pub fn rate(&self) -> f64 {
        self.rate.get()
    }

    /// Change the playback rate. GStreamer applies a rate through a seek, so
    /// this re-seeks to the current position; if no position is queryable yet
    /// the rate is applied by the next seek instead.
    pub fn set_rate(&self, rate: f64) -> Result<(), PlayerError> {
        if let Some(position) = self.position() {
            self.seek_with_rate(rate, position)?;
        }
        self.rate.set(rate);
        debug!("Playback rate set to {}", rate);
        Ok(())
    }

    pub fn volume(&self) -> f64 {
        self.playbin.property("volume")
    }

    pub fn set_volume(&self, volume: f64) {
        self.playbin.set_property("volume", volume.clamp(0.0, 1.0));
    }

    pub fn is_muted(&self) -> bool {
        self.playbin.property("mute")
    }

    pub fn set_muted(&self, muted: bool) {
        self.playbin.set_property("mute", muted);
    }

    pub fn has_subtitles(&self) -> bool {
        self.has_subtitles.get()
    }

    pub fn captions_enabled(&self) -> bool {
        self.captions_enabled.get()
    }

    /// Flip subtitle visibility and return the new state.
    pub fn toggle_captions(&self) -> bool {
        let enabled = !self.captions_enabled.get();
        if enabled {
            self.playbin
                .set_property_from_str("flags", &format!("{}+text", BASE_PLAY_FLAGS));
        } else {
            self.playbin.set_property_from_str("flags", BASE_PLAY_FLAGS);
        }
        self.captions_enabled.set(enabled);
        enabled
    }

    fn seek_with_rate(&self, rate: f64, position: Duration) -> Result<(), PlayerError> {
        let target = gst::ClockTime::from_nseconds(position.as_nanos() as u64);
        self.playbin
            .seek(
                rate,
                gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
                gst::SeekType::Set,
                target,
                gst::SeekType::None,
                gst::ClockTime::NONE,
            )
            .map_err(|_| PlayerError::SeekFailed)
    }
}

impl Drop for GStreamerPlayer {
    fn drop(&mut self) {
        if let Err(e) = self.playbin.set_state(gst::State::Null) {
            warn!("Failed to shut down pipeline: {}", e);
        }
    }
}
