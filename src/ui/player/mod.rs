use gtk::glib;
use gtk::prelude::*;
use libadwaita as adw;
use relm4::gtk;
use relm4::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::player::{GStreamerPlayer, PlayerEvent, PlayerState};

mod keyboard;
mod thumbnails;
mod timeline;
mod volume;

use keyboard::{FocusContext, Shortcut, shortcut_for_key};
use thumbnails::ThumbnailTrack;
use timeline::TimelineManager;
use volume::VolumeManager;

/// Render a second count as `m:ss`, or `h:mm:ss` from one hour up. Hours are
/// never padded. Anything non-finite or negative renders the placeholder.
fn format_timestamp(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::from("--:--");
    }

    let total_secs = seconds.floor() as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Next stop in the playback-rate cycle: 0.25 steps, wrapping above 2.0 back
/// to 0.25.
fn next_playback_speed(rate: f64) -> f64 {
    let next = rate + 0.25;
    if next > 2.0 { 0.25 } else { next }
}

/// Backend events that mean the pipeline is alive again, taking down a
/// previously shown error overlay.
fn clears_error(event: &PlayerEvent) -> bool {
    matches!(
        event,
        PlayerEvent::StateChanged(_) | PlayerEvent::DurationChanged
    )
}

/// Window size to restore after leaving mini-player mode. The live allocation
/// wins over the default size, which goes stale while the window is
/// maximized; an unmapped window has no allocation and falls back.
fn restorable_size(allocated: (i32, i32), default: (i32, i32)) -> (i32, i32) {
    if allocated.0 > 0 && allocated.1 > 0 {
        allocated
    } else {
        default
    }
}

pub struct PlayerPage {
    player: GStreamerPlayer,
    window: adw::ApplicationWindow,
    timeline: TimelineManager,
    volume: VolumeManager,
    duration: Duration,
    skip_step: i64,
    // UI mode flags, each mirroring exactly one piece of backend or
    // interaction state.
    is_paused: bool,
    is_theater: bool,
    is_fullscreen: bool,
    is_mini_player: bool,
    captions_on: bool,
    playback_rate: f64,
    error_message: Option<String>,
    saved_window_size: (i32, i32),
    tick_source: Option<glib::SourceId>,
}

impl PlayerPage {
    const MINI_PLAYER_WIDTH: i32 = 480;
    const MINI_PLAYER_HEIGHT: i32 = 270;
    /// Quiet period after the last slider change before a scrub session ends.
    const SCRUB_SETTLE: Duration = Duration::from_millis(300);

    /// CSS classes on the player container, derived from the mirrored state.
    /// This is the only place UI flags are materialized.
    fn container_classes(&self) -> Vec<&'static str> {
        let mut classes = vec!["video-container"];
        if self.is_paused {
            classes.push("paused");
        }
        if self.is_theater {
            classes.push("theater");
        }
        if self.is_fullscreen {
            classes.push("full-screen");
        }
        if self.is_mini_player {
            classes.push("mini-player");
        }
        if self.captions_on {
            classes.push("captions");
        }
        if self.timeline.is_scrubbing() {
            classes.push("scrubbing");
        }
        classes.push(self.volume.level().css_class());
        classes
    }
}

impl std::fmt::Debug for PlayerPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerPage")
            .field("duration", &self.duration)
            .field("is_paused", &self.is_paused)
            .field("playback_rate", &self.playback_rate)
            .field("error_message", &self.error_message)
            .finish()
    }
}

pub struct PlayerInit {
    pub player: GStreamerPlayer,
    pub media_path: PathBuf,
    pub config: Config,
    pub window: adw::ApplicationWindow,
}

#[derive(Debug)]
pub enum PlayerInput {
    PlayPause,
    ToggleMute,
    SetVolume(f64),
    ToggleTheater,
    ToggleFullscreen,
    FullscreenChanged(bool),
    ToggleMiniPlayer,
    ToggleCaptions,
    CycleSpeed,
    SeekRelative(i64),
    ScrubTo(f64),
    ScrubSettled { fraction: f64, epoch: u64 },
    HoverPreview(f64),
    HoverLeave,
    Tick,
    Playback(PlayerEvent),
}

fn input_for_shortcut(shortcut: Shortcut, skip_step: i64) -> PlayerInput {
    match shortcut {
        Shortcut::PlayPause => PlayerInput::PlayPause,
        Shortcut::Fullscreen => PlayerInput::ToggleFullscreen,
        Shortcut::Theater => PlayerInput::ToggleTheater,
        Shortcut::MiniPlayer => PlayerInput::ToggleMiniPlayer,
        Shortcut::Mute => PlayerInput::ToggleMute,
        Shortcut::SkipBack => PlayerInput::SeekRelative(-skip_step),
        Shortcut::SkipForward => PlayerInput::SeekRelative(skip_step),
        Shortcut::Captions => PlayerInput::ToggleCaptions,
    }
}

#[relm4::component(pub)]
impl SimpleComponent for PlayerPage {
    type Init = PlayerInit;
    type Input = PlayerInput;
    type Output = ();

    view! {
        gtk::Overlay {
            set_vexpand: true,
            set_hexpand: true,
            set_focusable: true,
            set_can_focus: true,
            #[watch]
            set_css_classes: &model.container_classes(),

            set_child: Some(&model.player.video_widget()),

            // Full-size still shown over the video while scrubbing
            add_overlay: &model.timeline.scrub_thumbnail(),

            // Error overlay
            add_overlay = &gtk::Box {
                set_orientation: gtk::Orientation::Vertical,
                set_halign: gtk::Align::Center,
                set_valign: gtk::Align::Center,
                set_spacing: 12,
                #[watch]
                set_visible: model.error_message.is_some(),
                add_css_class: "osd",
                add_css_class: "error-overlay",

                gtk::Image {
                    set_icon_name: Some("dialog-error-symbolic"),
                    set_pixel_size: 64,
                },

                gtk::Label {
                    #[watch]
                    set_label: model.error_message.as_deref().unwrap_or("Playback failed"),
                    set_wrap: true,
                    set_max_width_chars: 50,
                    add_css_class: "title-2",
                },
            },

            // Bottom control deck
            add_overlay = &gtk::Box {
                set_orientation: gtk::Orientation::Vertical,
                set_valign: gtk::Align::End,
                set_margin_all: 12,
                set_spacing: 4,
                add_css_class: "osd",
                add_css_class: "player-controls",

                append: &model.timeline.preview_box(),
                append: &model.timeline.scale(),

                gtk::Box {
                    set_orientation: gtk::Orientation::Horizontal,
                    set_spacing: 6,

                    gtk::Button {
                        #[watch]
                        set_icon_name: if model.is_paused {
                            "media-playback-start-symbolic"
                        } else {
                            "media-playback-pause-symbolic"
                        },
                        add_css_class: "flat",
                        set_tooltip_text: Some("Play/Pause"),
                        connect_clicked => PlayerInput::PlayPause,
                    },

                    append: &model.volume.mute_button(),
                    append: &model.volume.slider(),

                    append: &model.timeline.position_label(),
                    gtk::Label {
                        set_label: "/",
                        add_css_class: "dim-label",
                    },
                    append: &model.timeline.duration_label(),

                    gtk::Box {
                        set_hexpand: true,
                    },

                    gtk::Button {
                        #[watch]
                        set_label: &format!("{}x", model.playback_rate),
                        add_css_class: "flat",
                        set_tooltip_text: Some("Playback speed"),
                        connect_clicked => PlayerInput::CycleSpeed,
                    },

                    gtk::Button {
                        set_icon_name: "media-view-subtitles-symbolic",
                        add_css_class: "flat",
                        set_visible: model.player.has_subtitles(),
                        set_tooltip_text: Some("Captions"),
                        connect_clicked => PlayerInput::ToggleCaptions,
                    },

                    gtk::Button {
                        set_icon_name: "view-paged-symbolic",
                        add_css_class: "flat",
                        set_tooltip_text: Some("Theater mode"),
                        connect_clicked => PlayerInput::ToggleTheater,
                    },

                    gtk::Button {
                        set_icon_name: "window-new-symbolic",
                        add_css_class: "flat",
                        set_tooltip_text: Some("Mini player"),
                        connect_clicked => PlayerInput::ToggleMiniPlayer,
                    },

                    gtk::Button {
                        #[watch]
                        set_icon_name: if model.is_fullscreen {
                            "view-restore-symbolic"
                        } else {
                            "view-fullscreen-symbolic"
                        },
                        add_css_class: "flat",
                        set_tooltip_text: Some("Fullscreen"),
                        connect_clicked => PlayerInput::ToggleFullscreen,
                    },
                },
            },
        }
    }

    fn init(
        init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let PlayerInit {
            player,
            media_path,
            config,
            window,
        } = init;

        let mut timeline = TimelineManager::new(&sender);
        timeline.set_thumbnails(ThumbnailTrack::discover(&media_path));

        let mut volume = VolumeManager::new(&sender);
        volume.sync(player.is_muted(), player.volume());

        // Every UI flag below follows a backend notification; none is set
        // optimistically from the request side.
        {
            let sender = sender.clone();
            if let Err(e) = player.connect_events(move |event| {
                sender.input(PlayerInput::Playback(event));
            }) {
                warn!("Running without backend notifications: {}", e);
            }
        }

        // The fullscreen request in update() can be rejected by the
        // compositor, so the flag follows the window's own notification.
        {
            let sender = sender.clone();
            window.connect_fullscreened_notify(move |window| {
                sender.input(PlayerInput::FullscreenChanged(window.is_fullscreen()));
            });
        }

        // Position tick while media is loaded, the "timeupdate" analog.
        // The source is removed again in shutdown().
        let tick_source = {
            let sender = sender.clone();
            glib::timeout_add_local(Duration::from_millis(500), move || {
                sender.input(PlayerInput::Tick);
                glib::ControlFlow::Continue
            })
        };

        // Clicking the video surface toggles playback.
        {
            let video_widget = player.video_widget();
            video_widget.set_vexpand(true);
            video_widget.set_hexpand(true);

            let click = gtk::GestureClick::new();
            let sender = sender.clone();
            click.connect_released(move |_, _, _, _| {
                sender.input(PlayerInput::PlayPause);
            });
            video_widget.add_controller(click);
        }

        let model = PlayerPage {
            player,
            window: window.clone(),
            timeline,
            volume,
            duration: Duration::ZERO,
            skip_step: config.playback.seek_step_seconds as i64,
            is_paused: true,
            is_theater: false,
            is_fullscreen: false,
            is_mini_player: false,
            captions_on: false,
            playback_rate: 1.0,
            error_message: None,
            saved_window_size: (0, 0),
            tick_source: Some(tick_source),
        };

        let widgets = view_output!();

        // Keyboard shortcuts, suppressed while a text input has focus.
        {
            let key_controller = gtk::EventControllerKey::new();
            let sender = sender.clone();
            let skip_step = model.skip_step;
            key_controller.connect_key_pressed(move |_, key, _keycode, _modifiers| {
                let focused = window.property::<Option<gtk::Widget>>("focus-widget");
                let focus = FocusContext::from_widget(focused.as_ref());
                match shortcut_for_key(key, focus) {
                    Some(shortcut) => {
                        sender.input(input_for_shortcut(shortcut, skip_step));
                        glib::Propagation::Stop
                    }
                    None => glib::Propagation::Proceed,
                }
            });
            root.add_controller(key_controller);
        }

        ComponentParts { model, widgets }
    }

    fn update(&mut self, message: Self::Input, sender: ComponentSender<Self>) {
        match message {
            PlayerInput::PlayPause => {
                let result = if self.player.is_paused() {
                    self.player.play()
                } else {
                    self.player.pause()
                };
                if let Err(e) = result {
                    warn!("Play/pause toggle failed: {}", e);
                }
            }
            PlayerInput::ToggleMute => {
                self.player.set_muted(!self.player.is_muted());
            }
            PlayerInput::SetVolume(value) => {
                self.player.set_volume(value);
                self.player.set_muted(value == 0.0);
            }
            PlayerInput::ToggleTheater => {
                // Pure layout flag with no asynchronous transition behind it.
                self.is_theater = !self.is_theater;
            }
            PlayerInput::ToggleFullscreen => {
                if self.window.is_fullscreen() {
                    self.window.unfullscreen();
                } else {
                    self.window.fullscreen();
                }
            }
            PlayerInput::FullscreenChanged(fullscreen) => {
                self.is_fullscreen = fullscreen;
            }
            PlayerInput::ToggleMiniPlayer => {
                if self.is_mini_player {
                    let (width, height) = self.saved_window_size;
                    self.window.set_default_size(width, height);
                } else {
                    self.saved_window_size = restorable_size(
                        (self.window.width(), self.window.height()),
                        (self.window.default_width(), self.window.default_height()),
                    );
                    self.window
                        .set_default_size(Self::MINI_PLAYER_WIDTH, Self::MINI_PLAYER_HEIGHT);
                }
                self.is_mini_player = !self.is_mini_player;
            }
            PlayerInput::ToggleCaptions => {
                self.captions_on = self.player.toggle_captions();
            }
            PlayerInput::CycleSpeed => {
                let next = next_playback_speed(self.playback_rate);
                match self.player.set_rate(next) {
                    Ok(()) => self.playback_rate = next,
                    Err(e) => warn!("Failed to change playback speed: {}", e),
                }
            }
            PlayerInput::SeekRelative(delta) => {
                if let Err(e) = self.player.skip(delta) {
                    warn!("Relative seek failed: {}", e);
                }
            }
            PlayerInput::ScrubTo(fraction) => {
                if !self.timeline.is_scrubbing()
                    && self.timeline.begin_scrub(self.player.is_paused())
                    && let Err(e) = self.player.pause()
                {
                    warn!("Failed to pause for scrubbing: {}", e);
                }
                self.timeline.scrub_move(fraction, self.duration);

                // Arm the end-of-scrub check. Stale timers from earlier
                // changes fire with an old epoch and are ignored.
                let epoch = self.timeline.arm_settle();
                let sender = sender.clone();
                glib::timeout_add_local_once(Self::SCRUB_SETTLE, move || {
                    sender.input(PlayerInput::ScrubSettled { fraction, epoch });
                });
            }
            PlayerInput::ScrubSettled { fraction, epoch } => {
                if self.timeline.settle_current(epoch)
                    && let Some(end) = self.timeline.end_scrub(fraction, self.duration)
                {
                    debug!("Scrub ended, seeking to {:?}", end.seek_to);
                    if let Err(e) = self.player.seek(end.seek_to) {
                        warn!("Scrub seek failed: {}", e);
                    }
                    if end.resume
                        && let Err(e) = self.player.play()
                    {
                        warn!("Failed to resume after scrubbing: {}", e);
                    }
                }
            }
            PlayerInput::HoverPreview(fraction) => {
                self.timeline.show_preview(fraction, self.duration);
            }
            PlayerInput::HoverLeave => {
                self.timeline.hide_preview();
            }
            PlayerInput::Tick => {
                if !self.timeline.is_scrubbing()
                    && let Some(position) = self.player.position()
                {
                    self.timeline.update_position(position);
                }
            }
            PlayerInput::Playback(event) => {
                if clears_error(&event) {
                    self.error_message = None;
                }
                match event {
                    PlayerEvent::StateChanged(state) => {
                        self.is_paused = state != PlayerState::Playing;
                    }
                    PlayerEvent::DurationChanged => {
                        if let Some(duration) = self.player.duration() {
                            self.duration = duration;
                            self.timeline.update_duration(duration);
                        }
                    }
                    PlayerEvent::VolumeChanged { volume, muted } => {
                        self.volume.sync(muted, volume);
                    }
                    PlayerEvent::EndOfStream => {
                        if let Err(e) = self.player.pause() {
                            warn!("Failed to pause at end of stream: {}", e);
                        }
                    }
                    PlayerEvent::Error(message) => {
                        warn!("Playback error: {}", message);
                        self.error_message = Some(message);
                    }
                }
            }
        }
    }

    fn shutdown(&mut self, _widgets: &mut Self::Widgets, _output: relm4::Sender<Self::Output>) {
        if let Some(source) = self.tick_source.take() {
            source.remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(65.0), "1:05");
        assert_eq!(format_timestamp(59.9), "0:59");
        assert_eq!(format_timestamp(600.0), "10:00");
    }

    #[test]
    fn hour_segment_appears_at_exactly_one_hour() {
        assert_eq!(format_timestamp(3599.0), "59:59");
        assert_eq!(format_timestamp(3600.0), "1:00:00");
        assert_eq!(format_timestamp(3661.0), "1:01:01");
        assert_eq!(format_timestamp(36_000.0), "10:00:00");
    }

    #[test]
    fn invalid_input_renders_placeholder() {
        assert_eq!(format_timestamp(f64::NAN), "--:--");
        assert_eq!(format_timestamp(f64::INFINITY), "--:--");
        assert_eq!(format_timestamp(-5.0), "--:--");
    }

    #[test]
    fn speed_cycle_returns_to_start_after_eight_steps() {
        let mut rate = 1.0;
        for _ in 0..8 {
            rate = next_playback_speed(rate);
        }
        assert_eq!(rate, 1.0);
    }

    #[test]
    fn speed_wraps_above_two() {
        assert_eq!(next_playback_speed(2.0), 0.25);
        assert_eq!(next_playback_speed(1.75), 2.0);
        assert_eq!(next_playback_speed(0.25), 0.5);
    }

    #[test]
    fn error_overlay_clears_on_pipeline_activity() {
        assert!(clears_error(&PlayerEvent::StateChanged(PlayerState::Playing)));
        assert!(clears_error(&PlayerEvent::StateChanged(PlayerState::Paused)));
        assert!(clears_error(&PlayerEvent::DurationChanged));

        assert!(!clears_error(&PlayerEvent::Error("decode failed".into())));
        assert!(!clears_error(&PlayerEvent::EndOfStream));
        assert!(!clears_error(&PlayerEvent::VolumeChanged {
            volume: 1.0,
            muted: false,
        }));
    }

    #[test]
    fn live_allocation_wins_over_default_size() {
        // A maximized window keeps its pre-maximize default size, so the
        // allocation is what must be restored later.
        assert_eq!(restorable_size((1920, 1080), (1280, 720)), (1920, 1080));
        assert_eq!(restorable_size((0, 0), (1280, 720)), (1280, 720));
        assert_eq!(restorable_size((1920, 0), (1280, 720)), (1280, 720));
    }
}
