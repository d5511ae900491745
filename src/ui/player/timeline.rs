use gtk::glib;
use gtk::prelude::*;
use relm4::ComponentSender;
use relm4::gtk;
use std::time::Duration;
use tracing::trace;

use super::thumbnails::ThumbnailTrack;
use super::{PlayerInput, PlayerPage, format_timestamp};

/// Horizontal pointer offset → timeline fraction in [0, 1].
pub(super) fn timeline_fraction(x: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    x.clamp(0.0, width) / width
}

/// One live scrub. Records whether playback was already paused when the
/// scrub started; consumed by [`finish`](Self::finish) when it ends.
#[derive(Debug, Clone, Copy)]
pub(super) struct ScrubSession {
    was_paused: bool,
}

/// What to do with the backend when a scrub session ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ScrubEnd {
    pub seek_to: Duration,
    pub resume: bool,
}

impl ScrubSession {
    fn begin(was_paused: bool) -> Self {
        Self { was_paused }
    }

    /// Seek to the final fraction; resume only if playback was running when
    /// the session began. The entry fraction plays no part in the outcome.
    fn finish(self, fraction: f64, duration: Duration) -> ScrubEnd {
        ScrubEnd {
            seek_to: duration.mul_f64(fraction.clamp(0.0, 1.0)),
            resume: !self.was_paused,
        }
    }
}

/// Decides when a run of slider changes has gone quiet. Every change arms a
/// fresh epoch; a settle notification only counts if it carries the newest
/// one, so stale timers from earlier changes are ignored without having to
/// remove their sources.
#[derive(Debug, Default)]
pub(super) struct SettleGate {
    epoch: u64,
}

impl SettleGate {
    pub(super) fn arm(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    pub(super) fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }
}

/// Scrub session bookkeeping, kept free of widget state so the transition
/// rules are testable on their own.
#[derive(Debug, Default)]
pub(super) struct Scrubber {
    session: Option<ScrubSession>,
}

impl Scrubber {
    /// Start a session. A press while one is already active is ignored so the
    /// original pre-scrub pause state survives the whole drag.
    pub(super) fn begin(&mut self, was_paused: bool) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(ScrubSession::begin(was_paused));
        true
    }

    pub(super) fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub(super) fn end(&mut self, fraction: f64, duration: Duration) -> Option<ScrubEnd> {
        self.session.take().map(|s| s.finish(fraction, duration))
    }
}

/// Manages the timeline scale, the position/duration labels and the hover
/// preview. Slider changes land in the component as messages; the widgets
/// here only ever display state.
pub(super) struct TimelineManager {
    scale: gtk::Scale,
    position_label: gtk::Label,
    duration_label: gtk::Label,
    preview_box: gtk::Box,
    preview_picture: gtk::Picture,
    preview_label: gtk::Label,
    scrub_thumbnail: gtk::Picture,
    thumbnails: Option<ThumbnailTrack>,
    scrubber: Scrubber,
    settle: SettleGate,
}

impl TimelineManager {
    pub(super) fn new(sender: &ComponentSender<PlayerPage>) -> Self {
        let scale = gtk::Scale::with_range(gtk::Orientation::Horizontal, 0.0, 100.0, 1.0);
        scale.set_draw_value(false);
        scale.set_hexpand(true);
        scale.add_css_class("timeline");

        let position_label = gtk::Label::new(Some("0:00"));
        position_label.add_css_class("numeric");
        let duration_label = gtk::Label::new(Some("--:--"));
        duration_label.add_css_class("numeric");

        let preview_picture = gtk::Picture::new();
        preview_picture.set_size_request(160, 90);
        let preview_label = gtk::Label::new(None);
        let preview_box = gtk::Box::new(gtk::Orientation::Vertical, 4);
        preview_box.append(&preview_picture);
        preview_box.append(&preview_label);
        preview_box.set_halign(gtk::Align::Start);
        preview_box.set_visible(false);
        preview_box.add_css_class("timeline-preview");

        // Full-size still shown over the video while scrubbing.
        let scrub_thumbnail = gtk::Picture::new();
        scrub_thumbnail.set_visible(false);

        // The range claims the pointer sequence for its own click and slide
        // gestures, so sibling button controllers never see a release. Scrub
        // tracking hangs off change-value instead: the first change opens the
        // session and the component closes it once the changes go quiet.
        {
            let sender = sender.clone();
            scale.connect_change_value(move |scale, _, value| {
                let upper = scale.adjustment().upper();
                let fraction = if upper > 0.0 {
                    (value / upper).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                sender.input(PlayerInput::ScrubTo(fraction));
                glib::Propagation::Proceed
            });
        }

        // Hover preview, active whether or not a scrub is running.
        {
            let motion = gtk::EventControllerMotion::new();

            let scale_for_motion = scale.clone();
            let sender_motion = sender.clone();
            motion.connect_motion(move |_, x, _| {
                let fraction = timeline_fraction(x, scale_for_motion.width() as f64);
                sender_motion.input(PlayerInput::HoverPreview(fraction));
            });

            let sender_leave = sender.clone();
            motion.connect_leave(move |_| {
                sender_leave.input(PlayerInput::HoverLeave);
            });

            scale.add_controller(motion);
        }

        Self {
            scale,
            position_label,
            duration_label,
            preview_box,
            preview_picture,
            preview_label,
            scrub_thumbnail,
            thumbnails: None,
            scrubber: Scrubber::default(),
            settle: SettleGate::default(),
        }
    }

    pub(super) fn scale(&self) -> gtk::Scale {
        self.scale.clone()
    }

    pub(super) fn position_label(&self) -> gtk::Label {
        self.position_label.clone()
    }

    pub(super) fn duration_label(&self) -> gtk::Label {
        self.duration_label.clone()
    }

    pub(super) fn preview_box(&self) -> gtk::Box {
        self.preview_box.clone()
    }

    pub(super) fn scrub_thumbnail(&self) -> gtk::Picture {
        self.scrub_thumbnail.clone()
    }

    pub(super) fn set_thumbnails(&mut self, thumbnails: Option<ThumbnailTrack>) {
        self.thumbnails = thumbnails;
    }

    pub(super) fn is_scrubbing(&self) -> bool {
        self.scrubber.is_active()
    }

    /// Register a slider change and get the epoch its settle check must carry.
    pub(super) fn arm_settle(&mut self) -> u64 {
        self.settle.arm()
    }

    pub(super) fn settle_current(&self, epoch: u64) -> bool {
        self.settle.is_current(epoch)
    }

    /// Try to enter the scrubbing state. Returns false when a session is
    /// already running and the press should be ignored.
    pub(super) fn begin_scrub(&mut self, was_paused: bool) -> bool {
        if !self.scrubber.begin(was_paused) {
            trace!("Ignoring re-entrant scrub press");
            return false;
        }
        true
    }

    /// Drive the authoritative progress display from a drag position.
    pub(super) fn scrub_move(&self, fraction: f64, duration: Duration) {
        let target = duration.mul_f64(fraction.clamp(0.0, 1.0));
        self.scale.set_value(target.as_secs_f64());
        self.position_label
            .set_text(&format_timestamp(target.as_secs_f64()));

        if let Some(track) = &self.thumbnails {
            self.scrub_thumbnail
                .set_filename(Some(track.frame_path(fraction, duration)));
            self.scrub_thumbnail.set_visible(true);
        }
        self.show_preview(fraction, duration);
    }

    pub(super) fn end_scrub(&mut self, fraction: f64, duration: Duration) -> Option<ScrubEnd> {
        let end = self.scrubber.end(fraction, duration);
        if end.is_some() {
            self.scrub_thumbnail.set_visible(false);
        }
        end
    }

    /// Update position display from the playback clock. Skipped while a scrub
    /// is running so the drag position is not overwritten.
    pub(super) fn update_position(&self, position: Duration) {
        if self.scrubber.is_active() {
            return;
        }
        self.scale.set_value(position.as_secs_f64());
        self.position_label
            .set_text(&format_timestamp(position.as_secs_f64()));
    }

    pub(super) fn update_duration(&self, duration: Duration) {
        self.duration_label
            .set_text(&format_timestamp(duration.as_secs_f64()));
        self.scale.set_range(0.0, duration.as_secs_f64().max(1.0));
    }

    /// Place the hover preview under the pointer and point it at the still
    /// for the hovered fraction.
    pub(super) fn show_preview(&self, fraction: f64, duration: Duration) {
        let hovered = duration.mul_f64(fraction.clamp(0.0, 1.0));
        self.preview_label
            .set_text(&format_timestamp(hovered.as_secs_f64()));

        if let Some(track) = &self.thumbnails {
            self.preview_picture
                .set_filename(Some(track.frame_path(fraction, duration)));
        }

        let offset = fraction * self.scale.width() as f64 - 80.0;
        self.preview_box.set_margin_start(offset.max(0.0) as i32);
        self.preview_box.set_visible(true);
    }

    pub(super) fn hide_preview(&self) {
        if !self.scrubber.is_active() {
            self.preview_box.set_visible(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_clamps_to_the_timeline() {
        assert_eq!(timeline_fraction(-10.0, 200.0), 0.0);
        assert_eq!(timeline_fraction(0.0, 200.0), 0.0);
        assert_eq!(timeline_fraction(100.0, 200.0), 0.5);
        assert_eq!(timeline_fraction(200.0, 200.0), 1.0);
        assert_eq!(timeline_fraction(500.0, 200.0), 1.0);
    }

    #[test]
    fn fraction_with_degenerate_width_is_zero() {
        assert_eq!(timeline_fraction(50.0, 0.0), 0.0);
        assert_eq!(timeline_fraction(50.0, -1.0), 0.0);
    }

    #[test]
    fn release_position_decides_the_seek() {
        let duration = Duration::from_secs(200);
        let mut scrubber = Scrubber::default();

        // Press at one end, release at the other: only the release matters.
        assert!(scrubber.begin(true));
        let end = scrubber.end(0.75, duration).unwrap();
        assert_eq!(end.seek_to, Duration::from_secs(150));
    }

    #[test]
    fn resumes_only_if_playing_at_entry() {
        let duration = Duration::from_secs(100);

        let mut scrubber = Scrubber::default();
        assert!(scrubber.begin(false)); // was playing
        assert!(scrubber.end(0.5, duration).unwrap().resume);

        assert!(scrubber.begin(true)); // was already paused
        assert!(!scrubber.end(0.5, duration).unwrap().resume);
    }

    #[test]
    fn reentrant_press_is_ignored() {
        let mut scrubber = Scrubber::default();
        assert!(scrubber.begin(false));
        // Playback is force-paused during the session; a second press must
        // not overwrite the recorded pre-scrub state with "paused".
        assert!(!scrubber.begin(true));

        let end = scrubber.end(0.5, Duration::from_secs(100)).unwrap();
        assert!(end.resume);
        assert!(!scrubber.is_active());
    }

    #[test]
    fn end_without_session_is_a_no_op() {
        let mut scrubber = Scrubber::default();
        assert!(scrubber.end(0.5, Duration::from_secs(100)).is_none());
    }

    #[test]
    fn only_the_newest_settle_counts() {
        let mut gate = SettleGate::default();
        let first = gate.arm();
        let second = gate.arm();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
    }

    #[test]
    fn session_ends_once_changes_go_quiet() {
        // The range widget swallows the pointer release, so the session must
        // end from the last value change alone.
        let mut scrubber = Scrubber::default();
        let mut gate = SettleGate::default();
        assert!(scrubber.begin(false));

        let mut last = 0;
        for _ in 0..5 {
            last = gate.arm();
        }
        assert!(gate.is_current(last));

        let end = scrubber.end(0.8, Duration::from_secs(100)).unwrap();
        assert_eq!(end.seek_to, Duration::from_secs(80));
        assert!(end.resume);
        assert!(!scrubber.is_active());
    }

    #[test]
    fn end_fraction_is_clamped() {
        let duration = Duration::from_secs(100);
        let mut scrubber = Scrubber::default();
        scrubber.begin(true);
        let end = scrubber.end(1.5, duration).unwrap();
        assert_eq!(end.seek_to, duration);
    }
}
