use gtk::glib;
use gtk::prelude::*;
use relm4::ComponentSender;
use relm4::gtk;

use super::{PlayerInput, PlayerPage};

/// Coarse volume bucket shown to the user. Pure function of the backend's
/// (muted, volume) pair, recomputed on every volume notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum VolumeLevel {
    Muted,
    Low,
    High,
}

impl VolumeLevel {
    pub(super) fn derive(muted: bool, volume: f64) -> Self {
        if muted || volume == 0.0 {
            Self::Muted
        } else if volume >= 0.5 {
            Self::High
        } else {
            Self::Low
        }
    }

    pub(super) fn css_class(self) -> &'static str {
        match self {
            Self::Muted => "volume-muted",
            Self::Low => "volume-low",
            Self::High => "volume-high",
        }
    }

    fn icon_name(self) -> &'static str {
        match self {
            Self::Muted => "audio-volume-muted-symbolic",
            Self::Low => "audio-volume-low-symbolic",
            Self::High => "audio-volume-high-symbolic",
        }
    }
}

/// Manages the mute button and volume slider.
///
/// Slider input flows to the backend; the displayed value and button icon are
/// only updated from backend volume notifications via [`sync`](Self::sync).
pub(super) struct VolumeManager {
    mute_button: gtk::Button,
    slider: gtk::Scale,
    slider_handler: glib::SignalHandlerId,
    level: VolumeLevel,
}

impl VolumeManager {
    pub(super) fn new(sender: &ComponentSender<PlayerPage>) -> Self {
        let mute_button = gtk::Button::from_icon_name(VolumeLevel::High.icon_name());
        mute_button.add_css_class("flat");
        mute_button.set_tooltip_text(Some("Mute"));
        {
            let sender = sender.clone();
            mute_button.connect_clicked(move |_| {
                sender.input(PlayerInput::ToggleMute);
            });
        }

        let slider = gtk::Scale::with_range(gtk::Orientation::Horizontal, 0.0, 1.0, 0.01);
        slider.set_value(1.0);
        slider.set_draw_value(false);
        slider.set_width_request(100);
        slider.add_css_class("volume-slider");

        let slider_handler = {
            let sender = sender.clone();
            slider.connect_value_changed(move |scale| {
                sender.input(PlayerInput::SetVolume(scale.value()));
            })
        };

        Self {
            mute_button,
            slider,
            slider_handler,
            level: VolumeLevel::High,
        }
    }

    pub(super) fn mute_button(&self) -> gtk::Button {
        self.mute_button.clone()
    }

    pub(super) fn slider(&self) -> gtk::Scale {
        self.slider.clone()
    }

    pub(super) fn level(&self) -> VolumeLevel {
        self.level
    }

    /// Mirror backend volume state. The slider shows 0 while muted, whatever
    /// the underlying volume is; its change signal is blocked so mirroring
    /// does not echo back into the backend.
    pub(super) fn sync(&mut self, muted: bool, volume: f64) {
        self.level = VolumeLevel::derive(muted, volume);

        let shown = if self.level == VolumeLevel::Muted {
            0.0
        } else {
            volume
        };
        self.slider.block_signal(&self.slider_handler);
        self.slider.set_value(shown);
        self.slider.unblock_signal(&self.slider_handler);

        self.mute_button.set_icon_name(self.level.icon_name());
        self.mute_button.set_tooltip_text(Some(if muted {
            "Unmute"
        } else {
            "Mute"
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_wins_over_volume() {
        assert_eq!(VolumeLevel::derive(true, 1.0), VolumeLevel::Muted);
        assert_eq!(VolumeLevel::derive(true, 0.3), VolumeLevel::Muted);
        assert_eq!(VolumeLevel::derive(true, 0.0), VolumeLevel::Muted);
    }

    #[test]
    fn zero_volume_counts_as_muted() {
        assert_eq!(VolumeLevel::derive(false, 0.0), VolumeLevel::Muted);
    }

    #[test]
    fn half_volume_is_the_high_threshold() {
        assert_eq!(VolumeLevel::derive(false, 0.5), VolumeLevel::High);
        assert_eq!(VolumeLevel::derive(false, 1.0), VolumeLevel::High);
        assert_eq!(VolumeLevel::derive(false, 0.49), VolumeLevel::Low);
        assert_eq!(VolumeLevel::derive(false, 0.01), VolumeLevel::Low);
    }

    #[test]
    fn derivation_is_total_over_the_slider_range() {
        for step in 0..=100 {
            let volume = step as f64 / 100.0;
            let level = VolumeLevel::derive(false, volume);
            if volume == 0.0 {
                assert_eq!(level, VolumeLevel::Muted);
            } else if volume >= 0.5 {
                assert_eq!(level, VolumeLevel::High);
            } else {
                assert_eq!(level, VolumeLevel::Low);
            }
        }
    }
}
