use gtk::gdk;
use gtk::prelude::*;
use relm4::gtk;

/// Player actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Shortcut {
    PlayPause,
    Fullscreen,
    Theater,
    MiniPlayer,
    Mute,
    SkipBack,
    SkipForward,
    Captions,
}

/// What currently holds keyboard focus, as far as shortcut dispatch cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FocusContext {
    None,
    Button,
    TextInput,
}

impl FocusContext {
    pub(super) fn from_widget(widget: Option<&gtk::Widget>) -> Self {
        match widget {
            Some(w) if w.is::<gtk::Editable>() || w.is::<gtk::TextView>() => Self::TextInput,
            Some(w) if w.is::<gtk::Button>() => Self::Button,
            _ => Self::None,
        }
    }
}

/// Map a pressed key to a player action, case-insensitively.
///
/// All shortcuts are suppressed while a text input has focus. Space is
/// additionally suppressed while a button has focus, which would otherwise
/// activate the button and toggle playback in the same keystroke.
pub(super) fn shortcut_for_key(key: gdk::Key, focus: FocusContext) -> Option<Shortcut> {
    if focus == FocusContext::TextInput {
        return None;
    }

    if key == gdk::Key::space {
        if focus == FocusContext::Button {
            return None;
        }
        return Some(Shortcut::PlayPause);
    }

    match key.to_lower() {
        gdk::Key::k => Some(Shortcut::PlayPause),
        gdk::Key::f => Some(Shortcut::Fullscreen),
        gdk::Key::t => Some(Shortcut::Theater),
        gdk::Key::i => Some(Shortcut::MiniPlayer),
        gdk::Key::m => Some(Shortcut::Mute),
        gdk::Key::Left | gdk::Key::j => Some(Shortcut::SkipBack),
        gdk::Key::Right | gdk::Key::l => Some(Shortcut::SkipForward),
        gdk::Key::c => Some(Shortcut::Captions),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_playback_keys() {
        assert_eq!(
            shortcut_for_key(gdk::Key::space, FocusContext::None),
            Some(Shortcut::PlayPause)
        );
        assert_eq!(
            shortcut_for_key(gdk::Key::k, FocusContext::None),
            Some(Shortcut::PlayPause)
        );
        assert_eq!(
            shortcut_for_key(gdk::Key::m, FocusContext::None),
            Some(Shortcut::Mute)
        );
        assert_eq!(
            shortcut_for_key(gdk::Key::c, FocusContext::None),
            Some(Shortcut::Captions)
        );
    }

    #[test]
    fn mapping_is_case_insensitive() {
        assert_eq!(
            shortcut_for_key(gdk::Key::K, FocusContext::None),
            Some(Shortcut::PlayPause)
        );
        assert_eq!(
            shortcut_for_key(gdk::Key::F, FocusContext::None),
            Some(Shortcut::Fullscreen)
        );
        assert_eq!(
            shortcut_for_key(gdk::Key::T, FocusContext::None),
            Some(Shortcut::Theater)
        );
    }

    #[test]
    fn maps_seek_keys_with_aliases() {
        for key in [gdk::Key::Left, gdk::Key::j] {
            assert_eq!(
                shortcut_for_key(key, FocusContext::None),
                Some(Shortcut::SkipBack)
            );
        }
        for key in [gdk::Key::Right, gdk::Key::l] {
            assert_eq!(
                shortcut_for_key(key, FocusContext::None),
                Some(Shortcut::SkipForward)
            );
        }
    }

    #[test]
    fn text_input_focus_suppresses_everything() {
        for key in [
            gdk::Key::space,
            gdk::Key::k,
            gdk::Key::f,
            gdk::Key::m,
            gdk::Key::Left,
        ] {
            assert_eq!(shortcut_for_key(key, FocusContext::TextInput), None);
        }
    }

    #[test]
    fn button_focus_only_suppresses_space() {
        assert_eq!(shortcut_for_key(gdk::Key::space, FocusContext::Button), None);
        assert_eq!(
            shortcut_for_key(gdk::Key::k, FocusContext::Button),
            Some(Shortcut::PlayPause)
        );
        assert_eq!(
            shortcut_for_key(gdk::Key::f, FocusContext::Button),
            Some(Shortcut::Fullscreen)
        );
    }

    #[test]
    fn unmapped_keys_produce_nothing() {
        assert_eq!(shortcut_for_key(gdk::Key::q, FocusContext::None), None);
        assert_eq!(shortcut_for_key(gdk::Key::Escape, FocusContext::None), None);
        assert_eq!(shortcut_for_key(gdk::Key::_1, FocusContext::None), None);
    }
}
