use anyhow::{Context, Result};
use gtk::prelude::*;
use libadwaita as adw;
use libadwaita::prelude::*;
use relm4::gtk;
use relm4::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::player::GStreamerPlayer;
use crate::ui::player::{PlayerInit, PlayerPage};

const APP_ID: &str = "com.github.marquee";

pub struct MarqueeApp {
    media_path: PathBuf,
}

impl MarqueeApp {
    pub fn new(media_path: PathBuf) -> Self {
        Self { media_path }
    }

    pub fn run(self) -> Result<()> {
        let config = Config::load().context("Failed to load configuration")?;

        let player = GStreamerPlayer::new().context("Failed to set up playback pipeline")?;
        let subtitles = find_subtitle_sidecar(&self.media_path);
        if let Some(subtitles) = &subtitles {
            info!("Found subtitle sidecar {:?}", subtitles);
        }
        player
            .load(&self.media_path, subtitles.as_deref())
            .context("Failed to load media")?;
        player.set_volume(config.playback.initial_volume);

        relm4::set_global_css(include_str!("ui/style.css"));

        let app = RelmApp::new(APP_ID);
        // The media path already came in through our own argv.
        app.with_args(vec![]).run::<MainWindow>(WindowInit {
            player,
            media_path: self.media_path,
            config,
        });
        Ok(())
    }
}

/// Look for a subtitle file next to the media, matching its stem.
fn find_subtitle_sidecar(media_path: &Path) -> Option<PathBuf> {
    ["srt", "vtt"]
        .iter()
        .map(|ext| media_path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

pub struct WindowInit {
    player: GStreamerPlayer,
    media_path: PathBuf,
    config: Config,
}

pub struct MainWindow {
    player_page: Controller<PlayerPage>,
}

impl std::fmt::Debug for MainWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainWindow").finish()
    }
}

#[relm4::component(pub)]
impl SimpleComponent for MainWindow {
    type Init = WindowInit;
    type Input = ();
    type Output = ();

    view! {
        adw::ApplicationWindow {
            set_title: Some("Marquee"),
            set_default_size: (1280, 720),

            set_content: Some(model.player_page.widget()),
        }
    }

    fn init(
        init: Self::Init,
        root: Self::Root,
        _sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let player_page = PlayerPage::builder()
            .launch(PlayerInit {
                player: init.player,
                media_path: init.media_path,
                config: init.config,
                window: root.clone(),
            })
            .detach();

        let model = MainWindow { player_page };
        let widgets = view_output!();

        ComponentParts { model, widgets }
    }
}
