use marconio_core::clients::app_tile::{tile_menu, AppTile};
use marconio_proto::MediaPlayable;
use tracing::info;

/// No dock or taskbar to draw on; logs the menu it would show.
pub struct LoggingAppTile;

impl AppTile for LoggingAppTile {
    fn update_tile(&mut self, playable: &MediaPlayable) {
        let [heading, line] = tile_menu(playable);
        info!("app tile: {} / {}", heading, line);
    }
}
