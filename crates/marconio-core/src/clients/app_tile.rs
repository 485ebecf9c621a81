use marconio_proto::MediaPlayable;

pub const TILE_HEADING: &str = "Now Playing";

/// Dock/taskbar tile. Fire-and-forget.
pub trait AppTile: Send {
    fn update_tile(&mut self, playable: &MediaPlayable);
}

/// The two menu lines a tile shows for `playable`.
pub fn tile_menu(playable: &MediaPlayable) -> [String; 2] {
    [TILE_HEADING.to_string(), format!("NTS - {}", playable.title)]
}
