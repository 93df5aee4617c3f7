use crate::episode::Episode;

/// Playback capability supplied by the host application
///
/// The audio player's own state lives elsewhere; pages only hand it the
/// episode to play.
pub trait Player: Send + Sync {
    fn play(&self, episode: &Episode);
}
