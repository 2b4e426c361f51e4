//! Background and playlist preferences.

use serde::{Deserialize, Serialize};

use super::container::Persist;
use crate::error::{CoreError, ValidationError};
use crate::storage::{self, keys, KeyValueStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPreset {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: u64,
    pub name: String,
    pub url: String,
}

const PRESET_BASE: &str = "https://vijiatjack.github.io/nookoffice/video-feed";

fn default_presets() -> Vec<BackgroundPreset> {
    let image = |name: &str, n: u8| BackgroundPreset {
        name: name.into(),
        url: format!("{PRESET_BASE}/bg_{n}.gif"),
        kind: MediaKind::Image,
    };
    vec![
        image("Morning", 1),
        image("Afternoon", 2),
        image("Evening", 3),
        image("Night", 4),
        image("Rainy", 5),
        image("Coffee", 6),
        image("Snowy", 7),
        BackgroundPreset {
            name: "The Roost (YT)".into(),
            url: "https://youtu.be/bAaW9cf6Yw0".into(),
            kind: MediaKind::Video,
        },
    ]
}

fn default_playlists() -> Vec<Playlist> {
    vec![
        Playlist {
            id: 1,
            name: "Lofi Beats".into(),
            url: "https://open.spotify.com/embed/playlist/0vvXsWCC9xrXsKd4FyS8kM".into(),
        },
        Playlist {
            id: 2,
            name: "Deep Focus".into(),
            url: "https://open.spotify.com/embed/playlist/37i9dQZF1DWZeKCadgRdKQ".into(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaState {
    pub bg_url: String,
    /// 0.0 ..= 1.0
    pub bg_opacity: f64,
    pub bg_presets: Vec<BackgroundPreset>,
    pub playlists: Vec<Playlist>,
    pub custom_sounds: Vec<serde_json::Value>,
}

impl Default for MediaState {
    fn default() -> Self {
        let bg_presets = default_presets();
        Self {
            // The "Night" preset.
            bg_url: bg_presets[3].url.clone(),
            bg_opacity: 0.4,
            bg_presets,
            playlists: default_playlists(),
            custom_sounds: Vec::new(),
        }
    }
}

impl MediaState {
    pub fn load(kv: &dyn KeyValueStore) -> Self {
        storage::load_or(kv, keys::MEDIA, Self::default())
    }

    /// Select a background by preset name or by URL.
    pub fn set_background(&mut self, name_or_url: &str) -> Result<(), ValidationError> {
        if let Some(preset) = self
            .bg_presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name_or_url))
        {
            self.bg_url = preset.url.clone();
            return Ok(());
        }
        url::Url::parse(name_or_url).map_err(|e| ValidationError::InvalidValue {
            field: "bgUrl".into(),
            message: e.to_string(),
        })?;
        self.bg_url = name_or_url.to_string();
        Ok(())
    }

    pub fn set_opacity(&mut self, opacity: f64) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(ValidationError::InvalidValue {
                field: "bgOpacity".into(),
                message: format!("{opacity} is outside 0..=1"),
            });
        }
        self.bg_opacity = opacity;
        Ok(())
    }
}

impl Persist for MediaState {
    fn persist(&self, prev: &Self, kv: &dyn KeyValueStore) -> Result<(), CoreError> {
        if self == prev {
            return Ok(());
        }
        storage::save(kv, keys::MEDIA, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_night_preset() {
        let media = MediaState::default();
        assert!(media.bg_url.ends_with("bg_4.gif"));
        assert_eq!(media.bg_presets.len(), 8);
        assert_eq!(media.playlists.len(), 2);
    }

    #[test]
    fn background_by_name_or_url() {
        let mut media = MediaState::default();
        media.set_background("rainy").unwrap();
        assert!(media.bg_url.ends_with("bg_5.gif"));
        media.set_background("https://example.com/bg.png").unwrap();
        assert_eq!(media.bg_url, "https://example.com/bg.png");
        assert!(media.set_background("not a url").is_err());
    }

    #[test]
    fn opacity_is_bounded() {
        let mut media = MediaState::default();
        assert!(media.set_opacity(1.5).is_err());
        media.set_opacity(0.8).unwrap();
        assert_eq!(media.bg_opacity, 0.8);
    }
}
