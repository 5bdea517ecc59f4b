use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StyleConfig {
    pub background: Option<[u8; 3]>,
    pub tile_normal: Option<[u8; 3]>,
    pub tile_focused: Option<[u8; 3]>,
    pub tile_favorite: Option<[u8; 3]>,
    pub text_primary: Option<[u8; 3]>,
    pub text_secondary: Option<[u8; 3]>,
    pub header_bg: Option<[u8; 3]>,
    pub header_text: Option<[u8; 3]>,
    pub header_focused: Option<[u8; 3]>,
    pub menu_bg: Option<[u8; 3]>,
    pub menu_box: Option<[u8; 3]>,
    pub menu_selected: Option<[u8; 3]>,
    pub menu_text: Option<[u8; 3]>,
    pub toast_success: Option<[u8; 3]>,
    pub toast_error: Option<[u8; 3]>,
    pub toast_info: Option<[u8; 3]>,
    pub overlay_bg: Option<[u8; 3]>,
    pub overlay_alpha: Option<u8>,
}

pub fn user_style_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let mut p = PathBuf::from(xdg);
        p.push("pocket8_frontend");
        p.push("style.toml");
        Some(p)
    } else if let Some(home) = dirs::home_dir() {
        let mut p = home;
        p.push(".config/pocket8_frontend/style.toml");
        Some(p)
    } else {
        None
    }
}

fn write_default_style(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let sample = if let Ok(s) = std::fs::read_to_string("style.sample.toml") {
        s
    } else {
        include_str!("../style.sample.toml").to_string()
    };
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, sample.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn default_style() -> StyleConfig {
    StyleConfig {
        background: Some([16, 12, 24]),
        tile_normal: Some([50, 46, 62]),
        tile_focused: Some([255, 163, 0]),
        tile_favorite: Some([255, 119, 168]),
        text_primary: Some([240, 240, 240]),
        text_secondary: Some([170, 170, 180]),
        header_bg: Some([24, 20, 36]),
        header_text: Some([220, 220, 220]),
        header_focused: Some([255, 163, 0]),
        menu_bg: Some([10, 10, 16]),
        menu_box: Some([40, 36, 52]),
        menu_selected: Some([80, 74, 96]),
        menu_text: Some([220, 220, 220]),
        toast_success: Some([0, 180, 90]),
        toast_error: Some([200, 60, 60]),
        toast_info: Some([60, 100, 200]),
        overlay_bg: Some([0, 0, 0]),
        overlay_alpha: Some(200),
    }
}

pub fn merge(style: &mut StyleConfig, parsed: StyleConfig) {
    if parsed.background.is_some() {
        style.background = parsed.background;
    }
    if parsed.tile_normal.is_some() {
        style.tile_normal = parsed.tile_normal;
    }
    if parsed.tile_focused.is_some() {
        style.tile_focused = parsed.tile_focused;
    }
    if parsed.tile_favorite.is_some() {
        style.tile_favorite = parsed.tile_favorite;
    }
    if parsed.text_primary.is_some() {
        style.text_primary = parsed.text_primary;
    }
    if parsed.text_secondary.is_some() {
        style.text_secondary = parsed.text_secondary;
    }
    if parsed.header_bg.is_some() {
        style.header_bg = parsed.header_bg;
    }
    if parsed.header_text.is_some() {
        style.header_text = parsed.header_text;
    }
    if parsed.header_focused.is_some() {
        style.header_focused = parsed.header_focused;
    }
    if parsed.menu_bg.is_some() {
        style.menu_bg = parsed.menu_bg;
    }
    if parsed.menu_box.is_some() {
        style.menu_box = parsed.menu_box;
    }
    if parsed.menu_selected.is_some() {
        style.menu_selected = parsed.menu_selected;
    }
    if parsed.menu_text.is_some() {
        style.menu_text = parsed.menu_text;
    }
    if parsed.toast_success.is_some() {
        style.toast_success = parsed.toast_success;
    }
    if parsed.toast_error.is_some() {
        style.toast_error = parsed.toast_error;
    }
    if parsed.toast_info.is_some() {
        style.toast_info = parsed.toast_info;
    }
    if parsed.overlay_bg.is_some() {
        style.overlay_bg = parsed.overlay_bg;
    }
    if parsed.overlay_alpha.is_some() {
        style.overlay_alpha = parsed.overlay_alpha;
    }
}

pub fn load_style() -> StyleConfig {
    let mut style = default_style();
    if let Some(p) = user_style_path() {
        if !p.exists() {
            if let Err(e) = write_default_style(&p) {
                log::warn!("failed to write default style: {}", e);
            }
        }
        if let Ok(contents) = std::fs::read_to_string(&p) {
            match toml::from_str::<StyleConfig>(&contents) {
                Ok(parsed) => merge(&mut style, parsed),
                Err(e) => log::warn!("failed to parse style at {}: {}", p.display(), e),
            }
        }
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_style_merges_over_defaults() {
        let parsed: StyleConfig = toml::from_str("tile_focused = [1, 2, 3]").unwrap();
        let mut style = default_style();
        merge(&mut style, parsed);
        assert_eq!(style.tile_focused, Some([1, 2, 3]));
        assert_eq!(style.background, Some([16, 12, 24]));
    }

    #[test]
    fn bundled_sample_parses() {
        let parsed: Result<StyleConfig, _> = toml::from_str(include_str!("../style.sample.toml"));
        assert!(parsed.is_ok());
    }
}
