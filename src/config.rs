use crate::library::SortBy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pocket8_frontend";

/// Command template for the external PICO-8 runner; "{cart}" in args is
/// replaced with the cartridge path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RunnerTemplate {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ConfigFile {
    pub runner: Option<RunnerTemplate>,
    pub carts_dir: Option<String>,
    pub columns: Option<usize>,
    pub sort_by: Option<SortBy>,
    pub swap_buttons: Option<bool>,
    pub use_joystick: Option<bool>,
    pub haptics_enabled: Option<bool>,
    pub fullscreen: Option<bool>,
    pub font_path: Option<String>,
}

pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let mut p = PathBuf::from(xdg);
        p.push(APP_DIR);
        p.push("config.toml");
        Some(p)
    } else if let Some(home) = dirs::home_dir() {
        let mut p = home;
        p.push(".config");
        p.push(APP_DIR);
        p.push("config.toml");
        Some(p)
    } else {
        None
    }
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // A config_template.toml in the working directory wins over the built-in
    // sample, so a checkout can ship its own starting point.
    let sample = if let Ok(template) = std::fs::read_to_string("config_template.toml") {
        template
    } else {
        include_str!("../config.sample.toml").to_string()
    };
    // atomic write
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, sample.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn default_config() -> ConfigFile {
    ConfigFile {
        runner: Some(RunnerTemplate {
            program: "pico8".to_string(),
            args: vec!["-run".to_string(), "{cart}".to_string()],
        }),
        carts_dir: None,
        columns: Some(3),
        sort_by: Some(SortBy::LastPlayed),
        swap_buttons: Some(false),
        use_joystick: Some(true),
        haptics_enabled: Some(true),
        fullscreen: Some(false),
        font_path: None,
    }
}

/// Parsed fields override the defaults one by one; anything the user left
/// out keeps its built-in value.
pub fn merge(cfg: &mut ConfigFile, parsed: ConfigFile) {
    if parsed.runner.is_some() {
        cfg.runner = parsed.runner;
    }
    if parsed.carts_dir.is_some() {
        cfg.carts_dir = parsed.carts_dir;
    }
    if parsed.columns.is_some() {
        cfg.columns = parsed.columns;
    }
    if parsed.sort_by.is_some() {
        cfg.sort_by = parsed.sort_by;
    }
    if parsed.swap_buttons.is_some() {
        cfg.swap_buttons = parsed.swap_buttons;
    }
    if parsed.use_joystick.is_some() {
        cfg.use_joystick = parsed.use_joystick;
    }
    if parsed.haptics_enabled.is_some() {
        cfg.haptics_enabled = parsed.haptics_enabled;
    }
    if parsed.fullscreen.is_some() {
        cfg.fullscreen = parsed.fullscreen;
    }
    if parsed.font_path.is_some() {
        cfg.font_path = parsed.font_path;
    }
}

pub fn load_config() -> ConfigFile {
    let mut cfg = default_config();
    if let Some(p) = user_config_path() {
        if !p.exists() {
            // write default sample for the user to edit
            if let Err(e) = write_default_config(&p) {
                log::warn!("failed to write default config: {}", e);
            }
        }
        if let Ok(contents) = std::fs::read_to_string(&p) {
            match toml::from_str::<ConfigFile>(&contents) {
                Ok(parsed) => merge(&mut cfg, parsed),
                Err(e) => log::warn!("failed to parse config at {}: {}", p.display(), e),
            }
        }
    }
    cfg
}

pub fn write_config(cfg: &ConfigFile) -> Result<(), String> {
    if let Some(p) = user_config_path() {
        if let Some(parent) = p.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return Err(format!("Failed to create config dir: {}", e));
            }
        }
        match toml::to_string_pretty(cfg) {
            Ok(s) => {
                let tmp = p.with_extension("toml.tmp");
                if let Err(e) = std::fs::write(&tmp, s.as_bytes()) {
                    return Err(format!("Failed writing tmp config: {}", e));
                }
                if let Err(e) = std::fs::rename(&tmp, &p) {
                    return Err(format!("Failed renaming config: {}", e));
                }
                return Ok(());
            }
            Err(e) => return Err(format!("Failed to serialize config: {}", e)),
        }
    }
    Err("No config path available".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_merges_over_defaults() {
        let parsed: ConfigFile = toml::from_str(
            r#"
            columns = 5
            sort_by = "name"
            [runner]
            program = "pico8_dyn"
            args = ["-run", "{cart}"]
            "#,
        )
        .unwrap();

        let mut cfg = default_config();
        merge(&mut cfg, parsed);
        assert_eq!(cfg.columns, Some(5));
        assert_eq!(cfg.sort_by, Some(SortBy::Name));
        assert_eq!(cfg.runner.as_ref().unwrap().program, "pico8_dyn");
        // untouched fields keep their defaults
        assert_eq!(cfg.use_joystick, Some(true));
        assert_eq!(cfg.haptics_enabled, Some(true));
    }

    #[test]
    fn empty_file_keeps_all_defaults() {
        let parsed: ConfigFile = toml::from_str("").unwrap();
        let mut cfg = default_config();
        merge(&mut cfg, parsed);
        assert_eq!(cfg.columns, Some(3));
        assert_eq!(cfg.sort_by, Some(SortBy::LastPlayed));
        assert_eq!(cfg.runner.as_ref().unwrap().program, "pico8");
    }

    #[test]
    fn bundled_sample_parses() {
        let parsed: Result<ConfigFile, _> = toml::from_str(include_str!("../config.sample.toml"));
        assert!(parsed.is_ok());
    }
}
