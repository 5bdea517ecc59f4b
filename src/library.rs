use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

const METADATA_FILE: &str = "library.toml";
const P8_HEADER: &str = "pico-8 cartridge";

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a PICO-8 cartridge: {0}")]
    InvalidCart(String),
    #[error("cartridge not found: {0}")]
    NotFound(String),
    #[error("failed to serialize metadata: {0}")]
    Metadata(#[from] toml::ser::Error),
}

/// Per-cartridge sidecar metadata, keyed by filename.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CartMeta {
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub last_played: u64,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct MetaFile {
    #[serde(default)]
    carts: HashMap<String, CartMeta>,
}

/// One scanned cartridge as shown in the grid.
#[derive(Clone, Debug)]
pub struct CartEntry {
    pub filename: String,
    pub path: PathBuf,
    /// Display name: metadata override, else filename without cart suffix.
    pub name: String,
    pub mtime: u64,
    pub meta: CartMeta,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    LastPlayed,
    Name,
    Newest,
    Oldest,
}

impl SortBy {
    pub fn label(&self) -> &'static str {
        match self {
            SortBy::LastPlayed => "last played",
            SortBy::Name => "name",
            SortBy::Newest => "newest",
            SortBy::Oldest => "oldest",
        }
    }

    pub fn next(&self) -> SortBy {
        match self {
            SortBy::LastPlayed => SortBy::Name,
            SortBy::Name => SortBy::Newest,
            SortBy::Newest => SortBy::Oldest,
            SortBy::Oldest => SortBy::LastPlayed,
        }
    }
}

pub fn is_cart_filename(name: &str) -> bool {
    let n = name.to_lowercase();
    n.ends_with(".p8") || n.ends_with(".p8.png")
}

/// Strip the cartridge suffix for display.
pub fn cart_stem(name: &str) -> &str {
    let lower = name.to_lowercase();
    if lower.ends_with(".p8.png") {
        &name[..name.len() - ".p8.png".len()]
    } else if lower.ends_with(".p8") {
        &name[..name.len() - ".p8".len()]
    } else {
        name
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The on-disk cartridge shelf: a carts directory plus a TOML metadata
/// sidecar. Individual unreadable entries are skipped during scans, never
/// fatal.
pub struct Library {
    carts_dir: PathBuf,
    metadata: MetaFile,
    entries: Vec<CartEntry>,
}

impl Library {
    pub fn open(carts_dir: &Path) -> Result<Self, LibraryError> {
        fs::create_dir_all(carts_dir)?;
        let mut lib = Library {
            carts_dir: carts_dir.to_path_buf(),
            metadata: MetaFile::default(),
            entries: Vec::new(),
        };
        lib.load_metadata();
        lib.scan()?;
        Ok(lib)
    }

    pub fn carts_dir(&self) -> &Path {
        &self.carts_dir
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    fn metadata_path(&self) -> PathBuf {
        self.carts_dir.join(METADATA_FILE)
    }

    fn load_metadata(&mut self) {
        let path = self.metadata_path();
        if let Ok(contents) = fs::read_to_string(&path) {
            match toml::from_str::<MetaFile>(&contents) {
                Ok(parsed) => self.metadata = parsed,
                Err(e) => log::warn!("ignoring unparsable {}: {}", path.display(), e),
            }
        }
    }

    pub fn scan(&mut self) -> Result<(), LibraryError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.carts_dir)? {
            let Ok(entry) = entry else { continue };
            let Ok(file_type) = entry.file_type() else { continue };
            if !file_type.is_file() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !is_cart_filename(&filename) {
                continue;
            }
            let meta = self
                .metadata
                .carts
                .get(&filename)
                .cloned()
                .unwrap_or_default();
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let name = meta
                .display_name
                .clone()
                .unwrap_or_else(|| cart_stem(&filename).to_string());
            entries.push(CartEntry {
                path: entry.path(),
                filename,
                name,
                mtime,
                meta,
            });
        }
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        log::info!(
            "library scan: {} carts in {}",
            entries.len(),
            self.carts_dir.display()
        );
        self.entries = entries;
        Ok(())
    }

    /// Entries matching the search query, favorites first, then the chosen
    /// sort strategy.
    pub fn visible(&self, query: &str, sort: SortBy) -> Vec<CartEntry> {
        let q = query.trim().to_lowercase();
        let mut result: Vec<CartEntry> = self
            .entries
            .iter()
            .filter(|e| {
                q.is_empty()
                    || e.name.to_lowercase().contains(&q)
                    || e.filename.to_lowercase().contains(&q)
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            b.meta
                .favorite
                .cmp(&a.meta.favorite)
                .then_with(|| match sort {
                    SortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                    SortBy::LastPlayed => b.meta.last_played.cmp(&a.meta.last_played),
                    SortBy::Newest => b.mtime.cmp(&a.mtime),
                    SortBy::Oldest => a.mtime.cmp(&b.mtime),
                })
        });
        result
    }

    /// Copy a cartridge into the shelf. Plain `.p8` files must carry the
    /// PICO-8 text header; `.p8.png` images are taken as-is.
    pub fn import_file(&mut self, src: &Path) -> Result<String, LibraryError> {
        let filename = src
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LibraryError::InvalidCart(src.display().to_string()))?
            .to_string();
        if !is_cart_filename(&filename) {
            return Err(LibraryError::InvalidCart(filename));
        }
        let lower = filename.to_lowercase();
        if lower.ends_with(".p8") && !lower.ends_with(".p8.png") {
            let text = fs::read_to_string(src)?;
            if !text.contains(P8_HEADER) {
                return Err(LibraryError::InvalidCart(filename));
            }
        }
        fs::copy(src, self.carts_dir.join(&filename))?;
        self.scan()?;
        log::info!("imported cartridge {}", filename);
        Ok(filename)
    }

    pub fn delete(&mut self, filename: &str) -> Result<(), LibraryError> {
        let path = self.carts_dir.join(filename);
        if !path.is_file() {
            return Err(LibraryError::NotFound(filename.to_string()));
        }
        fs::remove_file(path)?;
        if self.metadata.carts.remove(filename).is_some() {
            self.save_metadata()?;
        }
        self.scan()
    }

    pub fn rename(&mut self, filename: &str, new_name: &str) -> Result<(), LibraryError> {
        self.ensure_known(filename)?;
        let meta = self.metadata.carts.entry(filename.to_string()).or_default();
        meta.display_name = Some(new_name.to_string());
        self.save_metadata()?;
        self.scan()
    }

    /// Returns the new favorite state.
    pub fn toggle_favorite(&mut self, filename: &str) -> Result<bool, LibraryError> {
        self.ensure_known(filename)?;
        let meta = self.metadata.carts.entry(filename.to_string()).or_default();
        meta.favorite = !meta.favorite;
        let state = meta.favorite;
        self.save_metadata()?;
        self.scan()?;
        Ok(state)
    }

    /// Bump play count and last-played timestamp after a launch.
    pub fn record_launch(&mut self, filename: &str) -> Result<(), LibraryError> {
        self.ensure_known(filename)?;
        let meta = self.metadata.carts.entry(filename.to_string()).or_default();
        meta.play_count += 1;
        meta.last_played = now_secs();
        self.save_metadata()?;
        self.scan()
    }

    fn ensure_known(&self, filename: &str) -> Result<(), LibraryError> {
        if self.entries.iter().any(|e| e.filename == filename) {
            Ok(())
        } else {
            Err(LibraryError::NotFound(filename.to_string()))
        }
    }

    fn save_metadata(&self) -> Result<(), LibraryError> {
        let serialized = toml::to_string_pretty(&self.metadata)?;
        let path = self.metadata_path();
        // atomic write
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, serialized.as_bytes())?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_cart(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn valid_p8() -> &'static str {
        "pico-8 cartridge // http://www.pico-8.com\nversion 42\n__lua__\nprint(\"hi\")\n"
    }

    #[test]
    fn scan_keeps_only_cartridges() {
        let dir = tempdir().unwrap();
        write_cart(dir.path(), "celeste.p8", valid_p8());
        write_cart(dir.path(), "jelpi.p8.png", "png-bytes");
        write_cart(dir.path(), "notes.txt", "nope");
        write_cart(dir.path(), "bundle.zip", "nope");

        let lib = Library::open(dir.path()).unwrap();
        let names: Vec<&str> = lib.entries().iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["celeste.p8", "jelpi.p8.png"]);
        assert_eq!(lib.entries()[0].name, "celeste");
        assert_eq!(lib.entries()[1].name, "jelpi");
    }

    #[test]
    fn import_validates_p8_header() {
        let shelf = tempdir().unwrap();
        let inbox = tempdir().unwrap();
        let mut lib = Library::open(shelf.path()).unwrap();

        write_cart(inbox.path(), "broken.p8", "this is not a cart");
        assert!(matches!(
            lib.import_file(&inbox.path().join("broken.p8")),
            Err(LibraryError::InvalidCart(_))
        ));

        write_cart(inbox.path(), "good.p8", valid_p8());
        let imported = lib.import_file(&inbox.path().join("good.p8")).unwrap();
        assert_eq!(imported, "good.p8");
        assert!(lib.entries().iter().any(|e| e.filename == "good.p8"));
    }

    #[test]
    fn import_rejects_foreign_extensions() {
        let shelf = tempdir().unwrap();
        let inbox = tempdir().unwrap();
        let mut lib = Library::open(shelf.path()).unwrap();
        write_cart(inbox.path(), "game.gb", "whatever");
        assert!(matches!(
            lib.import_file(&inbox.path().join("game.gb")),
            Err(LibraryError::InvalidCart(_))
        ));
    }

    #[test]
    fn favorites_sort_ahead_of_everything() {
        let dir = tempdir().unwrap();
        write_cart(dir.path(), "alpha.p8", valid_p8());
        write_cart(dir.path(), "beta.p8", valid_p8());
        write_cart(dir.path(), "zeta.p8", valid_p8());

        let mut lib = Library::open(dir.path()).unwrap();
        assert!(lib.toggle_favorite("zeta.p8").unwrap());

        let visible = lib.visible("", SortBy::Name);
        let names: Vec<&str> = visible.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["zeta.p8", "alpha.p8", "beta.p8"]);
    }

    #[test]
    fn last_played_sort_puts_recent_first() {
        let dir = tempdir().unwrap();
        write_cart(dir.path(), "old.p8", valid_p8());
        write_cart(dir.path(), "new.p8", valid_p8());

        let mut lib = Library::open(dir.path()).unwrap();
        lib.record_launch("new.p8").unwrap();

        let visible = lib.visible("", SortBy::LastPlayed);
        assert_eq!(visible[0].filename, "new.p8");
        assert_eq!(visible[0].meta.play_count, 1);
        assert!(visible[0].meta.last_played > 0);
    }

    #[test]
    fn search_matches_display_name_case_insensitively() {
        let dir = tempdir().unwrap();
        write_cart(dir.path(), "celeste.p8", valid_p8());
        write_cart(dir.path(), "jelpi.p8", valid_p8());

        let lib = Library::open(dir.path()).unwrap();
        let visible = lib.visible("CEL", SortBy::Name);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].filename, "celeste.p8");
    }

    #[test]
    fn rename_changes_display_name_only() {
        let dir = tempdir().unwrap();
        write_cart(dir.path(), "celeste.p8", valid_p8());

        let mut lib = Library::open(dir.path()).unwrap();
        lib.rename("celeste.p8", "Celeste Classic").unwrap();
        assert_eq!(lib.entries()[0].name, "Celeste Classic");
        assert_eq!(lib.entries()[0].filename, "celeste.p8");
    }

    #[test]
    fn delete_removes_file_and_metadata() {
        let dir = tempdir().unwrap();
        write_cart(dir.path(), "celeste.p8", valid_p8());

        let mut lib = Library::open(dir.path()).unwrap();
        lib.toggle_favorite("celeste.p8").unwrap();
        lib.delete("celeste.p8").unwrap();
        assert!(lib.entries().is_empty());
        assert!(!dir.path().join("celeste.p8").exists());

        assert!(matches!(
            lib.delete("celeste.p8"),
            Err(LibraryError::NotFound(_))
        ));
    }

    #[test]
    fn metadata_survives_reopen() {
        let dir = tempdir().unwrap();
        write_cart(dir.path(), "celeste.p8", valid_p8());

        {
            let mut lib = Library::open(dir.path()).unwrap();
            lib.toggle_favorite("celeste.p8").unwrap();
            lib.record_launch("celeste.p8").unwrap();
        }

        let lib = Library::open(dir.path()).unwrap();
        let entry = &lib.entries()[0];
        assert!(entry.meta.favorite);
        assert_eq!(entry.meta.play_count, 1);
    }

    #[test]
    fn cart_stem_strips_both_suffixes() {
        assert_eq!(cart_stem("celeste.p8"), "celeste");
        assert_eq!(cart_stem("celeste.p8.png"), "celeste");
        assert_eq!(cart_stem("plain"), "plain");
    }

    #[test]
    fn sort_cycle_covers_all_strategies() {
        let mut s = SortBy::LastPlayed;
        for _ in 0..4 {
            s = s.next();
        }
        assert_eq!(s, SortBy::LastPlayed);
    }
}
