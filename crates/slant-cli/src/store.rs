use anyhow::{Context, Result};
use slant_core::{Dimensions, Game, SavedSession};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// One saved session per board size under a data directory
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// `<platform data dir>/slant`, or `./slant` when there is none.
    pub fn open_default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(base.join("slant"))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, dims: Dimensions) -> PathBuf {
        self.dir.join(format!("session-{}x{}.json", dims.rows(), dims.cols()))
    }

    /// The saved game for this size, if there is one.
    pub fn load(&self, dims: Dimensions) -> Result<Option<Game>> {
        let path = self.path(dims);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
        };
        let saved = SavedSession::from_json(&json).with_context(|| format!("parsing {}", path.display()))?;
        let game = Game::from_saved(&saved).with_context(|| format!("restoring {}", path.display()))?;
        debug!(path = %path.display(), "session loaded");
        Ok(Some(game))
    }

    pub fn save(&self, game: &Game) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path(game.dims());
        let json = game.to_saved().to_json()?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "session saved");
        Ok(path)
    }

    /// Remove the saved game for this size. Returns whether one existed.
    pub fn clear(&self, dims: Dimensions) -> Result<bool> {
        let path = self.path(dims);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("removing {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slant_core::{Cell, Generator};

    fn game(rows: usize, cols: usize) -> Game {
        Game::from_puzzle(Generator::with_seed(4).generate(Dimensions::new(rows, cols).unwrap()))
    }

    #[test]
    fn test_missing_session_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::at(tmp.path().join("nested"));
        assert!(store.load(Dimensions::new(3, 3).unwrap()).unwrap().is_none());
        assert!(!store.clear(Dimensions::new(3, 3).unwrap()).unwrap());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::at(tmp.path());
        let mut live = game(4, 3);
        live.set_cell(0, 0, Cell::Forward);

        let path = store.save(&live).unwrap();
        assert!(path.ends_with("session-4x3.json"));

        let loaded = store.load(live.dims()).unwrap().unwrap();
        assert_eq!(loaded.grid(), live.grid());
        assert_eq!(loaded.to_saved(), live.to_saved());
    }

    #[test]
    fn test_sizes_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::at(tmp.path());
        store.save(&game(3, 3)).unwrap();
        store.save(&game(5, 5)).unwrap();
        assert!(store.clear(Dimensions::new(3, 3).unwrap()).unwrap());
        assert!(store.load(Dimensions::new(5, 5).unwrap()).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::at(tmp.path());
        let dims = Dimensions::new(3, 3).unwrap();
        fs::write(store.path(dims), "{not json").unwrap();
        let err = store.load(dims).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
