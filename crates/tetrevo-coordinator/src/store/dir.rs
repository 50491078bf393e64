use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use super::{SharedStore, StoreError};

/// Store backed by a directory on a filesystem every unit can reach.
///
/// Each key is one file, written to a temporary name and renamed into place
/// so readers never see a partial value. Each set is a directory holding one
/// empty file per member.
///
/// Barrier sets and records of an earlier run would count toward a new one,
/// so units taking part in a run open it with [`DirStore::open_run`], which
/// claims the directory for one run name and refuses any other.
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
}

/// Distinguishes temporary files of stores opened in the same process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File naming the run a directory belongs to.
const RUN_MARKER: &str = "run";

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_owned(),
        source,
    }
}

/// Maps a store key to a file name (`render_bot:3` -> `render_bot.3`).
fn file_name(key: &str) -> String {
    key.replace([':', '/', '\\'], ".")
}

impl DirStore {
    /// Opens the store rooted at `root`, creating the directory if needed.
    pub fn open<P>(root: P) -> Result<Self, StoreError>
    where
        P: Into<PathBuf>,
    {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_error(&root))?;
        log::info!("shared store at {}", root.display());
        Ok(Self { root })
    }

    /// Opens the store rooted at `root` for the run named `run`.
    ///
    /// The first unit to arrive claims an empty directory by writing a `run`
    /// marker; later units with the same name join it. A directory claimed by
    /// another run, or holding data without a marker, is refused.
    pub fn open_run<P>(root: P, run: &str) -> Result<Self, StoreError>
    where
        P: Into<PathBuf>,
    {
        let store = Self::open(root)?;
        let marker = store.root.join(RUN_MARKER);
        if let Some(found) = Self::read_marker(&marker)? {
            return store.check_run(found, run);
        }

        let leftovers = fs::read_dir(&store.root)
            .map_err(io_error(&store.root))?
            .filter_map(Result::ok)
            .any(|e| !e.file_name().to_string_lossy().starts_with(RUN_MARKER));
        if leftovers {
            // a unit may have claimed the directory and written since the first look
            return match Self::read_marker(&marker)? {
                Some(found) => store.check_run(found, run),
                None => Err(StoreError::NotEmpty { path: store.root }),
            };
        }

        // linking fails if a concurrent unit claimed the directory first
        let temp = Self::temp_path(&marker);
        fs::write(&temp, run).map_err(io_error(&temp))?;
        let linked = fs::hard_link(&temp, &marker);
        fs::remove_file(&temp).map_err(io_error(&temp))?;
        match linked {
            Ok(()) => {
                log::info!("claimed {} for run `{run}`", store.root.display());
                Ok(store)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let found = Self::read_marker(&marker)?.unwrap_or_default();
                store.check_run(found, run)
            }
            Err(e) => Err(io_error(&marker)(e)),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_name(key)))
    }

    fn set_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.set", file_name(key)))
    }

    fn read_marker(marker: &Path) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(marker) {
            Ok(run) => Ok(Some(run)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(marker)(e)),
        }
    }

    fn check_run(self, found: String, run: &str) -> Result<Self, StoreError> {
        if found != run {
            return Err(StoreError::ForeignRun {
                path: self.root,
                found,
                expected: run.to_owned(),
            });
        }
        log::debug!("joined run `{run}` at {}", self.root.display());
        Ok(self)
    }

    fn temp_path(path: &Path) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("tmp-{}-{n}", std::process::id()))
    }

    fn write_atomic(path: &Path, value: &str) -> Result<(), StoreError> {
        let temp = Self::temp_path(path);
        fs::write(&temp, value).map_err(io_error(&temp))?;
        fs::rename(&temp, path).map_err(io_error(path))
    }
}

impl SharedStore for DirStore {
    fn set_many(&self, entries: &[(String, String)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            Self::write_atomic(&self.value_path(key), value)?;
        }
        Ok(())
    }

    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        keys.iter()
            .map(|key| {
                let path = self.value_path(key);
                match fs::read_to_string(&path) {
                    Ok(value) => Ok(Some(value)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(io_error(&path)(e)),
                }
            })
            .collect()
    }

    fn join_set(&self, key: &str, member: &str) -> Result<usize, StoreError> {
        let dir = self.set_path(key);
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        let member_path = dir.join(file_name(member));
        fs::write(&member_path, b"").map_err(io_error(&member_path))?;
        let count = fs::read_dir(&dir).map_err(io_error(&dir))?.count();
        Ok(count)
    }
}
