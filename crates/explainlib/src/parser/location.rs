use {
    once_cell::sync::Lazy,
    std::{
        collections::HashSet,
        fmt::{Display, Formatter, Result as FmtResult},
        path::{Path, PathBuf},
        sync::Mutex,
    },
};

static PATHS: Lazy<Mutex<HashSet<&'static Path>>> = Lazy::new(Default::default);

/// Intern a path so that [Location] values can be copied freely.
///
/// Kconfig trees reference a bounded set of files, so interned paths are never released.
pub(crate) fn cache_path(path: PathBuf) -> &'static Path {
    let mut paths = PATHS.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(cached) = paths.get(path.as_path()) {
        return cached;
    }

    let path: &'static Path = Box::leak(path.into_boxed_path());
    paths.insert(path);
    path
}

/// Location information for items in a Kconfig file.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Location {
    /// The file in which the item is located.
    pub filename: &'static Path,

    /// The line number of the item (1-based).
    pub line: u32,

    /// The column number of the item (1-based).
    pub column: u32,
}

impl Location {
    /// Create a location at the start of the given file.
    pub fn start_of(filename: &Path) -> Self {
        Self {
            filename: cache_path(filename.to_owned()),
            line: 1,
            column: 1,
        }
    }

    /// Return this location moved to the given column of the same line.
    #[inline(always)]
    pub fn at_column(self, column: u32) -> Self {
        Self {
            column,
            ..self
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}:{}", self.filename.display(), self.line, self.column)
    }
}

/// A trait for items that carry a [Location].
pub trait Located {
    /// Returns the location of the item.
    fn location(&self) -> Location;
}

#[cfg(test)]
mod tests {
    use {
        super::{cache_path, Location},
        std::path::{Path, PathBuf},
    };

    #[test]
    fn cached_paths_are_shared() {
        let a = cache_path(PathBuf::from("arch/x86/Kconfig"));
        let b = cache_path(PathBuf::from("arch/x86/Kconfig"));
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn display_location() {
        let loc = Location::start_of(Path::new("init/Kconfig"));
        assert_eq!(loc.at_column(7).to_string(), "init/Kconfig:1:7");
    }
}
