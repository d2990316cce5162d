//! Assignments read from defconfig files, indexed by symbol name.

use {
    crate::{kconfig::CONFIG_PREFIX, SymbolId},
    log::trace,
    std::{collections::HashMap, fs, io::Result as IoResult, path::Path},
};

/// Recognizes assignment lines in defconfig files and resolves symbol names.
///
/// The default line matchers accept `CONFIG_<NAME>=<value>` and `# CONFIG_<NAME> is not set`.
pub trait AssignmentMatcher {
    /// Match a `CONFIG_<NAME>=<value>` line, returning the name and value.
    fn match_set<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let (name, value) = line.strip_prefix(CONFIG_PREFIX)?.split_once('=')?;
        (!name.is_empty()).then_some((name, value))
    }

    /// Match a `# CONFIG_<NAME> is not set` line, returning the name.
    fn match_unset<'a>(&self, line: &'a str) -> Option<&'a str> {
        let rest = line.strip_prefix("# ")?.strip_prefix(CONFIG_PREFIX)?;
        let end = rest.find(' ')?;
        (end > 0 && rest[end..].starts_with(" is not set")).then_some(&rest[..end])
    }

    /// Returns the symbol with the given name if it has at least one definition.
    fn lookup_symbol(&self, name: &str) -> Option<SymbolId>;

    /// Read a configuration file.
    fn read_config(&self, path: &Path) -> IoResult<String> {
        fs::read_to_string(path)
    }
}

/// One assignment line from a defconfig file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssignmentRecord {
    /// The symbol name, without the `CONFIG_` prefix.
    pub name: String,

    /// The source line with trailing whitespace removed.
    pub line: String,

    /// The `#` lines immediately preceding the assignment, joined by newlines.
    pub comment: String,

    /// The symbol, if the Kconfig tree defines it.
    pub symbol: Option<SymbolId>,
}

/// Position of a record in [AssignmentIndex::records].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RecordId(usize);

/// Assignments by name plus the ordered list of every assignment loaded.
#[derive(Clone, Debug, Default)]
pub struct AssignmentIndex {
    records: Vec<AssignmentRecord>,
    by_name: HashMap<String, RecordId>,
}

impl AssignmentIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the assignment records from the lines of one defconfig file.
    ///
    /// Each assignment takes the comment lines directly above it. Any other line discards pending comments.
    pub fn ingest<'a, M>(lines: impl IntoIterator<Item = &'a str>, matcher: &M) -> Vec<AssignmentRecord>
    where
        M: AssignmentMatcher + ?Sized,
    {
        let mut records = Vec::new();
        let mut comment_lines: Vec<&str> = Vec::new();

        for line in lines {
            let line = line.trim_end();

            let name = match matcher.match_set(line) {
                Some((name, _)) => Some(name),
                None => matcher.match_unset(line),
            };

            match name {
                Some(name) => {
                    trace!("assignment to {name}: {line:?}");
                    records.push(AssignmentRecord {
                        name: name.to_string(),
                        line: line.to_string(),
                        comment: comment_lines.join("\n"),
                        symbol: matcher.lookup_symbol(name),
                    });
                    comment_lines.clear();
                }
                None if line.starts_with('#') => comment_lines.push(line),
                None => comment_lines.clear(),
            }
        }

        records
    }

    /// Read a defconfig file and extract its assignment records.
    pub fn read_file<M>(path: &Path, matcher: &M) -> IoResult<Vec<AssignmentRecord>>
    where
        M: AssignmentMatcher + ?Sized,
    {
        let data = matcher.read_config(path)?;
        Ok(Self::ingest(data.lines(), matcher))
    }

    /// Add records to the index. A later record replaces an earlier one with the same name in the name lookup;
    /// the ordered list keeps both.
    pub fn load(&mut self, records: impl IntoIterator<Item = AssignmentRecord>) {
        for record in records {
            let id = RecordId(self.records.len());
            self.by_name.insert(record.name.clone(), id);
            self.records.push(record);
        }
    }

    /// Remove all records.
    pub fn reset(&mut self) {
        self.records.clear();
        self.by_name.clear();
    }

    /// Returns the id of the current record for `name`.
    pub fn lookup(&self, name: &str) -> Option<RecordId> {
        self.by_name.get(name).copied()
    }

    /// Returns the current record for `name`.
    pub fn get(&self, name: &str) -> Option<&AssignmentRecord> {
        self.lookup(name).map(|id| &self.records[id.0])
    }

    /// Returns the record with the given id.
    pub fn record(&self, id: RecordId) -> &AssignmentRecord {
        &self.records[id.0]
    }

    /// All records in load order, including those replaced in the name lookup.
    pub fn records(&self) -> &[AssignmentRecord] {
        &self.records
    }

    /// The number of distinct names assigned.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Indicates whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{AssignmentIndex, AssignmentMatcher},
        crate::SymbolId,
    };

    struct NoSymbols;

    impl AssignmentMatcher for NoSymbols {
        fn lookup_symbol(&self, _name: &str) -> Option<SymbolId> {
            None
        }
    }

    #[test]
    fn line_patterns() {
        let m = NoSymbols;
        assert_eq!(m.match_set("CONFIG_FOO=y"), Some(("FOO", "y")));
        assert_eq!(m.match_set("CONFIG_CMDLINE=\"a=b\""), Some(("CMDLINE", "\"a=b\"")));
        assert_eq!(m.match_set("CONFIG_=y"), None);
        assert_eq!(m.match_set(" CONFIG_FOO=y"), None);
        assert_eq!(m.match_unset("# CONFIG_FOO is not set"), Some("FOO"));
        assert_eq!(m.match_unset("# CONFIG_FOO is not set, really"), Some("FOO"));
        assert_eq!(m.match_unset("# CONFIG_FOO is set"), None);
        assert_eq!(m.match_unset("#CONFIG_FOO is not set"), None);
    }

    #[test]
    fn comment_blocks() {
        let input = "# Networking\n# (core)\nCONFIG_NET=y\n\n# stray\nCONFIG_INET=y   \n# orphan\nfoo\n# CONFIG_IPV6 is not set\n";
        let records = AssignmentIndex::ingest(input.lines(), &NoSymbols);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "NET");
        assert_eq!(records[0].comment, "# Networking\n# (core)");
        assert_eq!(records[1].line, "CONFIG_INET=y");
        assert_eq!(records[1].comment, "# stray");
        assert_eq!(records[2].name, "IPV6");
        assert_eq!(records[2].line, "# CONFIG_IPV6 is not set");
        assert_eq!(records[2].comment, "");
        assert!(records.iter().all(|r| r.symbol.is_none()));
    }

    #[test]
    fn last_write_wins() {
        let mut index = AssignmentIndex::new();
        index.load(AssignmentIndex::ingest(["CONFIG_FOO=y", "CONFIG_BAR=y"], &NoSymbols));
        index.load(AssignmentIndex::ingest(["CONFIG_FOO=n", "CONFIG_BAZ=m"], &NoSymbols));

        assert_eq!(index.len(), 3);
        assert_eq!(index.records().len(), 4);
        assert_eq!(index.get("FOO").unwrap().line, "CONFIG_FOO=n");
        let id = index.lookup("FOO").unwrap();
        assert_eq!(index.record(id).line, "CONFIG_FOO=n");

        index.reset();
        assert!(index.is_empty());
        assert!(index.records().is_empty());
    }
}
