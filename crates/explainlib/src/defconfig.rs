//! Loading `.config` and defconfig files into the Kconfig tree.

use {
    crate::{
        assignment::AssignmentMatcher,
        eval::parse_int,
        kconfig::CONFIG_PREFIX,
        parser::{unescape_config_string, KConfigError, Tristate, Type},
        Kconfig, SymbolId,
    },
    log::{debug, info},
    std::{
        collections::HashMap,
        fs,
        io::{ErrorKind, Result as IoResult},
        path::{Path, PathBuf},
    },
};

impl Kconfig {
    /// Read a configuration file. Relative paths that cannot be opened are retried under the source tree.
    pub fn read_config_file(&self, path: &Path) -> Result<String, KConfigError> {
        match fs::read_to_string(path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound && path.is_relative() => {
                let in_srctree = self.srctree.join(path);
                debug!("{} not found; trying {}", path.display(), in_srctree.display());
                fs::read_to_string(&in_srctree).map_err(|e| KConfigError::open(&in_srctree, e))
            }
            Err(e) => Err(KConfigError::open(path, e)),
        }
    }

    /// Load symbol values from a configuration file.
    ///
    /// If `replace` is set, all previously loaded values are discarded first; otherwise the file's assignments are
    /// merged over them. Returns a message describing what was done.
    pub fn load_config(&mut self, path: &Path, replace: bool) -> Result<String, KConfigError> {
        let data = self.read_config_file(path)?;
        Ok(self.load_config_str(&data, path, replace))
    }

    /// Load symbol values from configuration file contents, as if read from `filename`.
    pub fn load_config_str(&mut self, data: &str, filename: &Path, replace: bool) -> String {
        if replace {
            self.unset_values();
        }

        // Values assigned by this file, for override and redundancy checks.
        let mut assigned: HashMap<SymbolId, String> = HashMap::new();

        for (index, line) in data.lines().enumerate() {
            let linenr = index + 1;
            let line = line.trim_end();
            let loc = format!("{}:{linenr}", filename.display());

            let (name, value) = if let Some((name, value)) = self.match_set(line) {
                (name, value)
            } else if let Some(name) = self.match_unset(line) {
                (name, "n")
            } else {
                if !line.is_empty() && !line.starts_with('#') {
                    self.warn(format!("{loc}: warning: ignoring malformed line '{line}'"));
                }
                continue;
            };

            let Some(id) = self.lookup_symbol(name) else {
                if self.warning_flags.undef {
                    self.warn(format!(
                        "{loc}: warning: attempt to assign the value '{value}' to the undefined symbol {name}"
                    ));
                }
                continue;
            };

            let ty = self.symbols[id].ty;
            let value = match ty {
                Type::Bool | Type::Tristate => match Tristate::from_config_value(value) {
                    Some(Tristate::Maybe) if ty == Type::Bool => "y".to_string(),
                    Some(tri) => tri.to_string(),
                    None => {
                        self.warn(format!("{loc}: warning: '{value}' is not a valid value for the {ty} symbol {name}"));
                        continue;
                    }
                },
                // `# CONFIG_X is not set` has no meaning for other types.
                _ if !line.starts_with(CONFIG_PREFIX) => continue,
                Type::String => match unescape_config_string(value) {
                    Some(s) => s,
                    None => {
                        self.warn(format!("{loc}: warning: malformed string literal in assignment to {name}"));
                        continue;
                    }
                },
                Type::Int | Type::Hex => match parse_int(value) {
                    Some(_) => value.to_string(),
                    None => {
                        self.warn(format!("{loc}: warning: '{value}' is not a valid value for the {ty} symbol {name}"));
                        continue;
                    }
                },
                Type::Unknown => continue,
            };

            if let Some(old) = assigned.get(&id) {
                if *old == value {
                    if self.warning_flags.redun {
                        self.warn(format!("{loc}: warning: {name} set more than once to the same value '{value}'"));
                    }
                } else if self.warning_flags.override_ {
                    self.warn(format!(
                        "{loc}: warning: {name} set more than once. Old value '{old}', new value '{value}'"
                    ));
                }
            }

            let name = name.to_string();
            if let Some(choice) = self.symbols[id].choice {
                if value == "y" {
                    self.choices[choice].user_selection = Some(id);
                } else if self.choices[choice].user_selection == Some(id) {
                    self.choices[choice].user_selection = None;
                }
            }

            debug!("{loc}: {name} = {value:?}");
            self.symbols[id].user_value = Some(value.clone());
            assigned.insert(id, value);
        }

        self.invalidate();

        let message = format!(
            "{} configuration '{}'",
            if replace {
                "Loaded"
            } else {
                "Merged"
            },
            filename.display()
        );
        info!("{message}");
        message
    }

    /// Discard all user values and choice selections.
    pub fn unset_values(&mut self) {
        for (_, sym) in self.symbols.iter_mut() {
            sym.user_value = None;
        }

        for (_, choice) in self.choices.iter_mut() {
            choice.user_selection = None;
        }

        self.invalidate();
    }

    /// Resolve a configuration file path the way [Kconfig::read_config_file] does.
    pub fn config_path(&self, path: &Path) -> PathBuf {
        if path.is_relative() && !path.exists() {
            self.srctree.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

impl AssignmentMatcher for Kconfig {
    fn lookup_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbol_by_name(name).filter(|&id| !self.symbols[id].nodes.is_empty())
    }

    fn read_config(&self, path: &Path) -> IoResult<String> {
        fs::read_to_string(self.config_path(path))
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{assignment::AssignmentMatcher, BuildEnv, Kconfig, WarningFlags},
        std::{fs, path::Path},
    };

    const KCONFIG: &str = r#"
config FOO
	bool "Foo"

config NAME
	string "Name"
	default "none"

config COUNT
	int "Count"
	default 1

choice
	prompt "Mode"

config MODE_A
	bool "A"

config MODE_B
	bool "B"

endchoice
"#;

    fn kconfig() -> Kconfig {
        let mut kconfig =
            Kconfig::parse_str(KCONFIG, Path::new("Kconfig"), Path::new("."), &BuildEnv::default()).unwrap();
        kconfig.set_warning_flags(WarningFlags {
            enabled: true,
            to_stderr: false,
            undef: true,
            override_: true,
            redun: true,
        });
        kconfig
    }

    fn line(kconfig: &Kconfig, name: &str) -> String {
        kconfig.config_string(kconfig.symbol_by_name(name).unwrap())
    }

    #[test_log::test]
    fn replace_and_merge() {
        let mut kconfig = kconfig();
        let msg = kconfig.load_config_str("CONFIG_FOO=y\nCONFIG_NAME=\"a \\\"b\\\"\"\n", Path::new("one"), true);
        assert_eq!(msg, "Loaded configuration 'one'");
        assert_eq!(line(&kconfig, "FOO"), "CONFIG_FOO=y\n");
        assert_eq!(line(&kconfig, "NAME"), "CONFIG_NAME=\"a \\\"b\\\"\"\n");

        let msg = kconfig.load_config_str("CONFIG_COUNT=7\n", Path::new("two"), false);
        assert_eq!(msg, "Merged configuration 'two'");
        assert_eq!(line(&kconfig, "FOO"), "CONFIG_FOO=y\n");
        assert_eq!(line(&kconfig, "COUNT"), "CONFIG_COUNT=7\n");

        kconfig.load_config_str("# CONFIG_FOO is not set\n", Path::new("three"), true);
        assert_eq!(line(&kconfig, "FOO"), "# CONFIG_FOO is not set\n");
        assert_eq!(line(&kconfig, "COUNT"), "CONFIG_COUNT=1\n");
        assert_eq!(line(&kconfig, "NAME"), "CONFIG_NAME=\"none\"\n");
    }

    #[test_log::test]
    fn choice_selection() {
        let mut kconfig = kconfig();
        assert_eq!(line(&kconfig, "MODE_A"), "CONFIG_MODE_A=y\n");

        kconfig.load_config_str("CONFIG_MODE_B=y\n", Path::new("defconfig"), true);
        assert_eq!(line(&kconfig, "MODE_A"), "# CONFIG_MODE_A is not set\n");
        assert_eq!(line(&kconfig, "MODE_B"), "CONFIG_MODE_B=y\n");

        kconfig.unset_values();
        assert_eq!(line(&kconfig, "MODE_B"), "# CONFIG_MODE_B is not set\n");
    }

    #[test_log::test]
    fn warnings() {
        let mut kconfig = kconfig();
        kconfig.load_config_str(
            "CONFIG_NOPE=y\nCONFIG_FOO=y\nCONFIG_FOO=y\nCONFIG_FOO=n\nCONFIG_FOO=x\nCONFIG_NAME=bare\ngarbage\n",
            Path::new("defconfig"),
            true,
        );

        let warnings = kconfig.warnings();
        assert_eq!(warnings.len(), 6);
        assert_eq!(
            warnings[0],
            "defconfig:1: warning: attempt to assign the value 'y' to the undefined symbol NOPE"
        );
        assert!(warnings[1].starts_with("defconfig:3: warning: FOO set more than once to the same value"));
        assert!(warnings[2].starts_with("defconfig:4: warning: FOO set more than once. Old value 'y'"));
        assert!(warnings[3].starts_with("defconfig:5: "));
        assert!(warnings[4].contains("malformed string literal"));
        assert!(warnings[5].contains("malformed line 'garbage'"));
    }

    #[test_log::test]
    fn warnings_disabled() {
        let mut kconfig = kconfig();
        kconfig.set_warning_flags(WarningFlags {
            enabled: false,
            ..kconfig.warning_flags()
        });
        kconfig.load_config_str("CONFIG_NOPE=y\n", Path::new("defconfig"), true);
        assert!(kconfig.warnings().is_empty());
    }

    #[test_log::test]
    fn srctree_fallback() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Kconfig"), KCONFIG).unwrap();
        fs::create_dir(dir.path().join("configs")).unwrap();
        fs::write(dir.path().join("configs/test_defconfig"), "CONFIG_FOO=y\n").unwrap();

        let mut kconfig = Kconfig::parse(&dir.path().join("Kconfig"), dir.path(), &BuildEnv::default()).unwrap();
        kconfig.load_config(Path::new("configs/test_defconfig"), true).unwrap();
        assert_eq!(line(&kconfig, "FOO"), "CONFIG_FOO=y\n");
        assert!(kconfig.read_config(Path::new("configs/test_defconfig")).is_ok());
        assert!(kconfig.load_config(Path::new("configs/missing_defconfig"), true).is_err());
        assert!(kconfig.lookup_symbol("FOO").is_some());
        assert!(kconfig.lookup_symbol("NOPE").is_none());
    }
}
