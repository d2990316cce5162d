//! Putting it together: load a Kconfig tree and defconfig files, then write the explained defconfig.

use {
    crate::{
        AssignmentIndex, BuildEnv, ExplainError, Kconfig, OptionInput, OptionRegistry, PrintFormat, Renderer,
        ShadowTree,
    },
    log::{debug, info},
    std::{io::Write, path::Path},
};

/// Explains defconfig files against a Kconfig tree.
#[derive(Debug)]
pub struct DefconfigExplainer {
    kconfig: Kconfig,
    options: OptionRegistry,
    index: AssignmentIndex,
    tree: ShadowTree,
    format: PrintFormat,
}

impl DefconfigExplainer {
    /// Create an explainer for a parsed Kconfig tree, overriding the default options with `options`.
    pub fn new<K, V>(kconfig: Kconfig, options: impl IntoIterator<Item = (K, V)>) -> Result<Self, ExplainError>
    where
        K: AsRef<str>,
        V: Into<OptionInput>,
    {
        let mut registry = OptionRegistry::defaults();
        registry.set_many(options)?;

        let index = AssignmentIndex::new();
        let tree = ShadowTree::build(&kconfig, &index);
        let format = PrintFormat::generate(&registry, tree.level_size())?;

        let mut explainer = Self {
            kconfig,
            options: registry,
            index,
            tree,
            format,
        };
        explainer.apply_warning_flags();
        Ok(explainer)
    }

    /// Parse the Kconfig tree rooted at `kconfig_file` in the given build environment and create an explainer
    /// for it.
    pub fn from_kconfig_file<K, V>(
        kconfig_file: &Path,
        env: &BuildEnv,
        options: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ExplainError>
    where
        K: AsRef<str>,
        V: Into<OptionInput>,
    {
        let kconfig = Kconfig::parse(kconfig_file, &env.srctree, env)?;
        Self::new(kconfig, options)
    }

    /// The Kconfig tree with the currently loaded values.
    pub fn kconfig(&self) -> &Kconfig {
        &self.kconfig
    }

    /// The current options.
    pub fn options(&self) -> &OptionRegistry {
        &self.options
    }

    /// The assignments loaded so far.
    pub fn index(&self) -> &AssignmentIndex {
        &self.index
    }

    /// The shadow tree built by the last load.
    pub fn tree(&self) -> &ShadowTree {
        &self.tree
    }

    /// The templates generated by the last load or [generate_print_format][Self::generate_print_format] call.
    pub fn format(&self) -> &PrintFormat {
        &self.format
    }

    /// Change options. Stops at the first failure; earlier entries stay applied.
    ///
    /// The warning options take effect at the next load; the rendering options at the next
    /// [generate_print_format][Self::generate_print_format] call or load.
    pub fn update_options<K, V>(&mut self, options: impl IntoIterator<Item = (K, V)>) -> Result<(), ExplainError>
    where
        K: AsRef<str>,
        V: Into<OptionInput>,
    {
        let result = self.options.set_many(options);
        self.apply_warning_flags();
        result
    }

    fn apply_warning_flags(&mut self) {
        self.kconfig.set_warning_flags(self.options.warning_flags());
    }

    /// Load configuration files into the Kconfig tree only, to supply values for symbols the explained files
    /// do not assign. The first file replaces all values; the others are merged over it. A later load with
    /// `replace` discards these values.
    pub fn preload_config_files<P: AsRef<Path>>(&mut self, files: &[P]) -> Result<(), ExplainError> {
        for (i, file) in files.iter().enumerate() {
            self.kconfig.load_config(file.as_ref(), i == 0)?;
        }

        Ok(())
    }

    /// Load defconfig files to be explained, then rebuild the shadow tree and the formats.
    ///
    /// With `replace`, previously loaded values and assignments are discarded first. Within the batch, later
    /// files override earlier ones.
    pub fn load_config_files<P: AsRef<Path>>(&mut self, files: &[P], replace: bool) -> Result<(), ExplainError> {
        for (i, file) in files.iter().enumerate() {
            self.kconfig.load_config(file.as_ref(), replace && i == 0)?;
        }

        if replace {
            self.index.reset();
        }

        for file in files {
            let path = file.as_ref();
            let records = AssignmentIndex::read_file(path, &self.kconfig).map_err(|e| ExplainError::file(path, e))?;
            info!("{}: {} assignments", path.display(), records.len());
            self.index.load(records);
        }

        self.tree = ShadowTree::build(&self.kconfig, &self.index);
        debug!("{} assigned symbols; {} levels", self.index.len(), self.tree.level_size());
        self.regenerate_format()
    }

    /// Apply option overrides and regenerate the templates for the current tree.
    pub fn generate_print_format<K, V>(&mut self, options: impl IntoIterator<Item = (K, V)>) -> Result<(), ExplainError>
    where
        K: AsRef<str>,
        V: Into<OptionInput>,
    {
        self.update_options(options)?;
        self.regenerate_format()
    }

    fn regenerate_format(&mut self) -> Result<(), ExplainError> {
        self.format = PrintFormat::generate(&self.options, self.tree.level_size())?;
        Ok(())
    }

    /// Write the explained defconfig.
    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), ExplainError> {
        Renderer::new(&self.kconfig, &self.index, &self.tree, &self.format).render(out)?;
        Ok(())
    }
}
