//! Writing the shadow tree out as an explained defconfig.

use {
    crate::{
        format::{fill, PrintFormat},
        AssignmentIndex, Item, Kconfig, ShadowId, ShadowNode, ShadowTree,
    },
    std::io::{Result as IoResult, Write},
};

/// Renders a [ShadowTree] with the templates of a [PrintFormat].
pub struct Renderer<'a> {
    kconfig: &'a Kconfig,
    index: &'a AssignmentIndex,
    tree: &'a ShadowTree,
    format: &'a PrintFormat,
}

impl<'a> Renderer<'a> {
    /// Create a renderer. `tree` must have been built from `kconfig` and `index`.
    pub fn new(kconfig: &'a Kconfig, index: &'a AssignmentIndex, tree: &'a ShadowTree, format: &'a PrintFormat) -> Self {
        Self {
            kconfig,
            index,
            tree,
            format,
        }
    }

    /// Write the defined parts of the tree to `out`.
    ///
    /// Output starts with the children of the top node when `print_first_level` is 1 and with the top node itself
    /// otherwise.
    pub fn render<W: Write + ?Sized>(&self, out: &mut W) -> IoResult<()> {
        let root = self.tree.root();
        if self.format.flags.print_first_level == 1 {
            self.render_run(self.tree[root].list, false, out)
        } else {
            self.render_run(Some(root), false, out)
        }
    }

    fn render_run<W: Write + ?Sized>(&self, first: Option<ShadowId>, mut force: bool, out: &mut W) -> IoResult<()> {
        if self.format.flags.print_same_level_item {
            let mut run = self.tree.siblings(first).map(|id| &self.tree[id]).peekable();
            if run.peek().is_some() {
                let mut any_defined = false;
                let mut all_symbols = true;
                for node in run {
                    any_defined |= node.defined;
                    all_symbols &= node.kind.is_symbol();
                }

                if any_defined && all_symbols {
                    force = true;
                }
            }
        }

        for id in self.tree.siblings(first) {
            if self.tree[id].defined || force {
                self.render_node(id, force, out)?;
            }
        }

        Ok(())
    }

    fn render_node<W: Write + ?Sized>(&self, id: ShadowId, force: bool, out: &mut W) -> IoResult<()> {
        let node = &self.tree[id];
        let flags = &self.format.flags;
        let mut need_new_line = false;

        if let Some(prompt) = &node.prompt {
            writeln!(out, "{}", fill(self.format.prompt(node.level), &[("prompt", prompt)]))?;
            need_new_line = true;

            if flags.print_help {
                if let Some(help) = &node.help {
                    self.write_help(node, help, out)?;
                }
            }

            if flags.print_location {
                self.write_location(node, out)?;
            }
        }

        if flags.print_comment {
            if let Some(record) = node.config.map(|r| self.index.record(r)) {
                if !record.comment.is_empty() {
                    writeln!(out, "{}", record.comment)?;
                }
            }
        }

        if node.config.is_some() || flags.print_orig_config || force {
            self.write_config(node, out)?;
            need_new_line = true;
        }

        if need_new_line {
            writeln!(out)?;
        }

        let is_menu = node.kind.is_menu();
        if node.list.is_some() {
            let force_children = is_menu && flags.print_choice_item && node.kind.is_choice();
            self.render_run(node.list, force_children, out)?;
        }

        if is_menu {
            if let Some(prompt) = &node.prompt {
                writeln!(out, "{}", fill(self.format.menu_end(node.level), &[("prompt", prompt)]))?;
            }
        }

        Ok(())
    }

    fn write_help<W: Write + ?Sized>(&self, node: &ShadowNode, help: &str, out: &mut W) -> IoResult<()> {
        let line_format = self.format.help_line(node.level);
        let lines: Vec<String> = help.lines().map(|line| fill(line_format, &[("help_line", line)])).collect();
        writeln!(out, "{}", fill(self.format.help(node.level), &[("help", &lines.join("\n"))]))
    }

    fn write_location<W: Write + ?Sized>(&self, node: &ShadowNode, out: &mut W) -> IoResult<()> {
        let menu_node = &self.kconfig[node.menu_node];
        let path = menu_node.filename();
        let filename = path.strip_prefix(self.kconfig.srctree()).unwrap_or(path).display().to_string();
        let linenr = menu_node.linenr().to_string();
        writeln!(out, "{}", fill(self.format.location(node.level), &[("filename", &filename), ("linenr", &linenr)]))
    }

    /// The assignment line as loaded if there is one; otherwise the line the current configuration would produce.
    fn write_config<W: Write + ?Sized>(&self, node: &ShadowNode, out: &mut W) -> IoResult<()> {
        if let Some(record) = node.config {
            return writeln!(out, "{}", self.index.record(record).line);
        }

        if let Item::Symbol(sym) = self.kconfig[node.menu_node].item {
            let config_string = self.kconfig.config_string(sym);
            let config = config_string.trim_end().trim_start_matches(['#', ' ']);
            writeln!(out, "{}", fill(self.format.orig_config(node.level), &[("config", config)]))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::Renderer,
        crate::{AssignmentIndex, BuildEnv, Kconfig, OptionRegistry, PrintFormat, ShadowTree},
        std::path::Path,
    };

    const KCONFIG: &str = r#"
menu "Main"

config FOO
	bool "Enable Foo"
	help
	  Foo help.
	  Second line.

config BAR
	bool "Enable Bar"

endmenu

choice
	prompt "Mode"

config MODE_A
	bool "Mode A"

config MODE_B
	bool "Mode B"

endchoice

menu "Other"

config BAZ
	bool "Baz"

endmenu
"#;

    fn render(defconfig: &str, options: &[(&str, &str)]) -> String {
        render_tree(KCONFIG, defconfig, options)
    }

    fn render_tree(source: &str, defconfig: &str, options: &[(&str, &str)]) -> String {
        let mut kconfig =
            Kconfig::parse_str(source, Path::new("Kconfig"), Path::new("."), &BuildEnv::default()).unwrap();
        kconfig.load_config_str(defconfig, Path::new("defconfig"), true);

        let mut index = AssignmentIndex::new();
        index.load(AssignmentIndex::ingest(defconfig.lines(), &kconfig));
        let tree = ShadowTree::build(&kconfig, &index);

        let mut registry = OptionRegistry::defaults();
        registry.set_many(options.iter().copied()).unwrap();
        let format = PrintFormat::generate(&registry, tree.level_size()).unwrap();

        let mut out = Vec::new();
        Renderer::new(&kconfig, &index, &tree, &format).render(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test_log::test]
    fn defined_only() {
        let out = render("CONFIG_FOO=y\n", &[]);
        assert_eq!(out, "## \n## Main\n## \n\n### \n### Enable Foo\n### \nCONFIG_FOO=y\n\n## end of Main\n\n");
    }

    #[test_log::test]
    fn nothing_defined() {
        assert_eq!(render("", &[]), "");
        assert_eq!(render("CONFIG_UNKNOWN=y\n", &[]), "");
    }

    #[test_log::test]
    fn same_level_items() {
        let out = render("CONFIG_FOO=y\n", &[("print_same_level_item", "y")]);
        assert_eq!(
            out,
            "## \n## Main\n## \n\n### \n### Enable Foo\n### \nCONFIG_FOO=y\n\n### \n### Enable Bar\n### \n\
             ### CONFIG_BAR is not set\n\n## end of Main\n\n"
        );
    }

    #[test_log::test]
    fn same_level_requires_all_symbols() {
        // The top-level run mixes menus and a choice, so "Other" is not forced.
        let out = render("CONFIG_FOO=y\n", &[("print_same_level_item", "y"), ("print_orig_config", "y")]);
        assert!(!out.contains("Other"));
        assert!(!out.contains("Mode"));
    }

    #[test_log::test]
    fn choice_items() {
        let out = render("CONFIG_MODE_B=y\n", &[]);
        assert_eq!(out, "## \n## Mode\n## \n\n### \n### Mode B\n### \nCONFIG_MODE_B=y\n\n## end of Mode\n\n");

        let out = render("CONFIG_MODE_B=y\n", &[("print_choice_item", "y")]);
        assert_eq!(
            out,
            "## \n## Mode\n## \n\n### \n### Mode A\n### \n### CONFIG_MODE_A is not set\n\n\
             ### \n### Mode B\n### \nCONFIG_MODE_B=y\n\n## end of Mode\n\n"
        );
    }

    #[test_log::test]
    fn optional_choice_without_selection() {
        const OPTIONAL: &str = "choice\n\tprompt \"Opt\"\n\toptional\n\nconfig OA\n\tbool \"OA\"\n\n\
                                config OB\n\tbool \"OB\"\n\nendchoice\n";
        assert_eq!(render_tree(OPTIONAL, "# CONFIG_OA is not set\n", &[]), "");
        assert_eq!(
            render_tree(OPTIONAL, "CONFIG_OB=y\n", &[]),
            "## \n## Opt\n## \n\n### \n### OB\n### \nCONFIG_OB=y\n\n## end of Opt\n\n"
        );
    }

    #[test_log::test]
    fn help_location_and_comments() {
        let out = render(
            "# Foo is needed\nCONFIG_FOO=y\n",
            &[("print_help", "y"), ("print_location", "y"), ("print_comment", "y")],
        );
        assert_eq!(
            out,
            "## \n## Main\n## \n## Kconfig : 2\n##\n\n\
             ### \n### Enable Foo\n### \n### help\n###     Foo help.\n###     Second line.\n###\n\
             ### Kconfig : 4\n###\n# Foo is needed\nCONFIG_FOO=y\n\n## end of Main\n\n"
        );
    }

    #[test_log::test]
    fn orig_config_and_first_level() {
        let out = render("CONFIG_FOO=y\n", &[("print_orig_config", "y"), ("print_first_level", "0")]);
        assert_eq!(
            out,
            "# \n# Main menu\n# \n\n## \n## Main\n## \n\n### \n### Enable Foo\n### \nCONFIG_FOO=y\n\n\
             ## end of Main\n\n# end of Main menu\n\n"
        );
    }
}
