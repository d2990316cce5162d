//! The Kconfig menu tree and its symbols.

use {
    crate::{
        parser::{Expr, KConfigError, Location, MenuParser, Scope, Tristate, Type},
        Context,
    },
    log::{debug, warn},
    slotmap::{new_key_type, SlotMap},
    std::{
        cell::RefCell,
        collections::HashMap,
        ops::Index,
        path::{Path, PathBuf},
    },
};

new_key_type! {
    /// Identifies a node in the menu tree.
    pub struct MenuId;

    /// Identifies a symbol.
    pub struct SymbolId;

    /// Identifies a choice.
    pub struct ChoiceId;
}

/// Prefix of symbol names in `.config` files.
pub const CONFIG_PREFIX: &str = "CONFIG_";

/// What a menu node represents.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Item {
    /// A `config` or `menuconfig` definition.
    Symbol(SymbolId),

    /// A `choice` block.
    Choice(ChoiceId),

    /// A `menu` block, or the top node.
    Menu,

    /// A `comment` statement.
    Comment,
}

/// A prompt and the condition under which it is shown.
///
/// The condition includes the node's dependencies and any enclosing `visible if` conditions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Prompt {
    /// The prompt text.
    pub text: String,

    /// The visibility condition.
    pub cond: Expr,
}

/// A node in the menu tree.
///
/// A symbol or choice defined in several places has one node per definition.
#[derive(Clone, Debug)]
pub struct MenuNode {
    /// What this node represents.
    pub item: Item,

    /// The prompt, if any.
    pub prompt: Option<Prompt>,

    /// The help text, if any.
    pub help: Option<String>,

    /// Dependencies of the node, including those inherited from enclosing blocks.
    pub dep: Expr,

    /// The `visible if` condition of a menu; `y` for other nodes.
    pub visibility: Expr,

    /// The choice this node is nested in.
    pub choice: Option<ChoiceId>,

    /// Where the node was defined.
    pub location: Location,

    /// Indicates whether the node was defined with `menuconfig`.
    pub is_menuconfig: bool,

    /// The enclosing node; `None` only for the top node.
    pub parent: Option<MenuId>,

    /// The first child.
    pub list: Option<MenuId>,

    /// The next sibling.
    pub next: Option<MenuId>,
}

impl MenuNode {
    /// The file the node was defined in.
    #[inline(always)]
    pub fn filename(&self) -> &Path {
        self.location.filename
    }

    /// The line the node was defined on.
    #[inline(always)]
    pub fn linenr(&self) -> u32 {
        self.location.line
    }
}

/// A `default` property.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DefaultValue {
    /// The default value.
    pub value: Expr,

    /// The condition, including the dependencies of the defining node.
    pub cond: Expr,
}

/// A `range` property.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Range {
    /// The lower bound.
    pub low: Expr,

    /// The upper bound.
    pub high: Expr,

    /// The condition, including the dependencies of the defining node.
    pub cond: Expr,
}

/// A reverse dependency: a `select` or `imply` property of another symbol.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReverseDep {
    /// The symbol being selected or implied.
    pub target: String,

    /// The condition, including the dependencies of the defining node.
    pub cond: Expr,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct SymValue {
    pub(crate) tri: Tristate,
    pub(crate) string: String,
    pub(crate) write: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) enum Cached {
    #[default]
    Empty,
    InProgress,
    Done(SymValue),
}

/// A configuration symbol.
#[derive(Debug)]
pub struct Symbol {
    /// The symbol name, without the `CONFIG_` prefix.
    pub name: String,

    /// The symbol type.
    pub ty: Type,

    /// The nodes defining the symbol.
    pub nodes: Vec<MenuId>,

    /// `default` properties, in definition order.
    pub defaults: Vec<DefaultValue>,

    /// `range` properties, in definition order.
    pub ranges: Vec<Range>,

    /// `select` properties of this symbol.
    pub selects: Vec<ReverseDep>,

    /// `imply` properties of this symbol.
    pub implies: Vec<ReverseDep>,

    /// OR of the dependencies of all defining nodes.
    pub direct_dep: Expr,

    /// OR of the conditions of all symbols selecting this one.
    pub rev_dep: Expr,

    /// OR of the conditions of all symbols implying this one.
    pub weak_rev_dep: Expr,

    /// The choice the symbol belongs to.
    pub choice: Option<ChoiceId>,

    /// The value assigned by a configuration file.
    pub user_value: Option<String>,

    pub(crate) cache: RefCell<Cached>,
}

impl Symbol {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: Type::Unknown,
            nodes: Vec::new(),
            defaults: Vec::new(),
            ranges: Vec::new(),
            selects: Vec::new(),
            implies: Vec::new(),
            direct_dep: Expr::no(),
            rev_dep: Expr::no(),
            weak_rev_dep: Expr::no(),
            choice: None,
            user_value: None,
            cache: RefCell::default(),
        }
    }
}

/// A `choice` block.
#[derive(Clone, Debug)]
pub struct Choice {
    /// The optional choice name.
    pub name: Option<String>,

    /// The choice type.
    pub ty: Type,

    /// The nodes defining the choice.
    pub nodes: Vec<MenuId>,

    /// The member symbols, in definition order.
    pub syms: Vec<SymbolId>,

    /// `default` properties; values name member symbols.
    pub defaults: Vec<DefaultValue>,

    /// OR of the dependencies of all defining nodes.
    pub direct_dep: Expr,

    /// Indicates whether the choice was declared `optional`.
    pub optional: bool,

    /// The member selected by a configuration file.
    pub user_selection: Option<SymbolId>,
}

/// Which warnings are generated while loading configuration files.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WarningFlags {
    /// Master switch; no warnings are generated unless set.
    pub enabled: bool,

    /// Also log warnings as they are generated.
    pub to_stderr: bool,

    /// Warn about assignments to undefined symbols.
    pub undef: bool,

    /// Warn about symbols assigned different values more than once.
    pub override_: bool,

    /// Warn about symbols assigned the same value more than once.
    pub redun: bool,
}

/// A parsed Kconfig tree with the currently loaded configuration values.
#[derive(Debug)]
pub struct Kconfig {
    pub(crate) nodes: SlotMap<MenuId, MenuNode>,
    pub(crate) symbols: SlotMap<SymbolId, Symbol>,
    pub(crate) choices: SlotMap<ChoiceId, Choice>,
    pub(crate) symbol_names: HashMap<String, SymbolId>,
    pub(crate) top_node: MenuId,
    pub(crate) modules: Option<SymbolId>,
    pub(crate) srctree: PathBuf,
    pub(crate) warning_flags: WarningFlags,
    pub(crate) warnings: Vec<String>,
}

impl Kconfig {
    fn empty(filename: &Path, srctree: &Path) -> Self {
        let mut nodes = SlotMap::with_key();
        let top_node = nodes.insert(MenuNode {
            item: Item::Menu,
            prompt: Some(Prompt {
                text: "Main menu".to_string(),
                cond: Expr::yes(),
            }),
            help: None,
            dep: Expr::yes(),
            visibility: Expr::yes(),
            choice: None,
            location: Location::start_of(filename),
            is_menuconfig: false,
            parent: None,
            list: None,
            next: None,
        });

        Self {
            nodes,
            symbols: SlotMap::with_key(),
            choices: SlotMap::with_key(),
            symbol_names: HashMap::new(),
            top_node,
            modules: None,
            srctree: srctree.to_path_buf(),
            warning_flags: WarningFlags::default(),
            warnings: Vec::new(),
        }
    }

    /// Read a full Kconfig tree starting with the given Kconfig file.
    ///
    /// `source` statements are resolved relative to `srctree` (or to the sourcing file for `rsource` and
    /// `orsource`). Variables not defined by the Kconfig files are looked up in `context`.
    pub fn parse(filename: &Path, srctree: &Path, context: &dyn Context) -> Result<Self, KConfigError> {
        let input = std::fs::read_to_string(filename).map_err(|e| KConfigError::open(filename, e))?;
        Self::parse_str(&input, filename, srctree, context)
    }

    /// Parse a Kconfig tree from the given string input, as if read from `filename`.
    pub fn parse_str(input: &str, filename: &Path, srctree: &Path, context: &dyn Context) -> Result<Self, KConfigError> {
        let mut kconfig = Self::empty(filename, srctree);
        let top_node = kconfig.top_node;
        let scope = Scope::top(top_node);

        let mut parser = MenuParser::new(&mut kconfig, context, srctree);
        parser.parse_data(input, filename, &scope, top_node)?;
        parser.finalize();

        debug!(
            "{}: {} menu nodes, {} symbols, {} choices",
            filename.display(),
            kconfig.nodes.len(),
            kconfig.symbols.len(),
            kconfig.choices.len()
        );
        Ok(kconfig)
    }

    /// The top node. Its prompt is the `mainmenu` text.
    #[inline(always)]
    pub fn top_node(&self) -> MenuId {
        self.top_node
    }

    /// Returns the menu node with the given id.
    #[inline(always)]
    pub fn node(&self, id: MenuId) -> &MenuNode {
        &self.nodes[id]
    }

    /// Returns the symbol with the given id.
    #[inline(always)]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    /// Returns the choice with the given id.
    #[inline(always)]
    pub fn choice(&self, id: ChoiceId) -> &Choice {
        &self.choices[id]
    }

    /// Look up a symbol by name (without the `CONFIG_` prefix).
    pub fn symbol_by_name(&self, name: &str) -> Option<SymbolId> {
        self.symbol_names.get(name).copied()
    }

    /// Iterate over all symbols in definition order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter()
    }

    /// Returns the name of the symbol or choice a node defines.
    pub fn item_name(&self, item: Item) -> Option<&str> {
        match item {
            Item::Symbol(id) => Some(self.symbols[id].name.as_str()),
            Item::Choice(id) => self.choices[id].name.as_deref(),
            Item::Menu | Item::Comment => None,
        }
    }

    /// Returns the children of a node, in order.
    pub fn children(&self, id: MenuId) -> Siblings<'_> {
        Siblings {
            kconfig: self,
            next: self.nodes[id].list,
        }
    }

    /// The directory `source` statements and configuration files are resolved against.
    #[inline(always)]
    pub fn srctree(&self) -> &Path {
        &self.srctree
    }

    /// Returns the current warning settings.
    #[inline(always)]
    pub fn warning_flags(&self) -> WarningFlags {
        self.warning_flags
    }

    /// Change which warnings are generated.
    pub fn set_warning_flags(&mut self, flags: WarningFlags) {
        self.warning_flags = flags;
    }

    /// Returns the warnings generated so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub(crate) fn warn(&mut self, message: String) {
        if !self.warning_flags.enabled {
            return;
        }

        if self.warning_flags.to_stderr {
            warn!("{message}");
        }

        self.warnings.push(message);
    }
}

impl Index<MenuId> for Kconfig {
    type Output = MenuNode;

    fn index(&self, id: MenuId) -> &MenuNode {
        &self.nodes[id]
    }
}

/// An iterator over a run of sibling menu nodes.
pub struct Siblings<'a> {
    kconfig: &'a Kconfig,
    next: Option<MenuId>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = MenuId;

    fn next(&mut self) -> Option<MenuId> {
        let id = self.next?;
        self.next = self.kconfig.nodes[id].next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{Item, Kconfig},
        crate::{parser::Type, BuildEnv},
        std::path::Path,
    };

    const KCONFIG: &str = r#"
mainmenu "Test Kernel Configuration"

config MODULES
	bool "Enable loadable module support"
	modules

menu "Main"

config FOO
	bool "Enable Foo"
	help
	  Foo does foo things.

	  Really.

config FOO_LEVEL
	int "Foo level"
	depends on FOO
	default 3

config BAR
	tristate "Enable Bar"

endmenu

choice
	prompt "Pick one"
	default PICK_B

config PICK_A
	bool "A"

config PICK_B
	bool "B"

endchoice

if BAR
comment "Bar is enabled"
endif
"#;

    fn parse() -> Kconfig {
        Kconfig::parse_str(KCONFIG, Path::new("Kconfig"), Path::new("."), &BuildEnv::default()).unwrap()
    }

    #[test_log::test]
    fn menu_structure() {
        let kconfig = parse();
        let top = kconfig.top_node();
        assert_eq!(kconfig[top].prompt.as_ref().unwrap().text, "Test Kernel Configuration");

        let children: Vec<_> = kconfig.children(top).map(|id| kconfig[id].item).collect();
        assert_eq!(children.len(), 4);
        assert!(matches!(children[0], Item::Symbol(_)));
        assert_eq!(children[1], Item::Menu);
        assert!(matches!(children[2], Item::Choice(_)));
        assert_eq!(children[3], Item::Comment);

        let main = kconfig.children(top).nth(1).unwrap();
        let names: Vec<_> = kconfig.children(main).map(|id| kconfig.item_name(kconfig[id].item).unwrap()).collect();
        assert_eq!(names, vec!["FOO", "BAR"]);

        // FOO_LEVEL depends on FOO and follows it, so it is nested under FOO.
        let foo = kconfig.children(main).next().unwrap();
        let nested: Vec<_> = kconfig.children(foo).map(|id| kconfig.item_name(kconfig[id].item).unwrap()).collect();
        assert_eq!(nested, vec!["FOO_LEVEL"]);
        assert_eq!(kconfig[foo].help.as_deref(), Some("Foo does foo things.\n\nReally."));
        assert_eq!(kconfig[foo].linenr(), 10);
        assert_eq!(kconfig[kconfig.children(foo).next().unwrap()].parent, Some(foo));
    }

    #[test_log::test]
    fn symbol_types() {
        let kconfig = parse();
        let level = kconfig.symbol_by_name("FOO_LEVEL").unwrap();
        assert_eq!(kconfig.symbol(level).ty, Type::Int);
        let pick_a = kconfig.symbol_by_name("PICK_A").unwrap();
        assert!(kconfig.symbol(pick_a).choice.is_some());
        assert!(kconfig.symbol_by_name("UNDEFINED").is_none());
    }
}
