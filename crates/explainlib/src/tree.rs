//! The shadow tree: a copy of the Kconfig menu structure annotated with the loaded assignments.

use {
    crate::{AssignmentIndex, Item, Kconfig, MenuId, MenuNode, RecordId},
    log::debug,
    slotmap::{new_key_type, SlotMap},
    std::ops::Index,
};

new_key_type! {
    /// Identifies a node in a [ShadowTree].
    pub struct ShadowId;
}

/// How a shadow node is rendered, fixed when the tree is built.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    /// A `config` symbol.
    Symbol,

    /// A `choice` block.
    Choice,

    /// A `menu` block or the top node.
    MenuOnly,

    /// A `menuconfig` symbol.
    MenuConfig,

    /// A `comment` statement.
    Comment,
}

impl NodeKind {
    /// Classify a menu node.
    pub fn of(node: &MenuNode) -> Self {
        match node.item {
            Item::Symbol(_) if node.is_menuconfig => Self::MenuConfig,
            Item::Symbol(_) => Self::Symbol,
            Item::Choice(_) => Self::Choice,
            Item::Menu => Self::MenuOnly,
            Item::Comment => Self::Comment,
        }
    }

    /// Indicates whether the node defines a symbol.
    #[inline(always)]
    pub fn is_symbol(self) -> bool {
        matches!(self, Self::Symbol | Self::MenuConfig)
    }

    /// Indicates whether the node is a choice.
    #[inline(always)]
    pub fn is_choice(self) -> bool {
        self == Self::Choice
    }

    /// Indicates whether the node's children form a menu of their own.
    #[inline(always)]
    pub fn is_menu(self) -> bool {
        matches!(self, Self::MenuOnly | Self::MenuConfig | Self::Choice)
    }
}

/// A node in the shadow tree.
#[derive(Clone, Debug)]
pub struct ShadowNode {
    /// The Kconfig menu node this shadows.
    pub menu_node: MenuId,

    /// The enclosing node; `None` for the root.
    pub parent: Option<ShadowId>,

    /// Depth in the tree; the root is at level 0.
    pub level: usize,

    /// The next sibling.
    pub next: Option<ShadowId>,

    /// The first child.
    pub list: Option<ShadowId>,

    /// Set if this node or a descendant has an active assignment.
    pub defined: bool,

    /// The assignment attached to this node.
    pub config: Option<RecordId>,

    /// Node classification.
    pub kind: NodeKind,

    /// The prompt text, if any.
    pub prompt: Option<String>,

    /// The help text, if any.
    pub help: Option<String>,
}

/// The menu tree of a [Kconfig], annotated with the assignments of an [AssignmentIndex].
#[derive(Clone, Debug)]
pub struct ShadowTree {
    nodes: SlotMap<ShadowId, ShadowNode>,
    root: ShadowId,
    max_level: usize,
}

impl ShadowTree {
    /// Build the tree over the whole Kconfig menu tree.
    ///
    /// A symbol or choice node whose dependencies are met and whose name has an assignment is marked defined and
    /// gets the assignment attached; all of its ancestors are marked defined as well.
    pub fn build(kconfig: &Kconfig, index: &AssignmentIndex) -> Self {
        let mut builder = Builder {
            kconfig,
            index,
            nodes: SlotMap::with_key(),
            max_level: 0,
        };

        let root = builder.build_run(kconfig.top_node(), None, 0);
        let tree = Self {
            nodes: builder.nodes,
            root,
            max_level: builder.max_level,
        };

        debug!(
            "Shadow tree: {} nodes, {} defined, max level {}",
            tree.nodes.len(),
            tree.nodes.values().filter(|n| n.defined).count(),
            tree.max_level
        );
        tree
    }

    /// The node shadowing the Kconfig top node.
    #[inline(always)]
    pub fn root(&self) -> ShadowId {
        self.root
    }

    /// Returns the node with the given id.
    #[inline(always)]
    pub fn node(&self, id: ShadowId) -> &ShadowNode {
        &self.nodes[id]
    }

    /// The deepest level holding a node.
    #[inline(always)]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// The number of levels, which is the size of the per-level format tables.
    #[inline(always)]
    pub fn level_size(&self) -> usize {
        self.max_level + 1
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Indicates whether the tree has no nodes. A built tree always holds at least the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every node, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ShadowId, &ShadowNode)> {
        self.nodes.iter()
    }

    /// Iterate over a run of siblings starting at `first`.
    pub fn siblings(&self, first: Option<ShadowId>) -> ShadowSiblings<'_> {
        ShadowSiblings {
            tree: self,
            next: first,
        }
    }

    /// Iterate over the children of a node.
    pub fn children(&self, id: ShadowId) -> ShadowSiblings<'_> {
        self.siblings(self.nodes[id].list)
    }
}

impl Index<ShadowId> for ShadowTree {
    type Output = ShadowNode;

    fn index(&self, id: ShadowId) -> &ShadowNode {
        &self.nodes[id]
    }
}

/// An iterator over a run of sibling shadow nodes.
pub struct ShadowSiblings<'a> {
    tree: &'a ShadowTree,
    next: Option<ShadowId>,
}

impl<'a> Iterator for ShadowSiblings<'a> {
    type Item = ShadowId;

    fn next(&mut self) -> Option<ShadowId> {
        let id = self.next?;
        self.next = self.tree.nodes[id].next;
        Some(id)
    }
}

struct Builder<'a> {
    kconfig: &'a Kconfig,
    index: &'a AssignmentIndex,
    nodes: SlotMap<ShadowId, ShadowNode>,
    max_level: usize,
}

impl<'a> Builder<'a> {
    /// Shadow `first` and its following siblings, returning the shadow of `first`.
    fn build_run(&mut self, first: MenuId, parent: Option<ShadowId>, level: usize) -> ShadowId {
        let first_shadow = self.build_node(first, parent, level);
        let mut prev = first_shadow;
        let mut next = self.kconfig[first].next;

        while let Some(menu_id) = next {
            let id = self.build_node(menu_id, parent, level);
            self.nodes[prev].next = Some(id);
            prev = id;
            next = self.kconfig[menu_id].next;
        }

        first_shadow
    }

    fn build_node(&mut self, menu_id: MenuId, parent: Option<ShadowId>, level: usize) -> ShadowId {
        let kconfig = self.kconfig;
        let node = &kconfig[menu_id];
        let id = self.nodes.insert(ShadowNode {
            menu_node: menu_id,
            parent,
            level,
            next: None,
            list: None,
            defined: false,
            config: None,
            kind: NodeKind::of(node),
            prompt: node.prompt.as_ref().map(|p| p.text.clone()),
            help: node.help.clone(),
        });
        self.max_level = self.max_level.max(level);

        if kconfig.node_dep_value(menu_id).is_positive() {
            if let Some(record) = kconfig.item_name(node.item).and_then(|name| self.index.lookup(name)) {
                self.nodes[id].defined = true;
                self.nodes[id].config = Some(record);
                self.mark_ancestors(parent);
            }
        }

        if let Some(child) = node.list {
            let list = self.build_run(child, Some(id), level + 1);
            self.nodes[id].list = Some(list);
        }

        id
    }

    fn mark_ancestors(&mut self, mut parent: Option<ShadowId>) {
        while let Some(id) = parent {
            let node = &mut self.nodes[id];
            if node.defined {
                break;
            }

            node.defined = true;
            parent = node.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{NodeKind, ShadowTree},
        crate::{parser::Tristate, AssignmentIndex, BuildEnv, Kconfig},
        std::path::Path,
    };

    const KCONFIG: &str = r#"
mainmenu "Tree Test"

menu "Outer"

menu "Inner"

config DEEP
	bool "Deep"

config DEEP_DEP
	bool "Deep dependent"
	depends on MISSING

endmenu

menuconfig FEATURE
	bool "Feature"

if FEATURE

config FEATURE_OPT
	bool "Feature option"

endif

endmenu

choice
	prompt "Pick"

config PICK_A
	bool "A"

config PICK_B
	bool "B"

endchoice

comment "Just a comment"
"#;

    fn tree_for(defconfig: &str) -> (Kconfig, AssignmentIndex, ShadowTree) {
        let mut kconfig =
            Kconfig::parse_str(KCONFIG, Path::new("Kconfig"), Path::new("."), &BuildEnv::default()).unwrap();
        kconfig.load_config_str(defconfig, Path::new("defconfig"), true);
        let mut index = AssignmentIndex::new();
        index.load(AssignmentIndex::ingest(defconfig.lines(), &kconfig));
        let tree = ShadowTree::build(&kconfig, &index);
        (kconfig, index, tree)
    }

    fn find(tree: &ShadowTree, prompt: &str) -> super::ShadowId {
        tree.iter().find(|(_, n)| n.prompt.as_deref() == Some(prompt)).unwrap().0
    }

    #[test_log::test]
    fn structure() {
        let (kconfig, _, tree) = tree_for("");
        let root = tree.root();
        assert_eq!(tree[root].level, 0);
        assert_eq!(tree[root].kind, NodeKind::MenuOnly);
        assert_eq!(tree[root].menu_node, kconfig.top_node());
        assert_eq!(tree.len(), 11);
        assert_eq!(tree.max_level(), 3);
        assert_eq!(tree.level_size(), 4);

        let top: Vec<_> = tree.children(root).map(|id| tree[id].kind).collect();
        assert_eq!(top, vec![NodeKind::MenuOnly, NodeKind::Choice, NodeKind::Comment]);

        assert_eq!(tree[find(&tree, "Feature")].kind, NodeKind::MenuConfig);
        assert!(tree[find(&tree, "Feature")].kind.is_symbol());
        assert!(tree[find(&tree, "Feature")].kind.is_menu());
        assert!(tree[find(&tree, "Pick")].kind.is_menu());
        assert!(!tree[find(&tree, "Just a comment")].kind.is_menu());

        for (id, node) in tree.iter() {
            for child in tree.children(id) {
                assert_eq!(tree[child].level, node.level + 1);
                assert_eq!(tree[child].parent, Some(id));
            }
        }

        assert!(tree.iter().all(|(_, n)| !n.defined && n.config.is_none()));
    }

    #[test_log::test]
    fn defined_propagates_to_ancestors() {
        let (_, index, tree) = tree_for("CONFIG_DEEP=y\n");
        let deep = find(&tree, "Deep");
        assert!(tree[deep].defined);
        assert_eq!(tree[deep].config, index.lookup("DEEP"));

        let mut parent = tree[deep].parent;
        while let Some(id) = parent {
            assert!(tree[id].defined);
            assert!(tree[id].config.is_none());
            parent = tree[id].parent;
        }

        assert!(!tree[find(&tree, "Feature")].defined);
        assert!(!tree[find(&tree, "Pick")].defined);
    }

    #[test_log::test]
    fn inactive_assignments_are_not_attached() {
        let (_, index, tree) = tree_for("CONFIG_DEEP_DEP=y\n# CONFIG_FEATURE is not set\nCONFIG_FEATURE_OPT=y\n");
        assert!(index.get("DEEP_DEP").is_some());

        assert!(!tree[find(&tree, "Deep dependent")].defined);
        assert!(!tree[find(&tree, "Inner")].defined);

        // FEATURE is assigned (to n) and its dependencies are met; FEATURE_OPT depends on it and is not.
        assert!(tree[find(&tree, "Feature")].defined);
        assert!(!tree[find(&tree, "Feature option")].defined);
        assert!(tree[find(&tree, "Outer")].defined);
    }

    #[test_log::test]
    fn optional_choice_needs_a_selection() {
        let source = "choice\n\tprompt \"Opt\"\n\toptional\n\nconfig OA\n\tbool \"OA\"\n\nconfig OB\n\tbool \"OB\"\n\nendchoice\n";
        let build = |defconfig: &str| {
            let mut kconfig =
                Kconfig::parse_str(source, Path::new("Kconfig"), Path::new("."), &BuildEnv::default()).unwrap();
            kconfig.load_config_str(defconfig, Path::new("defconfig"), true);
            let mut index = AssignmentIndex::new();
            index.load(AssignmentIndex::ingest(defconfig.lines(), &kconfig));
            let tree = ShadowTree::build(&kconfig, &index);
            (kconfig, tree)
        };

        let (kconfig, tree) = build("# CONFIG_OA is not set\n");
        let oa = find(&tree, "OA");
        assert_eq!(kconfig.node_dep_value(tree[oa].menu_node), Tristate::False);
        assert!(!tree[oa].defined);
        assert!(tree[oa].config.is_none());
        assert!(!tree[tree.root()].defined);

        let (kconfig, tree) = build("CONFIG_OB=y\n");
        let ob = find(&tree, "OB");
        assert_eq!(kconfig.node_dep_value(tree[ob].menu_node), Tristate::True);
        assert!(tree[ob].defined);
        assert!(tree[find(&tree, "Opt")].defined);
    }

    #[test_log::test]
    fn choice_members() {
        let (_, _, tree) = tree_for("CONFIG_PICK_B=y\n");
        assert!(tree[find(&tree, "Pick")].defined);
        assert!(tree[find(&tree, "B")].defined);
        assert!(!tree[find(&tree, "A")].defined);
        assert!(tree[tree.root()].defined);
    }
}
