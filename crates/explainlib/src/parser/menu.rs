//! Statement parser: turns token lines into the menu tree of a [Kconfig].

use {
    crate::{
        context::context_closure,
        kconfig::{Choice, DefaultValue, Item, Kconfig, MenuId, MenuNode, Prompt, Range, ReverseDep, Symbol},
        parser::{
            Expected, Expr, KConfigError, LocToken, Located, Location, Preprocessor, Token, TokenLine, TokenLines,
            Type,
        },
        ChoiceId, Context,
    },
    log::{debug, warn},
    shellexpand::env_with_context,
    std::{
        env::VarError,
        fs,
        io::ErrorKind as IoErrorKind,
        path::{Path, PathBuf},
    },
};

/// Maximum nesting of `source` statements.
const MAX_SOURCE_DEPTH: usize = 64;

/// The enclosing context of a block of statements.
#[derive(Clone, Debug)]
pub(crate) struct Scope {
    parent: MenuId,
    dep: Expr,
    visible_if: Expr,
    choice: Option<ChoiceId>,
}

impl Scope {
    /// The scope of statements at the top of the tree.
    pub(crate) fn top(parent: MenuId) -> Self {
        Self {
            parent,
            dep: Expr::yes(),
            visible_if: Expr::yes(),
            choice: None,
        }
    }
}

/// Properties collected from the lines following a `config`, `menuconfig`, `choice`, `menu` or `comment`.
#[derive(Debug, Default)]
struct Properties {
    ty: Option<Type>,
    prompt: Option<(String, Expr)>,
    defaults: Vec<(Expr, Expr)>,
    depends: Vec<Expr>,
    selects: Vec<(String, Expr)>,
    implies: Vec<(String, Expr)>,
    ranges: Vec<(Expr, Expr, Expr)>,
    help: Option<String>,
    visible_if: Vec<Expr>,
    modules: bool,
    optional: bool,
}

fn is_property(token: &Token) -> bool {
    token.is_type()
        || token.is_def_type()
        || matches!(
            token,
            Token::Prompt
                | Token::Default
                | Token::Depends
                | Token::Select
                | Token::Imply
                | Token::Range
                | Token::Help
                | Token::Visible
                | Token::Option
                | Token::Modules
                | Token::Optional
                | Token::Transitional
        )
}

/// Builds the menu tree of a [Kconfig] from Kconfig source files.
pub(crate) struct MenuParser<'k, 'ctx> {
    kconfig: &'k mut Kconfig,
    pp: Preprocessor<'ctx>,
    context: &'ctx dyn Context,
    base_dir: PathBuf,
    source_depth: usize,
}

impl<'k, 'ctx> MenuParser<'k, 'ctx> {
    pub(crate) fn new(kconfig: &'k mut Kconfig, context: &'ctx dyn Context, base_dir: &Path) -> Self {
        Self {
            kconfig,
            pp: Preprocessor::new(context),
            context,
            base_dir: base_dir.to_path_buf(),
            source_depth: 0,
        }
    }

    /// Parse a file's contents, appending its nodes after `prev`. Returns the last node appended.
    pub(crate) fn parse_data(
        &mut self,
        data: &str,
        filename: &Path,
        scope: &Scope,
        prev: MenuId,
    ) -> Result<MenuId, KConfigError> {
        let mut lines = TokenLines::new(data, filename);
        let (last, end) = self.parse_block(&mut lines, scope, prev)?;

        match end {
            Some(end) => Err(KConfigError::unexpected(&end, Expected::Statement, end.location())),
            None => Ok(last),
        }
    }

    fn parse_file(&mut self, path: &Path, scope: &Scope, prev: MenuId, optional: bool) -> Result<MenuId, KConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if optional && e.kind() == IoErrorKind::NotFound => {
                debug!("Ignoring missing optional source {}", path.display());
                return Ok(prev);
            }
            Err(e) => return Err(KConfigError::open(path, e)),
        };

        debug!("Parsing {}", path.display());
        self.parse_data(&data, path, scope, prev)
    }

    /// Parse statements until end-of-file or an `endmenu`, `endchoice` or `endif` line, which is returned.
    fn parse_block(
        &mut self,
        lines: &mut TokenLines,
        scope: &Scope,
        mut prev: MenuId,
    ) -> Result<(MenuId, Option<LocToken>), KConfigError> {
        while let Some(line) = lines.next_line(&mut self.pp)? {
            let first = line[0].clone();
            let mut tokens = TokenLine::new(&line);

            prev = match &first.token {
                Token::Config | Token::MenuConfig => self.parse_config(lines, &mut tokens, scope, prev)?,
                Token::Choice => self.parse_choice(lines, &mut tokens, scope, prev)?,
                Token::Menu => self.parse_menu(lines, &mut tokens, scope, prev)?,
                Token::Comment => {
                    let (cmd, text) = tokens.read_cmd_str_lit(true)?;
                    let mut props = self.parse_properties(lines)?;
                    props.prompt = Some((text, Expr::yes()));
                    let node = self.new_node(Item::Comment, cmd.location(), scope, &props, false);
                    self.append(prev, node)
                }
                Token::If => {
                    _ = tokens.next();
                    let cond = Expr::parse(first.location(), &mut tokens)?;
                    tokens.expect_eol()?;

                    let inner = Scope {
                        dep: Expr::and(scope.dep.clone(), cond),
                        ..scope.clone()
                    };
                    let (last, end) = self.parse_block(lines, &inner, prev)?;
                    expect_end(end, Token::EndIf, Expected::EndIf, first.location())?;
                    last
                }
                Token::Mainmenu => {
                    let (_, text) = tokens.read_cmd_str_lit(true)?;
                    let top = self.kconfig.top_node;
                    self.kconfig.nodes[top].prompt = Some(Prompt {
                        text,
                        cond: Expr::yes(),
                    });
                    prev
                }
                t if t.is_source() => self.parse_source(&mut tokens, lines.filename(), scope, prev)?,
                Token::EndMenu | Token::EndChoice | Token::EndIf => {
                    _ = tokens.next();
                    tokens.expect_eol()?;
                    return Ok((prev, Some(first)));
                }
                _ => return Err(KConfigError::unexpected(&first, Expected::Statement, first.location())),
            };
        }

        Ok((prev, None))
    }

    fn parse_config(
        &mut self,
        lines: &mut TokenLines,
        tokens: &mut TokenLine,
        scope: &Scope,
        prev: MenuId,
    ) -> Result<MenuId, KConfigError> {
        let (cmd, name) = tokens.read_cmd_sym(true)?;
        let is_menuconfig = cmd.token == Token::MenuConfig;
        let props = self.parse_properties(lines)?;

        let sym = match self.kconfig.symbol_names.get(&name) {
            Some(&sym) => sym,
            None => {
                let sym = self.kconfig.symbols.insert(Symbol::new(&name));
                self.kconfig.symbol_names.insert(name.clone(), sym);
                sym
            }
        };

        let node = self.new_node(Item::Symbol(sym), cmd.location(), scope, &props, is_menuconfig);
        let dep = self.kconfig.nodes[node].dep.clone();

        if props.modules {
            self.kconfig.modules = Some(sym);
        }

        if let Some(choice) = scope.choice {
            let members = &mut self.kconfig.choices[choice].syms;
            if !members.contains(&sym) {
                members.push(sym);
            }
        }

        let symbol = &mut self.kconfig.symbols[sym];
        if let Some(ty) = props.ty {
            if symbol.ty != Type::Unknown && symbol.ty != ty {
                warn!("{}: {name} redefined from {} to {ty}", cmd.location(), symbol.ty);
            }
            symbol.ty = ty;
        }

        symbol.nodes.push(node);
        symbol.choice = symbol.choice.or(scope.choice);
        symbol.direct_dep = Expr::or(symbol.direct_dep.clone(), dep.clone());
        symbol.defaults.extend(props.defaults.into_iter().map(|(value, cond)| DefaultValue {
            value,
            cond: Expr::and(cond, dep.clone()),
        }));
        symbol.ranges.extend(props.ranges.into_iter().map(|(low, high, cond)| Range {
            low,
            high,
            cond: Expr::and(cond, dep.clone()),
        }));
        symbol.selects.extend(props.selects.into_iter().map(|(target, cond)| ReverseDep {
            target,
            cond: Expr::and(cond, dep.clone()),
        }));
        symbol.implies.extend(props.implies.into_iter().map(|(target, cond)| ReverseDep {
            target,
            cond: Expr::and(cond, dep.clone()),
        }));

        Ok(self.append(prev, node))
    }

    fn parse_choice(
        &mut self,
        lines: &mut TokenLines,
        tokens: &mut TokenLine,
        scope: &Scope,
        prev: MenuId,
    ) -> Result<MenuId, KConfigError> {
        let Some(cmd) = tokens.next() else {
            return Err(KConfigError::missing(Expected::Statement, lines.location()));
        };

        let name = match tokens.next() {
            None => None,
            Some(t) => match t.symbol_value() {
                Some(name) => Some(name.to_string()),
                None => return Err(KConfigError::unexpected(t, Expected::Symbol, t.location())),
            },
        };
        tokens.expect_eol()?;

        let props = self.parse_properties(lines)?;
        let choice = self.kconfig.choices.insert(Choice {
            name,
            ty: props.ty.unwrap_or_default(),
            nodes: Vec::new(),
            syms: Vec::new(),
            defaults: Vec::new(),
            direct_dep: Expr::no(),
            optional: props.optional,
            user_selection: None,
        });

        let node = self.new_node(Item::Choice(choice), cmd.location(), scope, &props, false);
        let dep = self.kconfig.nodes[node].dep.clone();

        let c = &mut self.kconfig.choices[choice];
        c.nodes.push(node);
        c.direct_dep = dep.clone();
        c.defaults.extend(props.defaults.into_iter().map(|(value, cond)| DefaultValue {
            value,
            cond: Expr::and(cond, dep.clone()),
        }));

        let inner = Scope {
            parent: node,
            dep,
            visible_if: scope.visible_if.clone(),
            choice: Some(choice),
        };

        let node = self.append(prev, node);
        self.parse_children(lines, node, &inner, Token::EndChoice, Expected::EndChoice, cmd.location())?;
        Ok(node)
    }

    fn parse_menu(
        &mut self,
        lines: &mut TokenLines,
        tokens: &mut TokenLine,
        scope: &Scope,
        prev: MenuId,
    ) -> Result<MenuId, KConfigError> {
        let (cmd, text) = tokens.read_cmd_str_lit(true)?;
        let mut props = self.parse_properties(lines)?;
        props.prompt = Some((text, Expr::yes()));

        let node = self.new_node(Item::Menu, cmd.location(), scope, &props, false);
        let menu = &self.kconfig.nodes[node];

        let inner = Scope {
            parent: node,
            dep: menu.dep.clone(),
            visible_if: Expr::and(scope.visible_if.clone(), menu.visibility.clone()),
            choice: None,
        };

        let node = self.append(prev, node);
        self.parse_children(lines, node, &inner, Token::EndMenu, Expected::EndMenu, cmd.location())?;
        Ok(node)
    }

    /// Parse the contents of a `menu` or `choice` block into the children of `node`.
    fn parse_children(
        &mut self,
        lines: &mut TokenLines,
        node: MenuId,
        inner: &Scope,
        end_token: Token,
        expected: Expected,
        start: Location,
    ) -> Result<(), KConfigError> {
        let (_, end) = self.parse_block(lines, inner, node)?;
        expect_end(end, end_token, expected, start)?;

        // Children were chained after the node itself; move them below it.
        let children = self.kconfig.nodes[node].next.take();
        self.kconfig.nodes[node].list = children;
        Ok(())
    }

    fn parse_source(
        &mut self,
        tokens: &mut TokenLine,
        current_file: &Path,
        scope: &Scope,
        prev: MenuId,
    ) -> Result<MenuId, KConfigError> {
        let (cmd, filename) = tokens.read_cmd_str_lit(true)?;

        // Expand any ${ENV} variables in the filename.
        let filename = match env_with_context(filename.as_str(), context_closure(self.context)) {
            Ok(s) => s.into_owned(),
            Err(e) => {
                return Err(match e.cause {
                    VarError::NotPresent => KConfigError::unknown_env(e.var_name, cmd.location()),
                    VarError::NotUnicode(_) => KConfigError::invalid_env(e.var_name, cmd.location()),
                })
            }
        };

        let base_dir = if cmd.token.is_relative_source() {
            current_file.parent().unwrap_or_else(|| Path::new("."))
        } else {
            self.base_dir.as_path()
        };
        let path = base_dir.join(filename);

        if self.source_depth >= MAX_SOURCE_DEPTH {
            return Err(KConfigError::recursive_source(&path, cmd.location()));
        }

        self.source_depth += 1;
        let result = self.parse_file(&path, scope, prev, cmd.token.is_optional_source());
        self.source_depth -= 1;
        result
    }

    /// Read property lines until a line that is not a property, which is left in the stream.
    fn parse_properties(&mut self, lines: &mut TokenLines) -> Result<Properties, KConfigError> {
        let mut props = Properties::default();

        while let Some(line) = lines.next_line(&mut self.pp)? {
            if !is_property(&line[0].token) {
                lines.push_back(line);
                break;
            }

            let mut tokens = TokenLine::new(&line);
            if line[0].token == Token::Help {
                props.help = Some(tokens.read_help()?);
                continue;
            }

            let Some(cmd) = tokens.next() else {
                continue;
            };
            let loc = cmd.location();

            match &cmd.token {
                t if t.is_type() => {
                    props.ty = t.r#type();
                    if let Some(text) = tokens.peek().and_then(|t| t.string_literal_value()) {
                        _ = tokens.next();
                        let cond = tokens.read_if_expr(true)?.unwrap_or_else(Expr::yes);
                        props.prompt = Some((text.to_string(), cond));
                    } else {
                        tokens.expect_eol()?;
                    }
                }
                t if t.is_def_type() => {
                    props.ty = t.r#type();
                    let value = Expr::parse(loc, &mut tokens)?;
                    let cond = tokens.read_if_expr(true)?.unwrap_or_else(Expr::yes);
                    props.defaults.push((value, cond));
                }
                Token::Prompt => {
                    let Some(text) = tokens.next() else {
                        return Err(KConfigError::missing(Expected::StringLiteral, loc));
                    };
                    let Some(text) = text.string_literal_value() else {
                        return Err(KConfigError::unexpected(text, Expected::StringLiteral, text.location()));
                    };
                    let cond = tokens.read_if_expr(true)?.unwrap_or_else(Expr::yes);
                    props.prompt = Some((text.to_string(), cond));
                }
                Token::Default => {
                    let value = Expr::parse(loc, &mut tokens)?;
                    let cond = tokens.read_if_expr(true)?.unwrap_or_else(Expr::yes);
                    props.defaults.push((value, cond));
                }
                Token::Depends => {
                    match tokens.next() {
                        Some(t) if t.token == Token::On => (),
                        Some(t) => return Err(KConfigError::unexpected(t, Expected::On, t.location())),
                        None => return Err(KConfigError::missing(Expected::On, loc)),
                    }
                    props.depends.push(Expr::parse(loc, &mut tokens)?);
                    tokens.expect_eol()?;
                }
                Token::Select | Token::Imply => {
                    let Some(target) = tokens.next() else {
                        return Err(KConfigError::missing(Expected::Symbol, loc));
                    };
                    let Some(target) = target.symbol_value() else {
                        return Err(KConfigError::unexpected(target, Expected::Symbol, target.location()));
                    };
                    let cond = tokens.read_if_expr(true)?.unwrap_or_else(Expr::yes);
                    if cmd.token == Token::Select {
                        props.selects.push((target.to_string(), cond));
                    } else {
                        props.implies.push((target.to_string(), cond));
                    }
                }
                Token::Range => {
                    let low = Expr::parse(loc, &mut tokens)?;
                    let high = Expr::parse(loc, &mut tokens)?;
                    let cond = tokens.read_if_expr(true)?.unwrap_or_else(Expr::yes);
                    props.ranges.push((low, high, cond));
                }
                Token::Visible => {
                    match tokens.next() {
                        Some(t) if t.token == Token::If => (),
                        Some(t) => return Err(KConfigError::unexpected(t, Expected::If, t.location())),
                        None => return Err(KConfigError::missing(Expected::If, loc)),
                    }
                    props.visible_if.push(Expr::parse(loc, &mut tokens)?);
                    tokens.expect_eol()?;
                }
                Token::Option => {
                    // option env=..., defconfig_list and allnoconfig_y have no effect here.
                    if tokens.next().and_then(|t| t.symbol_value()) == Some("modules") {
                        props.modules = true;
                    }
                }
                Token::Modules => {
                    props.modules = true;
                    tokens.expect_eol()?;
                }
                Token::Optional => {
                    props.optional = true;
                    tokens.expect_eol()?;
                }
                _ => (),
            }
        }

        Ok(props)
    }

    fn new_node(
        &mut self,
        item: Item,
        location: Location,
        scope: &Scope,
        props: &Properties,
        is_menuconfig: bool,
    ) -> MenuId {
        let dep = props.depends.iter().cloned().fold(scope.dep.clone(), Expr::and);
        let prompt = props.prompt.as_ref().map(|(text, cond)| Prompt {
            text: text.clone(),
            cond: Expr::and(Expr::and(cond.clone(), dep.clone()), scope.visible_if.clone()),
        });
        let visibility = props.visible_if.iter().cloned().fold(Expr::yes(), Expr::and);

        self.kconfig.nodes.insert(MenuNode {
            item,
            prompt,
            help: props.help.clone(),
            dep,
            visibility,
            choice: scope.choice,
            location,
            is_menuconfig,
            parent: Some(scope.parent),
            list: None,
            next: None,
        })
    }

    fn append(&mut self, prev: MenuId, node: MenuId) -> MenuId {
        self.kconfig.nodes[prev].next = Some(node);
        node
    }

    /// Complete the tree once all files have been read: nest nodes under the symbols they depend on, settle
    /// choice types and compute reverse dependencies.
    pub(crate) fn finalize(self) {
        let top = self.kconfig.top_node;
        self.kconfig.nodes[top].list = self.kconfig.nodes[top].next.take();

        finalize_node(self.kconfig, top);
        settle_choice_types(self.kconfig);
        compute_reverse_deps(self.kconfig);
    }
}

fn expect_end(end: Option<LocToken>, token: Token, expected: Expected, start: Location) -> Result<(), KConfigError> {
    match end {
        Some(end) if end.token == token => Ok(()),
        Some(end) => Err(KConfigError::unexpected(&end, expected, end.location())),
        None => Err(KConfigError::unexpected_eof(expected, start)),
    }
}

/// Nest the nodes following a symbol that depend on it into an implicit submenu rooted at the symbol.
fn finalize_node(kconfig: &mut Kconfig, id: MenuId) {
    if let Some(first) = kconfig.nodes[id].list {
        let mut cur = Some(first);
        while let Some(c) = cur {
            finalize_node(kconfig, c);
            cur = kconfig.nodes[c].next;
        }
        return;
    }

    let Item::Symbol(sym) = kconfig.nodes[id].item else {
        return;
    };
    let name = kconfig.symbols[sym].name.clone();

    let mut cur = id;
    while let Some(next) = kconfig.nodes[cur].next {
        let next_node = &kconfig.nodes[next];
        let dep = match &next_node.prompt {
            Some(prompt) => &prompt.cond,
            None => &next_node.dep,
        };

        if !dep.depends_on_symbol(&name) {
            break;
        }

        finalize_node(kconfig, next);
        cur = next;
        kconfig.nodes[cur].parent = Some(id);
    }

    if cur != id {
        kconfig.nodes[id].list = kconfig.nodes[id].next;
        kconfig.nodes[id].next = kconfig.nodes[cur].next.take();
    }
}

fn settle_choice_types(kconfig: &mut Kconfig) {
    for (_, choice) in kconfig.choices.iter_mut() {
        if choice.ty == Type::Unknown {
            choice.ty =
                choice.syms.iter().map(|&s| kconfig.symbols[s].ty).find(|&ty| ty != Type::Unknown).unwrap_or_default();
        }

        for &s in &choice.syms {
            let sym = &mut kconfig.symbols[s];
            if sym.ty == Type::Unknown {
                sym.ty = choice.ty;
            }
        }
    }
}

fn compute_reverse_deps(kconfig: &mut Kconfig) {
    let mut rev = Vec::new();
    let mut weak = Vec::new();

    for (_, sym) in kconfig.symbols.iter() {
        let selector = Expr::Symbol(sym.name.clone());
        for select in &sym.selects {
            rev.push((select.target.clone(), Expr::and(selector.clone(), select.cond.clone())));
        }
        for imply in &sym.implies {
            weak.push((imply.target.clone(), Expr::and(selector.clone(), imply.cond.clone())));
        }
    }

    for (target, cond) in rev {
        match kconfig.symbol_names.get(&target) {
            Some(&id) => {
                let sym = &mut kconfig.symbols[id];
                sym.rev_dep = Expr::or(sym.rev_dep.clone(), cond);
            }
            None => debug!("select of undefined symbol {target}"),
        }
    }

    for (target, cond) in weak {
        if let Some(&id) = kconfig.symbol_names.get(&target) {
            let sym = &mut kconfig.symbols[id];
            sym.weak_rev_dep = Expr::or(sym.weak_rev_dep.clone(), cond);
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{kconfig::Item, BuildEnv, Kconfig},
        std::{fs, path::Path},
        tempfile::TempDir,
    };

    #[test_log::test]
    fn sourced_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("arch/x86")).unwrap();
        fs::write(
            root.join("Kconfig"),
            "mainmenu \"Linux/$(ARCH) $(KERNELVERSION) Kernel Configuration\"\n\
             source \"arch/$(SRCARCH)/Kconfig\"\n\
             osource \"missing/Kconfig\"\n",
        )
        .unwrap();
        fs::write(root.join("arch/x86/Kconfig"), "config X86\n\tdef_bool y\nrsource \"Kconfig.cpu\"\n").unwrap();
        fs::write(root.join("arch/x86/Kconfig.cpu"), "config M686\n\tbool \"686\"\n").unwrap();

        let env = BuildEnv::new("x86_64", None, "", None, None, root).with_var("KERNELVERSION", "6.8.0");
        let kconfig = Kconfig::parse(&root.join("Kconfig"), root, &env).unwrap();

        let top = kconfig.top_node();
        assert_eq!(kconfig[top].prompt.as_ref().unwrap().text, "Linux/x86_64 6.8.0 Kernel Configuration");
        let names: Vec<_> = kconfig.children(top).filter_map(|id| kconfig.item_name(kconfig[id].item)).collect();
        assert_eq!(names, vec!["X86", "M686"]);

        let m686 = kconfig.children(top).nth(1).unwrap();
        assert!(kconfig[m686].filename().ends_with("arch/x86/Kconfig.cpu"));
        assert_eq!(kconfig[m686].linenr(), 1);
    }

    #[test]
    fn missing_source() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Kconfig"), "source \"nope/Kconfig\"\n").unwrap();
        let env = BuildEnv::default();
        assert!(Kconfig::parse(&dir.path().join("Kconfig"), dir.path(), &env).is_err());
    }

    #[test]
    fn unbalanced_blocks() {
        let env = BuildEnv::default();
        for bad in ["menu \"M\"\nconfig A\n\tbool\n", "endmenu\n", "if A\nendmenu\n", "choice\nendif\n"] {
            assert!(Kconfig::parse_str(bad, Path::new("Kconfig"), Path::new("."), &env).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn menuconfig_and_visible_if() {
        let input = r#"
menuconfig NET
	bool "Networking support"

if NET
config INET
	bool "TCP/IP networking"
endif

menu "Hidden"
	visible if n
config HIDDEN
	bool "Hidden option"
endmenu
"#;
        let kconfig = Kconfig::parse_str(input, Path::new("Kconfig"), Path::new("."), &BuildEnv::default()).unwrap();
        let top = kconfig.top_node();
        let net = kconfig.children(top).next().unwrap();
        assert!(kconfig[net].is_menuconfig);
        let inet = kconfig.children(net).next().unwrap();
        assert_eq!(kconfig.item_name(kconfig[inet].item), Some("INET"));

        let hidden_menu = kconfig.children(top).nth(1).unwrap();
        assert_eq!(kconfig[hidden_menu].item, Item::Menu);
        let hidden = kconfig.children(hidden_menu).next().unwrap();
        assert_eq!(kconfig[hidden].prompt.as_ref().unwrap().cond.to_string(), "n");
    }
}
