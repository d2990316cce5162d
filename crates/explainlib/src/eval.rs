//! Symbol value evaluation.

use {
    crate::{
        kconfig::{Cached, SymValue, CONFIG_PREFIX},
        parser::{escape_string, Expr, Tristate, Type},
        ChoiceId, Kconfig, MenuId, SymbolId,
    },
    log::debug,
    std::cmp::Ordering,
};

/// Parse an integer as it may appear in a Kconfig expression: decimal or `0x`-prefixed hexadecimal.
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };

    Some(if negative {
        -value
    } else {
        value
    })
}

impl Kconfig {
    /// Evaluate an expression to a tristate value.
    ///
    /// Symbols that are not `bool` or `tristate` and unknown names evaluate to `n`. Comparisons are numeric when
    /// both operands parse as integers and lexicographic otherwise.
    pub fn expr_value(&self, expr: &Expr) -> Tristate {
        match expr {
            Expr::Symbol(name) => match name.as_str() {
                "y" => Tristate::True,
                "m" => Tristate::Maybe,
                "n" => Tristate::False,
                _ => self.symbol_by_name(name).map(|id| self.sym_tri_value(id)).unwrap_or_default(),
            },
            Expr::String(_) => Tristate::False,
            Expr::Not(e) => self.expr_value(e).not(),
            Expr::And(lhs, rhs) => self.expr_value(lhs).min(self.expr_value(rhs)),
            Expr::Or(lhs, rhs) => self.expr_value(lhs).max(self.expr_value(rhs)),
            Expr::Eq(lhs, rhs) => (self.compare(lhs, rhs) == Ordering::Equal).into(),
            Expr::Ne(lhs, rhs) => (self.compare(lhs, rhs) != Ordering::Equal).into(),
            Expr::Lt(lhs, rhs) => (self.compare(lhs, rhs) == Ordering::Less).into(),
            Expr::Le(lhs, rhs) => (self.compare(lhs, rhs) != Ordering::Greater).into(),
            Expr::Gt(lhs, rhs) => (self.compare(lhs, rhs) == Ordering::Greater).into(),
            Expr::Ge(lhs, rhs) => (self.compare(lhs, rhs) != Ordering::Less).into(),
        }
    }

    fn compare(&self, lhs: &Expr, rhs: &Expr) -> Ordering {
        let lhs = self.expr_str_value(lhs);
        let rhs = self.expr_str_value(rhs);

        match (parse_int(&lhs), parse_int(&rhs)) {
            (Some(l), Some(r)) => l.cmp(&r),
            _ => lhs.cmp(&rhs),
        }
    }

    /// Evaluate an expression operand to a string: a symbol's value, a constant's name or a string literal.
    pub fn expr_str_value(&self, expr: &Expr) -> String {
        match expr {
            Expr::Symbol(name) => match self.symbol_by_name(name) {
                Some(id) if self.symbols[id].ty != Type::Unknown => self.sym_str_value(id),
                _ => name.clone(),
            },
            Expr::String(s) => s.clone(),
            _ => self.expr_value(expr).to_string(),
        }
    }

    /// The dependency value of a menu node. Nodes inside a choice are limited by the choice's mode, so members of
    /// an invisible choice or of an optional choice without a selection are `n`.
    pub fn node_dep_value(&self, id: MenuId) -> Tristate {
        let node = &self.nodes[id];
        let dep = self.expr_value(&node.dep);

        match node.choice {
            Some(choice) => dep.min(self.choice_mode(choice)),
            None => dep,
        }
    }

    /// The value of a `bool` or `tristate` symbol; `n` for other types.
    pub fn sym_tri_value(&self, id: SymbolId) -> Tristate {
        self.evaluated(id, |v| v.tri)
    }

    /// The value of a symbol as it would be written to a `.config` file, without quotes.
    pub fn sym_str_value(&self, id: SymbolId) -> String {
        self.evaluated(id, |v| v.string.clone())
    }

    /// The `.config` line for a symbol, including the trailing newline.
    ///
    /// This is `# CONFIG_<NAME> is not set` for `n` values of `bool` and `tristate` symbols and
    /// `CONFIG_<NAME>=<value>` otherwise, with string values quoted. Symbols that would not be written (for
    /// example because their dependencies are not met) return an empty string.
    pub fn config_string(&self, id: SymbolId) -> String {
        let sym = &self.symbols[id];
        let name = &sym.name;

        self.evaluated(id, |v| {
            if !v.write {
                return String::new();
            }

            match sym.ty {
                Type::Bool | Type::Tristate if v.tri == Tristate::False => format!("# {CONFIG_PREFIX}{name} is not set\n"),
                Type::Bool | Type::Tristate => format!("{CONFIG_PREFIX}{name}={}\n", v.tri),
                Type::Int | Type::Hex => format!("{CONFIG_PREFIX}{name}={}\n", v.string),
                Type::String => format!("{CONFIG_PREFIX}{name}=\"{}\"\n", escape_string(&v.string)),
                Type::Unknown => String::new(),
            }
        })
    }

    /// The visibility of a symbol: the highest value among its prompt conditions, limited by its choice.
    pub fn sym_visibility(&self, id: SymbolId) -> Tristate {
        let sym = &self.symbols[id];
        let mut vis = self.prompt_visibility(&sym.nodes);

        if let Some(choice) = sym.choice {
            vis = vis.min(self.choice_visibility(choice));
        }

        if vis == Tristate::Maybe && self.effective_type(sym.ty) != Type::Tristate {
            vis = Tristate::True;
        }

        vis
    }

    /// The visibility of a choice.
    pub fn choice_visibility(&self, id: ChoiceId) -> Tristate {
        let choice = &self.choices[id];
        let vis = self.prompt_visibility(&choice.nodes);

        if vis == Tristate::Maybe && self.effective_type(choice.ty) != Type::Tristate {
            Tristate::True
        } else {
            vis
        }
    }

    /// The selected member of a choice: the user selection if visible, otherwise the first active default,
    /// otherwise the first visible member. `None` if the choice is not visible.
    pub fn choice_selection(&self, id: ChoiceId) -> Option<SymbolId> {
        if self.choice_mode(id) == Tristate::False {
            return None;
        }

        let choice = &self.choices[id];
        let visible = |sym: SymbolId| self.sym_visibility(sym) != Tristate::False;

        if let Some(sym) = choice.user_selection.filter(|&s| visible(s)) {
            return Some(sym);
        }

        for default in &choice.defaults {
            let Expr::Symbol(name) = &default.value else {
                continue;
            };

            if let Some(sym) = self.symbol_by_name(name) {
                if choice.syms.contains(&sym) && visible(sym) && self.expr_value(&default.cond) != Tristate::False {
                    return Some(sym);
                }
            }
        }

        choice.syms.iter().copied().find(|&s| visible(s))
    }

    fn choice_mode(&self, id: ChoiceId) -> Tristate {
        let choice = &self.choices[id];
        if self.choice_visibility(id) == Tristate::False || (choice.optional && choice.user_selection.is_none()) {
            Tristate::False
        } else {
            Tristate::True
        }
    }

    fn prompt_visibility(&self, nodes: &[MenuId]) -> Tristate {
        nodes
            .iter()
            .filter_map(|&n| self.nodes[n].prompt.as_ref())
            .map(|p| self.expr_value(&p.cond))
            .max()
            .unwrap_or_default()
    }

    /// `tristate` behaves as `bool` unless the modules symbol is `y`.
    fn effective_type(&self, ty: Type) -> Type {
        if ty == Type::Tristate && !self.modules.is_some_and(|m| self.sym_tri_value(m) == Tristate::True) {
            Type::Bool
        } else {
            ty
        }
    }

    fn evaluated<R>(&self, id: SymbolId, f: impl FnOnce(&SymValue) -> R) -> R {
        let sym = &self.symbols[id];

        match &*sym.cache.borrow() {
            Cached::Done(value) => return f(value),
            Cached::InProgress => {
                debug!("Dependency loop while evaluating {}", sym.name);
                return f(&SymValue::default());
            }
            Cached::Empty => (),
        }

        *sym.cache.borrow_mut() = Cached::InProgress;
        let value = self.compute(id);
        let result = f(&value);
        *sym.cache.borrow_mut() = Cached::Done(value);
        result
    }

    /// Drop all cached values. Called whenever user values change.
    pub(crate) fn invalidate(&self) {
        for (_, sym) in self.symbols.iter() {
            *sym.cache.borrow_mut() = Cached::Empty;
        }
    }

    fn compute(&self, id: SymbolId) -> SymValue {
        let sym = &self.symbols[id];
        let vis = self.sym_visibility(id);
        let mut write = vis != Tristate::False;

        match sym.ty {
            Type::Bool | Type::Tristate => {
                let mut val = Tristate::False;

                if let Some(choice) = sym.choice {
                    val = (self.choice_selection(choice) == Some(id)).into();
                } else {
                    let user = sym.user_value.as_deref().and_then(Tristate::from_config_value);

                    match user {
                        Some(user) if vis != Tristate::False => val = user.min(vis),
                        _ => {
                            for default in &sym.defaults {
                                let cond = self.expr_value(&default.cond);
                                if cond != Tristate::False {
                                    val = self.expr_value(&default.value).min(cond);
                                    if val != Tristate::False {
                                        write = true;
                                    }
                                    break;
                                }
                            }

                            let weak = self.expr_value(&sym.weak_rev_dep);
                            if weak != Tristate::False && self.expr_value(&sym.direct_dep) != Tristate::False {
                                val = val.max(weak);
                                write = true;
                            }
                        }
                    }

                    let rev = self.expr_value(&sym.rev_dep);
                    if rev != Tristate::False {
                        val = val.max(rev);
                        write = true;
                    }
                }

                if val == Tristate::Maybe && self.effective_type(sym.ty) == Type::Bool {
                    val = Tristate::True;
                }

                SymValue {
                    tri: val,
                    string: val.to_string(),
                    write,
                }
            }

            Type::String | Type::Int | Type::Hex => {
                let mut val = String::new();

                match &sym.user_value {
                    Some(user) if vis != Tristate::False => val = user.clone(),
                    _ => {
                        for default in &sym.defaults {
                            if self.expr_value(&default.cond) != Tristate::False {
                                write = true;
                                val = self.expr_str_value(&default.value);
                                break;
                            }
                        }
                    }
                }

                if sym.ty != Type::String {
                    val = self.clamp_to_range(id, val);
                }

                SymValue {
                    tri: Tristate::False,
                    string: val,
                    write,
                }
            }

            Type::Unknown => SymValue::default(),
        }
    }

    /// Clamp an `int` or `hex` value to the first active `range`.
    fn clamp_to_range(&self, id: SymbolId, val: String) -> String {
        let sym = &self.symbols[id];
        let Some(range) = sym.ranges.iter().find(|r| self.expr_value(&r.cond) != Tristate::False) else {
            return val;
        };

        let (Some(low), Some(high)) =
            (parse_int(&self.expr_str_value(&range.low)), parse_int(&self.expr_str_value(&range.high)))
        else {
            return val;
        };

        let clamped = match parse_int(&val) {
            Some(v) if v < low => low,
            Some(v) if v > high => high,
            Some(_) => return val,
            None if val.is_empty() => low.max(0).min(high),
            None => return val,
        };

        if sym.ty == Type::Hex {
            format!("{clamped:#x}")
        } else {
            clamped.to_string()
        }
    }
}
