use {
    crate::parser::{Expected, KConfigError, Located, Location, Token, TokenLine},
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// An expression in the KConfig language.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    /// Named symbol or unquoted constant such as `y` or `0x10` (terminal).
    Symbol(String),

    /// Quoted string constant (terminal).
    String(String),

    /// Equality comparison.
    Eq(Box<Expr>, Box<Expr>),

    /// Inequality comparison.
    Ne(Box<Expr>, Box<Expr>),

    /// Less-than comparison.
    Lt(Box<Expr>, Box<Expr>),

    /// Less-than-or-equal comparison.
    Le(Box<Expr>, Box<Expr>),

    /// Greater-than comparison.
    Gt(Box<Expr>, Box<Expr>),

    /// Greater-than-or-equal comparison.
    Ge(Box<Expr>, Box<Expr>),

    /// Unary negation.
    Not(Box<Expr>),

    /// Boolean AND.
    And(Box<Expr>, Box<Expr>),

    /// Boolean OR.
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// The constant `y` expression.
    pub fn yes() -> Self {
        Self::Symbol("y".to_string())
    }

    /// The constant `n` expression.
    pub fn no() -> Self {
        Self::Symbol("n".to_string())
    }

    /// Indicates whether this is the constant `y`.
    pub fn is_yes(&self) -> bool {
        matches!(self, Self::Symbol(s) if s == "y")
    }

    /// Indicates whether this is the constant `n`.
    pub fn is_no(&self) -> bool {
        matches!(self, Self::Symbol(s) if s == "n")
    }

    /// Combine two expressions with `&&`, dropping `y` operands.
    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        if lhs.is_yes() {
            rhs
        } else if rhs.is_yes() {
            lhs
        } else {
            Expr::And(Box::new(lhs), Box::new(rhs))
        }
    }

    /// Combine two expressions with `||`, dropping `n` operands.
    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        if lhs.is_no() {
            rhs
        } else if rhs.is_no() {
            lhs
        } else {
            Expr::Or(Box::new(lhs), Box::new(rhs))
        }
    }

    /// Parse an expression from the remaining tokens of a line.
    ///
    /// Precedence from lowest to highest: `||`, `&&`, `!`, comparisons, terms.
    pub fn parse(start: Location, tokens: &mut TokenLine) -> Result<Self, KConfigError> {
        parse_or(start, tokens)
    }

    /// Indicates whether a node guarded by this expression depends on the symbol `name`.
    ///
    /// This holds for `name`, `name = y`, `name = m`, `name != n` (either operand order) and any `&&` with
    /// such an operand. Used to nest nodes under the symbol preceding them.
    pub fn depends_on_symbol(&self, name: &str) -> bool {
        match self {
            Self::Symbol(s) => s == name,
            Self::Eq(lhs, rhs) | Self::Ne(lhs, rhs) => {
                let other = match (lhs.as_ref(), rhs.as_ref()) {
                    (Self::Symbol(l), other) if l == name => other,
                    (other, Self::Symbol(r)) if r == name => other,
                    _ => return false,
                };

                match (self, other) {
                    (Self::Eq(..), Self::Symbol(c)) => c == "y" || c == "m",
                    (Self::Ne(..), Self::Symbol(c)) => c == "n",
                    _ => false,
                }
            }
            Self::And(lhs, rhs) => lhs.depends_on_symbol(name) || rhs.depends_on_symbol(name),
            _ => false,
        }
    }
}

fn parse_or(start: Location, tokens: &mut TokenLine) -> Result<Expr, KConfigError> {
    let mut lhs = parse_and(start, tokens)?;

    while tokens.peek().is_some_and(|t| t.token == Token::Or) {
        _ = tokens.next();
        let rhs = parse_and(start, tokens)?;
        lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
    }

    Ok(lhs)
}

fn parse_and(start: Location, tokens: &mut TokenLine) -> Result<Expr, KConfigError> {
    let mut lhs = parse_not(start, tokens)?;

    while tokens.peek().is_some_and(|t| t.token == Token::And) {
        _ = tokens.next();
        let rhs = parse_not(start, tokens)?;
        lhs = Expr::And(Box::new(lhs), Box::new(rhs));
    }

    Ok(lhs)
}

fn parse_not(start: Location, tokens: &mut TokenLine) -> Result<Expr, KConfigError> {
    if tokens.peek().is_some_and(|t| t.token == Token::Not) {
        _ = tokens.next();
        return Ok(Expr::Not(Box::new(parse_not(start, tokens)?)));
    }

    parse_cmp(start, tokens)
}

fn parse_cmp(start: Location, tokens: &mut TokenLine) -> Result<Expr, KConfigError> {
    let lhs = parse_term(start, tokens)?;

    let Some(op) = tokens.peek().filter(|t| t.token.is_cmp()) else {
        return Ok(lhs);
    };
    _ = tokens.next();

    let lhs = Box::new(lhs);
    let rhs = Box::new(parse_term(start, tokens)?);

    Ok(match op.token {
        Token::Eq => Expr::Eq(lhs, rhs),
        Token::Ne => Expr::Ne(lhs, rhs),
        Token::Lt => Expr::Lt(lhs, rhs),
        Token::Le => Expr::Le(lhs, rhs),
        Token::Gt => Expr::Gt(lhs, rhs),
        _ => Expr::Ge(lhs, rhs),
    })
}

fn parse_term(start: Location, tokens: &mut TokenLine) -> Result<Expr, KConfigError> {
    let Some(token) = tokens.next() else {
        return Err(KConfigError::missing(Expected::Expr, tokens.last_location().unwrap_or(start)));
    };

    match &token.token {
        Token::Symbol(s) => Ok(Expr::Symbol(s.clone())),
        Token::StrLit(s) => Ok(Expr::String(s.clone())),
        Token::LParen => {
            let expr = parse_or(start, tokens)?;
            match tokens.next() {
                Some(t) if t.token == Token::RParen => Ok(expr),
                Some(t) => Err(KConfigError::unexpected(t, Expected::RParen, t.location())),
                None => Err(KConfigError::missing(Expected::RParen, token.location())),
            }
        }
        _ => Err(KConfigError::unexpected(token, Expected::Expr, token.location())),
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Symbol(s) => f.write_str(s),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Eq(lhs, rhs) => write!(f, "{lhs} = {rhs}"),
            Self::Ne(lhs, rhs) => write!(f, "{lhs} != {rhs}"),
            Self::Lt(lhs, rhs) => write!(f, "{lhs} < {rhs}"),
            Self::Le(lhs, rhs) => write!(f, "{lhs} <= {rhs}"),
            Self::Gt(lhs, rhs) => write!(f, "{lhs} > {rhs}"),
            Self::Ge(lhs, rhs) => write!(f, "{lhs} >= {rhs}"),
            Self::Not(e) => write!(f, "!({e})"),
            Self::And(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::Expr,
        crate::parser::{tokenize_line, Location, TokenLine},
        std::path::Path,
    };

    fn parse(s: &str) -> Expr {
        let location = Location::start_of(Path::new("test"));
        let tokens = tokenize_line(s, location).unwrap();
        let mut line = TokenLine::new(&tokens);
        let expr = Expr::parse(location, &mut line).unwrap();
        assert!(line.is_empty(), "trailing tokens after {s:?}");
        expr
    }

    #[test]
    fn precedence() {
        assert_eq!(parse("A || B && !C").to_string(), "(A || (B && !(C)))");
        assert_eq!(parse("!A = y").to_string(), "!(A = y)");
        assert_eq!(parse("(A || B) && C != \"x\"").to_string(), "((A || B) && C != \"x\")");
    }

    #[test]
    fn errors() {
        let location = Location::start_of(Path::new("test"));
        for bad in ["A &&", "(A || B", "= B", ""] {
            let tokens = tokenize_line(bad, location).unwrap();
            let mut line = TokenLine::new(&tokens);
            assert!(Expr::parse(location, &mut line).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn symbol_dependencies() {
        assert!(parse("FOO").depends_on_symbol("FOO"));
        assert!(parse("BAR && FOO = y").depends_on_symbol("FOO"));
        assert!(parse("n != FOO").depends_on_symbol("FOO"));
        assert!(!parse("FOO || BAR").depends_on_symbol("FOO"));
        assert!(!parse("!FOO").depends_on_symbol("FOO"));
        assert!(!parse("FOO = n").depends_on_symbol("FOO"));
    }

    #[test]
    fn simplifying_combinators() {
        assert_eq!(Expr::and(Expr::yes(), Expr::Symbol("A".into())), Expr::Symbol("A".into()));
        assert_eq!(Expr::or(Expr::Symbol("A".into()), Expr::no()), Expr::Symbol("A".into()));
    }
}
