use {
    crate::parser::{Expected, KConfigError, Located, Location, PeekableChars, Type},
    phf::phf_map,
    std::fmt::{Display, Formatter, Result as FmtResult},
};

/// Tokens for the Kconfig language
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Token {
    StrLit(String),
    Symbol(String),

    Bool,
    Hex,
    Int,
    String,
    Tristate,

    DefBool,
    DefHex,
    DefInt,
    DefString,
    DefTristate,

    Choice,
    Comment,
    Config,
    EndChoice,
    Help,
    Mainmenu,
    Menu,
    EndMenu,
    MenuConfig,
    Modules,
    Prompt,

    Default,
    Depends,
    Imply,
    Option,
    Optional,
    Range,
    Select,
    Transitional,
    Visible,

    Source,
    RSource,
    OSource,
    ORSource,

    LParen,
    RParen,

    If,
    EndIf,
    On,

    Not,
    Ne,
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
    And,
    Or,
}

/// A token with location information.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocToken {
    /// The token.
    pub token: Token,

    /// The location of the token.
    pub location: Location,
}

impl Token {
    /// Indicates whether this is a type token.
    #[inline(always)]
    pub fn is_type(&self) -> bool {
        matches!(self, Self::Bool | Self::Int | Self::Hex | Self::String | Self::Tristate)
    }

    /// Indicates whether this is a `def_<type>` token.
    #[inline(always)]
    pub fn is_def_type(&self) -> bool {
        matches!(self, Self::DefBool | Self::DefHex | Self::DefInt | Self::DefString | Self::DefTristate)
    }

    /// Indicates whether this is a relative source token.
    #[inline(always)]
    pub fn is_relative_source(&self) -> bool {
        matches!(self, Self::ORSource | Self::RSource)
    }

    /// Indicates whether this is an optional source token.
    #[inline(always)]
    pub fn is_optional_source(&self) -> bool {
        matches!(self, Self::OSource | Self::ORSource)
    }

    /// Indicates whether this is a comparison token.
    #[inline(always)]
    pub fn is_cmp(&self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }

    /// Indicates whether this is a source token.
    #[inline(always)]
    pub fn is_source(&self) -> bool {
        matches!(self, Self::ORSource | Self::OSource | Self::RSource | Self::Source)
    }

    /// Returns the symbol name or `None` if this isn't a symbol.
    pub fn symbol_value(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the string literal value or `None` if this isn't a string literal.
    pub fn string_literal_value(&self) -> Option<&str> {
        match self {
            Self::StrLit(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the type value or `None` if this isn't a type or `def_<type>` token.
    pub fn r#type(&self) -> Option<Type> {
        match self {
            Self::Bool | Self::DefBool => Some(Type::Bool),
            Self::Hex | Self::DefHex => Some(Type::Hex),
            Self::Int | Self::DefInt => Some(Type::Int),
            Self::String | Self::DefString => Some(Type::String),
            Self::Tristate | Self::DefTristate => Some(Type::Tristate),
            _ => None,
        }
    }
}

/// Return a token for the given string.
static KEYWORDS: phf::Map<&'static str, Token> = phf_map! {
    "---help---" => Token::Help,
    "bool" => Token::Bool,
    "boolean" => Token::Bool,
    "choice" => Token::Choice,
    "comment" => Token::Comment,
    "config" => Token::Config,
    "def_bool" => Token::DefBool,
    "def_hex" => Token::DefHex,
    "def_int" => Token::DefInt,
    "def_string" => Token::DefString,
    "def_tristate" => Token::DefTristate,
    "default" => Token::Default,
    "depends" => Token::Depends,
    "endchoice" => Token::EndChoice,
    "endif" => Token::EndIf,
    "endmenu" => Token::EndMenu,
    "grsource" => Token::ORSource,
    "gsource" => Token::OSource,
    "help" => Token::Help,
    "hex" => Token::Hex,
    "if" => Token::If,
    "imply" => Token::Imply,
    "int" => Token::Int,
    "mainmenu" => Token::Mainmenu,
    "menu" => Token::Menu,
    "menuconfig" => Token::MenuConfig,
    "modules" => Token::Modules,
    "on" => Token::On,
    "option" => Token::Option,
    "optional" => Token::Optional,
    "orsource" => Token::ORSource,
    "osource" => Token::OSource,
    "prompt" => Token::Prompt,
    "range" => Token::Range,
    "rsource" => Token::RSource,
    "select" => Token::Select,
    "source" => Token::Source,
    "string" => Token::String,
    "transitional" => Token::Transitional,
    "tristate" => Token::Tristate,
    "visible" => Token::Visible,
};

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::StrLit(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => f.write_str(s),

            Self::Bool => f.write_str("bool"),
            Self::Hex => f.write_str("hex"),
            Self::Int => f.write_str("int"),
            Self::String => f.write_str("string"),
            Self::Tristate => f.write_str("tristate"),

            Self::DefBool => f.write_str("def_bool"),
            Self::DefHex => f.write_str("def_hex"),
            Self::DefInt => f.write_str("def_int"),
            Self::DefString => f.write_str("def_string"),
            Self::DefTristate => f.write_str("def_tristate"),

            Self::Choice => f.write_str("choice"),
            Self::Comment => f.write_str("comment"),
            Self::Config => f.write_str("config"),
            Self::EndChoice => f.write_str("endchoice"),
            Self::Help => f.write_str("help"),
            Self::Mainmenu => f.write_str("mainmenu"),
            Self::Menu => f.write_str("menu"),
            Self::EndMenu => f.write_str("endmenu"),
            Self::MenuConfig => f.write_str("menuconfig"),
            Self::Modules => f.write_str("modules"),
            Self::Prompt => f.write_str("prompt"),

            Self::Default => f.write_str("default"),
            Self::Depends => f.write_str("depends"),
            Self::Imply => f.write_str("imply"),
            Self::Option => f.write_str("option"),
            Self::Optional => f.write_str("optional"),
            Self::Range => f.write_str("range"),
            Self::Select => f.write_str("select"),
            Self::Transitional => f.write_str("transitional"),
            Self::Visible => f.write_str("visible"),

            Self::Source => f.write_str("source"),
            Self::RSource => f.write_str("rsource"),
            Self::OSource => f.write_str("osource"),
            Self::ORSource => f.write_str("orsource"),

            Self::If => f.write_str("if"),
            Self::EndIf => f.write_str("endif"),
            Self::On => f.write_str("on"),

            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::Not => f.write_str("!"),
            Self::Ne => f.write_str("!="),
            Self::Eq => f.write_str("="),
            Self::Ge => f.write_str(">="),
            Self::Gt => f.write_str(">"),
            Self::Le => f.write_str("<="),
            Self::Lt => f.write_str("<"),
            Self::And => f.write_str("&&"),
            Self::Or => f.write_str("||"),
        }
    }
}

impl LocToken {
    /// Create a new located token.
    pub fn new(token: Token, location: Location) -> Self {
        Self {
            token,
            location,
        }
    }

    /// Returns the symbol name or `None` if this isn't a symbol.
    #[inline(always)]
    pub fn symbol_value(&self) -> Option<&str> {
        self.token.symbol_value()
    }

    /// Returns the string literal value or `None` if this isn't a string literal.
    #[inline(always)]
    pub fn string_literal_value(&self) -> Option<&str> {
        self.token.string_literal_value()
    }
}

impl Located for LocToken {
    fn location(&self) -> Location {
        self.location
    }
}

impl Display for LocToken {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        Display::fmt(&self.token, f)
    }
}

/// Characters allowed in unquoted words: symbol names, numbers and the `---help---` keyword.
#[inline(always)]
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | '.' | '-')
}

pub(crate) fn parse_keyword_or_symbol(chars: &mut PeekableChars) -> Result<LocToken, KConfigError> {
    let start = chars.location();
    let word = chars.read_until(|c: char| !is_word_char(c));

    if word.is_empty() {
        return match chars.peek() {
            Some(c) => Err(KConfigError::unexpected(c, Expected::Symbol, start)),
            None => Err(KConfigError::unexpected_eof(Expected::Symbol, start)),
        };
    }

    let token = match KEYWORDS.get(word) {
        Some(kw) => kw.clone(),
        None => Token::Symbol(word.to_string()),
    };

    Ok(LocToken::new(token, start))
}
