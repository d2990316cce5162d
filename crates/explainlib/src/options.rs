//! Named rendering and behaviour options.

use {
    crate::{ExplainError, WarningFlags},
    once_cell::sync::Lazy,
    std::{
        fmt::{Display, Formatter, Result as FmtResult},
        str::FromStr,
    },
};

/// The value of an option. The variant is fixed per option by the catalog.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OptionValue {
    /// A yes/no flag.
    Bool(bool),

    /// An integer.
    Int(i64),

    /// A string, such as an indent character or a format template.
    Str(String),

    /// An ordered list of strings.
    List(Vec<String>),
}

impl Display for OptionValue {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Bool(true) => f.write_str("yes"),
            Self::Bool(false) => f.write_str("no"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
            Self::List(l) => write!(f, "[{}]", l.join(",")),
        }
    }
}

/// A value offered to [OptionRegistry::set], coerced to the option's type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OptionInput {
    /// A boolean.
    Bool(bool),

    /// An integer.
    Int(i64),

    /// A string. Boolean options accept `y`/`yes`/`true` and `n`/`no`/`false`; integer options accept decimal
    /// text; list options append it.
    Str(String),

    /// A list; replaces the value of a list option.
    List(Vec<String>),

    /// Clears a list option.
    None,
}

impl Display for OptionInput {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
            Self::List(l) => write!(f, "[{}]", l.join(",")),
            Self::None => f.write_str("None"),
        }
    }
}

impl From<bool> for OptionInput {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for OptionInput {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for OptionInput {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for OptionInput {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Vec<String>> for OptionInput {
    fn from(l: Vec<String>) -> Self {
        Self::List(l)
    }
}

impl From<Vec<&str>> for OptionInput {
    fn from(l: Vec<&str>) -> Self {
        Self::List(l.into_iter().map(String::from).collect())
    }
}

impl<T: Into<OptionInput>> From<Option<T>> for OptionInput {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(Self::None)
    }
}

/// A registered option.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OptionEntry {
    /// The option name, with underscores.
    pub name: &'static str,

    /// The current value.
    pub value: OptionValue,

    /// One-line description.
    pub help: &'static str,
}

fn bool_entry(name: &'static str, value: bool, help: &'static str) -> OptionEntry {
    OptionEntry {
        name,
        value: OptionValue::Bool(value),
        help,
    }
}

fn str_entry(name: &'static str, value: &str, help: &'static str) -> OptionEntry {
    OptionEntry {
        name,
        value: OptionValue::Str(value.to_string()),
        help,
    }
}

static DEFAULT_OPTIONS: Lazy<Vec<OptionEntry>> = Lazy::new(|| {
    vec![
        bool_entry("warnings", false, "print warning"),
        bool_entry("stderr_warnings", false, "print warning to stderr"),
        bool_entry("undef_warnings", false, "print undef warning"),
        bool_entry("override_warnings", false, "print override warning"),
        bool_entry("redun_warnings", false, "print redun warning"),
        OptionEntry {
            name: "print_first_level",
            value: OptionValue::Int(1),
            help: "print first level",
        },
        OptionEntry {
            name: "print_max_column",
            value: OptionValue::Int(80),
            help: "print max column",
        },
        bool_entry("print_comment", false, "print prompt with comment"),
        bool_entry("print_help", false, "print prompt with help"),
        bool_entry("print_location", false, "print prompt with location"),
        bool_entry("print_orig_config", false, "print prompt with original config"),
        bool_entry("print_choice_item", false, "print choice item"),
        bool_entry("print_same_level_item", false, "print same level as defined config"),
        str_entry("prompt_indent_char", "#", "prompt indent char"),
        str_entry("separator_indent_char", "#", "separator indent char"),
        str_entry("info_indent_char", "#", "info indent char"),
        OptionEntry {
            name: "separator_char_list",
            value: OptionValue::List(Vec::new()),
            help: "separator char list",
        },
        str_entry("separator_format", "{separator_indent} {separator_line}", "separator format"),
        str_entry("prompt_format", "#{separator}\n#{prompt_indent} {prompt}\n#{separator}", "prompt format"),
        str_entry("help_format", "#{info_indent} help\n{help}\n#{info_indent}", "help format"),
        str_entry("help_line_format", "#{info_indent}     {help_line}", "help line format"),
        str_entry("orig_config_format", "#{info_indent} {config}", "orig config format"),
        str_entry("location_format", "#{info_indent} {filename} : {linenr}\n#{info_indent}", "location format"),
        str_entry("menu_end_format", "#{prompt_indent} end of {prompt}\n", "menu end format"),
    ]
});

/// Option names are accepted with dashes in place of underscores.
fn normalize(name: &str) -> String {
    name.replace('-', "_")
}

/// The catalog of options and their current values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OptionRegistry {
    entries: Vec<OptionEntry>,
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}

impl OptionRegistry {
    /// The full catalog with every option at its default value.
    pub fn defaults() -> Self {
        Self {
            entries: DEFAULT_OPTIONS.clone(),
        }
    }

    /// Iterate over the options in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = &OptionEntry> {
        self.entries.iter()
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut OptionEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    /// Returns the current value of an option.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        let name = normalize(name);
        self.entries.iter().find(|e| e.name == name).map(|e| &e.value)
    }

    /// Returns a boolean option, or `fallback` if there is no boolean option with this name.
    pub fn get_bool(&self, name: &str, fallback: bool) -> bool {
        match self.get(name) {
            Some(OptionValue::Bool(b)) => *b,
            _ => fallback,
        }
    }

    /// Returns an integer option, or `fallback` if there is no integer option with this name.
    pub fn get_int(&self, name: &str, fallback: i64) -> i64 {
        match self.get(name) {
            Some(OptionValue::Int(i)) => *i,
            _ => fallback,
        }
    }

    /// Returns a string option, or `fallback` if there is no string option with this name.
    pub fn get_str<'a>(&'a self, name: &str, fallback: &'a str) -> &'a str {
        match self.get(name) {
            Some(OptionValue::Str(s)) => s,
            _ => fallback,
        }
    }

    /// Returns a list option, or `fallback` if there is no list option with this name.
    pub fn get_list<'a>(&'a self, name: &str, fallback: &'a [String]) -> &'a [String] {
        match self.get(name) {
            Some(OptionValue::List(l)) => l,
            _ => fallback,
        }
    }

    /// Indicates whether `name` is a list option.
    pub fn is_list(&self, name: &str) -> bool {
        matches!(self.get(name), Some(OptionValue::List(_)))
    }

    /// Change an option, coercing the value to the option's type.
    pub fn set(&mut self, name: &str, value: impl Into<OptionInput>) -> Result<(), ExplainError> {
        let name = normalize(name);
        let value = value.into();
        let entry = self.entry_mut(&name).ok_or_else(|| ExplainError::unknown_option(&name))?;

        let new_value = match (&entry.value, value) {
            (OptionValue::Bool(_), OptionInput::Bool(b)) => OptionValue::Bool(b),
            (OptionValue::Bool(_), OptionInput::Str(s)) => match s.to_lowercase().as_str() {
                "y" | "yes" | "true" => OptionValue::Bool(true),
                "n" | "no" | "false" => OptionValue::Bool(false),
                _ => return Err(ExplainError::invalid_option_value(&name, s)),
            },
            (OptionValue::Int(_), OptionInput::Int(i)) => OptionValue::Int(i),
            (OptionValue::Int(_), OptionInput::Str(s)) => match s.trim().parse() {
                Ok(i) => OptionValue::Int(i),
                Err(_) => return Err(ExplainError::invalid_option_value(&name, s)),
            },
            (OptionValue::Str(_), OptionInput::Str(s)) => OptionValue::Str(s),
            (OptionValue::List(_), OptionInput::None) => OptionValue::List(Vec::new()),
            (OptionValue::List(_), OptionInput::List(l)) => OptionValue::List(l),
            (OptionValue::List(old), OptionInput::Str(s)) => {
                let mut l = old.clone();
                l.push(s);
                OptionValue::List(l)
            }
            (_, value) => return Err(ExplainError::invalid_option_value(&name, value)),
        };

        entry.value = new_value;
        Ok(())
    }

    /// Apply [set][Self::set] to each entry in order.
    ///
    /// This stops at the first failure. Entries before it remain applied.
    pub fn set_many<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>) -> Result<(), ExplainError>
    where
        K: AsRef<str>,
        V: Into<OptionInput>,
    {
        for (name, value) in values {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// The Kconfig warning settings selected by the `*warnings` options.
    pub fn warning_flags(&self) -> WarningFlags {
        WarningFlags {
            enabled: self.get_bool("warnings", false),
            to_stderr: self.get_bool("stderr_warnings", false),
            undef: self.get_bool("undef_warnings", false),
            override_: self.get_bool("override_warnings", false),
            redun: self.get_bool("redun_warnings", false),
        }
    }

    /// A table of every option with its description and default value.
    pub fn help_table(&self) -> String {
        let rows: Vec<(&str, &str, String)> = self
            .entries
            .iter()
            .map(|e| {
                let default = match &e.value {
                    OptionValue::Str(_) => "...".to_string(),
                    other => other.to_string(),
                };
                (e.name, e.help, default)
            })
            .collect();

        let name_width = rows.iter().map(|r| r.0.len()).chain(Some("KEY".len())).max().unwrap_or_default();
        let help_width = rows.iter().map(|r| r.1.len()).chain(Some("DESCRIPTION".len())).max().unwrap_or_default();
        let default_width = rows.iter().map(|r| r.2.len()).chain(Some("DEFAULT".len())).max().unwrap_or_default();

        let mut table = format!(
            "| {:name_width$} | {:help_width$} | {:>default_width$} |\n",
            "KEY", "DESCRIPTION", "DEFAULT"
        );
        table.push_str(&format!(
            "|-{}-|-{}-|-{}-|\n",
            "-".repeat(name_width),
            "-".repeat(help_width),
            "-".repeat(default_width)
        ));

        for (name, help, default) in &rows {
            table.push_str(&format!("| {name:name_width$} | {help:help_width$} | {default:>default_width$} |\n"));
        }

        table
    }
}

/// An option given on the command line as `KEY` or `KEY=VALUE`. `KEY` alone means `KEY=yes`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OptionSetting {
    /// The option name, with dashes replaced by underscores.
    pub name: String,

    /// The value as given.
    pub value: String,
}

impl FromStr for OptionSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        let (name, value) = s.split_once('=').unwrap_or((s, "yes"));
        if name.is_empty() {
            return Err(format!("missing option name in '{s}'"));
        }

        Ok(Self {
            name: normalize(name),
            value: value.to_string(),
        })
    }
}
