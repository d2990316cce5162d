//! Per-level output templates.
//!
//! Templates are expanded in two stages. [PrintFormat::generate] substitutes the level parameters (indents,
//! separator line and separator) and keeps the node placeholders (`{prompt}`, `{help}`, `{help_line}`,
//! `{config}`, `{filename}`, `{linenr}`) for [fill] to substitute while rendering. `{{` and `}}` are literal
//! braces in both stages.

use {
    crate::{ExplainError, OptionRegistry},
    log::trace,
};

/// Placeholders substituted per node while rendering.
const NODE_PLACEHOLDERS: [&str; 6] = ["prompt", "help", "help_line", "config", "filename", "linenr"];

/// The renderer switches, copied from the options when the formats are generated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RenderFlags {
    /// Print the comment lines preceding each assignment.
    pub print_comment: bool,

    /// Print help text.
    pub print_help: bool,

    /// Print the file and line each node is defined at.
    pub print_location: bool,

    /// Print a config line for every rendered node, synthesized when there is no assignment.
    pub print_orig_config: bool,

    /// Print every member of a choice that is printed.
    pub print_choice_item: bool,

    /// Print every symbol of a run of sibling symbols if any of them is defined.
    pub print_same_level_item: bool,

    /// Rendering starts with the top node at level 0 unless this is 1.
    pub print_first_level: i64,
}

impl RenderFlags {
    /// Read the flags from the options.
    pub fn from_options(options: &OptionRegistry) -> Self {
        Self {
            print_comment: options.get_bool("print_comment", false),
            print_help: options.get_bool("print_help", false),
            print_location: options.get_bool("print_location", false),
            print_orig_config: options.get_bool("print_orig_config", false),
            print_choice_item: options.get_bool("print_choice_item", false),
            print_same_level_item: options.get_bool("print_same_level_item", false),
            print_first_level: options.get_int("print_first_level", 1),
        }
    }
}

/// Templates for each level of the tree.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PrintFormat {
    /// The renderer switches.
    pub flags: RenderFlags,

    prompt: Vec<String>,
    menu_end: Vec<String>,
    help: Vec<String>,
    help_line: Vec<String>,
    location: Vec<String>,
    orig_config: Vec<String>,
}

impl PrintFormat {
    /// Expand the format options for levels `0..level_size`.
    pub fn generate(options: &OptionRegistry, level_size: usize) -> Result<Self, ExplainError> {
        let max_column = usize::try_from(options.get_int("print_max_column", 80)).unwrap_or(0);
        let first_level = usize::try_from(options.get_int("print_first_level", 1)).ok();
        let separator_chars = options.get_list("separator_char_list", &[]);
        let prompt_indent_char = options.get_str("prompt_indent_char", "#");
        let separator_indent_char = options.get_str("separator_indent_char", "#");
        let info_indent_char = options.get_str("info_indent_char", "#");

        let mut format = Self {
            flags: RenderFlags::from_options(options),
            ..Self::default()
        };

        for level in 0..level_size {
            let separator_char = first_level
                .and_then(|first| level.checked_sub(first))
                .and_then(|i| separator_chars.get(i))
                .map(String::as_str)
                .unwrap_or_default();

            let mut params = vec![
                ("prompt_indent", escape_braces(&prompt_indent_char.repeat(level))),
                ("separator_indent", escape_braces(&separator_indent_char.repeat(level))),
                ("info_indent", escape_braces(&info_indent_char.repeat(level))),
                ("separator_line", escape_braces(&separator_char.repeat(max_column))),
            ];

            let separator = expand(options, "separator_format", &params)?;
            params.push(("separator", separator.chars().take(max_column.saturating_sub(1)).collect()));

            format.prompt.push(expand(options, "prompt_format", &params)?);
            format.menu_end.push(expand(options, "menu_end_format", &params)?);
            format.help.push(expand(options, "help_format", &params)?);
            format.help_line.push(expand(options, "help_line_format", &params)?);
            format.location.push(expand(options, "location_format", &params)?);
            format.orig_config.push(expand(options, "orig_config_format", &params)?);
        }

        trace!("Generated formats for {level_size} levels: {format:?}");
        Ok(format)
    }

    /// The number of levels templates were generated for.
    pub fn level_size(&self) -> usize {
        self.prompt.len()
    }

    /// The prompt banner for a level; takes `{prompt}`.
    pub fn prompt(&self, level: usize) -> &str {
        at(&self.prompt, level)
    }

    /// The end-of-menu banner for a level; takes `{prompt}`.
    pub fn menu_end(&self, level: usize) -> &str {
        at(&self.menu_end, level)
    }

    /// The help block for a level; takes `{help}`, the help lines formatted with [help_line][Self::help_line].
    pub fn help(&self, level: usize) -> &str {
        at(&self.help, level)
    }

    /// A help text line for a level; takes `{help_line}`.
    pub fn help_line(&self, level: usize) -> &str {
        at(&self.help_line, level)
    }

    /// The location line for a level; takes `{filename}` and `{linenr}`.
    pub fn location(&self, level: usize) -> &str {
        at(&self.location, level)
    }

    /// The synthesized config line for a level; takes `{config}`.
    pub fn orig_config(&self, level: usize) -> &str {
        at(&self.orig_config, level)
    }
}

fn at(formats: &[String], level: usize) -> &str {
    formats.get(level).map(String::as_str).unwrap_or_default()
}

fn escape_braces(s: &str) -> String {
    s.replace('{', "{{").replace('}', "}}")
}

/// Expand the level parameters in the template held by option `name`.
fn expand(options: &OptionRegistry, name: &str, params: &[(&str, String)]) -> Result<String, ExplainError> {
    let template = options.get_str(name, "");
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                result.push_str("{{");
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                result.push_str("}}");
            }
            '{' => {
                let mut placeholder = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(ExplainError::invalid_template(name, "unbalanced '{'")),
                        Some(c) => placeholder.push(c),
                    }
                }

                if let Some((_, value)) = params.iter().find(|(p, _)| *p == placeholder) {
                    result.push_str(value);
                } else if NODE_PLACEHOLDERS.contains(&placeholder.as_str()) {
                    result.push('{');
                    result.push_str(&placeholder);
                    result.push('}');
                } else {
                    return Err(ExplainError::invalid_template(name, format!("unknown placeholder {{{placeholder}}}")));
                }
            }
            '}' => return Err(ExplainError::invalid_template(name, "unbalanced '}'")),
            c => result.push(c),
        }
    }

    Ok(result)
}

/// Substitute node values into a generated template. Placeholders without a value are left as they are.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            result.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if let Some(end) = tail.strip_prefix('{').and_then(|t| t.find('}')) {
            let placeholder = &tail[1..end + 1];
            match values.iter().find(|(p, _)| *p == placeholder) {
                Some((_, value)) => result.push_str(value),
                None => result.push_str(&tail[..end + 2]),
            }
            rest = &tail[end + 2..];
        } else {
            result.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use {
        super::{fill, PrintFormat},
        crate::OptionRegistry,
    };

    #[test]
    fn default_formats() {
        let format = PrintFormat::generate(&OptionRegistry::defaults(), 3).unwrap();
        assert_eq!(format.level_size(), 3);
        assert_eq!(format.prompt(0), "# \n# {prompt}\n# ");
        assert_eq!(format.prompt(1), "## \n## {prompt}\n## ");
        assert_eq!(format.prompt(2), "### \n### {prompt}\n### ");
        assert_eq!(format.menu_end(1), "## end of {prompt}\n");
        assert_eq!(format.help(2), "### help\n{help}\n###");
        assert_eq!(format.help_line(2), "###     {help_line}");
        assert_eq!(format.location(1), "## {filename} : {linenr}\n##");
        assert_eq!(format.orig_config(2), "### {config}");
        assert_eq!(format.prompt(3), "");
        assert_eq!(format.flags.print_first_level, 1);
        assert!(!format.flags.print_help);
    }

    #[test]
    fn separators() {
        let mut options = OptionRegistry::defaults();
        options.set("print_max_column", 10i64).unwrap();
        options.set("separator_char_list", vec!["=", "-"]).unwrap();
        let format = PrintFormat::generate(&options, 4).unwrap();

        assert_eq!(format.prompt(0), "# \n# {prompt}\n# ");
        assert_eq!(format.prompt(1), "## =======\n## {prompt}\n## =======");
        assert_eq!(format.prompt(2), "### ------\n### {prompt}\n### ------");
        assert_eq!(format.prompt(3), "#### \n#### {prompt}\n#### ");

        options.set("print_first_level", 0i64).unwrap();
        let format = PrintFormat::generate(&options, 2).unwrap();
        assert_eq!(format.prompt(0), "# ========\n# {prompt}\n# ========");
        assert_eq!(format.flags.print_first_level, 0);
    }

    #[test]
    fn idempotent() {
        let mut options = OptionRegistry::defaults();
        options.set("separator_char_list", vec!["*"]).unwrap();
        options.set("print_help", true).unwrap();
        let first = PrintFormat::generate(&options, 5).unwrap();
        let second = PrintFormat::generate(&options, 5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_templates() {
        for (name, template) in [
            ("prompt_format", "{bogus}"),
            ("help_format", "{help"),
            ("menu_end_format", "end }"),
            ("separator_format", "{separator}"),
        ] {
            let mut options = OptionRegistry::defaults();
            options.set(name, template).unwrap();
            let err = PrintFormat::generate(&options, 2).unwrap_err();
            assert!(err.is_invalid_template(), "{name}: {err}");
            assert!(err.to_string().contains(name));
        }

        // Nothing is expanded without levels.
        let mut options = OptionRegistry::defaults();
        options.set("prompt_format", "{bogus}").unwrap();
        assert!(PrintFormat::generate(&options, 0).is_ok());
    }

    #[test]
    fn literal_braces() {
        let mut options = OptionRegistry::defaults();
        options.set("orig_config_format", "{{{config}}} {{x}}").unwrap();
        options.set("info_indent_char", "{").unwrap();
        let format = PrintFormat::generate(&options, 2).unwrap();
        assert_eq!(format.orig_config(1), "{{{config}}} {{x}}");
        assert_eq!(fill(format.orig_config(1), &[("config", "CONFIG_A=y")]), "{CONFIG_A=y} {x}");

        options.set("location_format", "{info_indent}{filename}").unwrap();
        let format = PrintFormat::generate(&options, 2).unwrap();
        assert_eq!(fill(format.location(1), &[("filename", "Kconfig")]), "{Kconfig");
    }

    #[test]
    fn filling() {
        assert_eq!(fill("## {prompt}", &[("prompt", "Main {menu}")]), "## Main {menu}");
        assert_eq!(fill("{filename} : {linenr}", &[("filename", "Kconfig"), ("linenr", "3")]), "Kconfig : 3");
        assert_eq!(fill("{help} {prompt}", &[("prompt", "x")]), "{help} x");
        assert_eq!(fill("open { end", &[]), "open { end");
    }
}
