//! Kconfig preprocessor: variable assignments and `$(...)` references.

use {
    crate::{
        parser::{KConfigError, Location},
        Context,
    },
    log::{debug, info, trace, warn},
    std::{
        collections::HashMap,
        env::VarError,
        process::{Command, Stdio},
    },
};

const MAX_EXPANSION_DEPTH: usize = 100;

/// Context variables exported to commands run by `$(shell,...)` and friends.
const EXPORTED_VARS: [&str; 6] = ["ARCH", "SRCARCH", "CROSS_COMPILE", "CC", "LD", "srctree"];

#[derive(Clone, Debug)]
struct Variable {
    value: String,
    recursive: bool,
}

/// Expands `$(...)` references and records variable assignments.
///
/// Assignments take the forms `NAME := value` (expanded immediately), `NAME = value` (expanded on each use)
/// and `NAME += value`. A reference `$(NAME)` resolves to a variable, falling back to the context, and expands
/// to an empty string if neither defines it. `$(NAME,arg,...)` calls a user-defined function, substituting
/// `$(1)`, `$(2)`, ... in its body.
///
/// The built-ins `$(shell,cmd)`, `$(success,cmd)`, `$(failure,cmd)` and `$(if-success,cmd,then,else)` run `cmd`
/// with `sh -c`, with the build variables of the context ([EXPORTED_VARS]) in its environment.
pub struct Preprocessor<'ctx> {
    context: &'ctx dyn Context,
    variables: HashMap<String, Variable>,
}

impl<'ctx> Preprocessor<'ctx> {
    /// Create a preprocessor resolving unknown variables against `context`.
    pub fn new(context: &'ctx dyn Context) -> Self {
        Self {
            context,
            variables: HashMap::new(),
        }
    }

    /// Returns the current value of a variable, unexpanded.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|v| v.value.as_str())
    }

    /// If `line` is a variable assignment, record it and return `true`.
    pub fn try_assignment(&mut self, line: &str, location: Location) -> Result<bool, KConfigError> {
        let name_len = line.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-')).unwrap_or(line.len());
        if name_len == 0 {
            return Ok(false);
        }

        let name = &line[..name_len];
        let rest = line[name_len..].trim_start();

        let (op, value) = if let Some(value) = rest.strip_prefix(":=") {
            (":=", value)
        } else if let Some(value) = rest.strip_prefix("+=") {
            ("+=", value)
        } else if let Some(value) = rest.strip_prefix('=') {
            ("=", value)
        } else {
            return Ok(false);
        };

        let value = value.trim();

        let variable = match (op, self.variables.get(name)) {
            (":=", _) => Variable {
                value: self.expand(value, location)?,
                recursive: false,
            },
            ("+=", Some(old)) => {
                let appended = if old.recursive {
                    value.to_string()
                } else {
                    self.expand(value, location)?
                };
                Variable {
                    value: join_words(&old.value, &appended),
                    recursive: old.recursive,
                }
            }
            _ => Variable {
                value: value.to_string(),
                recursive: true,
            },
        };

        trace!("{location}: {name} {op} {:?}", variable.value);
        self.variables.insert(name.to_string(), variable);
        Ok(true)
    }

    /// Expand all `$(...)` references in `text`.
    pub fn expand(&self, text: &str, location: Location) -> Result<String, KConfigError> {
        self.expand_with(text, &[], location, 0)
    }

    fn expand_with(&self, text: &str, args: &[String], location: Location, depth: usize) -> Result<String, KConfigError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(KConfigError::syntax(format!("recursive macro expansion in {text:?}"), location));
        }

        let mut result = String::with_capacity(text.len());
        let mut pos = 0;

        while let Some(start) = text[pos..].find("$(") {
            result.push_str(&text[pos..pos + start]);
            let (value, end) = self.expand_reference(text, pos + start + 2, args, location, depth)?;
            result.push_str(&value);
            pos = end;
        }

        result.push_str(&text[pos..]);
        Ok(result)
    }

    /// Expand the reference whose body starts at `pos` (just after `$(`). Returns the expansion and the offset
    /// following the closing parenthesis.
    fn expand_reference(
        &self,
        text: &str,
        mut pos: usize,
        args: &[String],
        location: Location,
        depth: usize,
    ) -> Result<(String, usize), KConfigError> {
        let mut parts = Vec::new();
        let mut current = String::new();

        loop {
            let rest = &text[pos..];
            let Some(i) = rest.find(['$', ',', ')']) else {
                return Err(KConfigError::syntax(format!("unterminated reference in {text:?}"), location));
            };

            current.push_str(&rest[..i]);

            match rest[i..].chars().next() {
                Some('$') if rest[i..].starts_with("$(") => {
                    let (value, end) = self.expand_reference(text, pos + i + 2, args, location, depth + 1)?;
                    current.push_str(&value);
                    pos = end;
                }
                Some('$') => {
                    current.push('$');
                    pos += i + 1;
                }
                Some(',') => {
                    parts.push(std::mem::take(&mut current));
                    pos += i + 1;
                }
                _ => {
                    parts.push(current);
                    let value = self.call(&parts, args, location, depth)?;
                    return Ok((value, pos + i + 1));
                }
            }
        }
    }

    fn call(&self, parts: &[String], args: &[String], location: Location, depth: usize) -> Result<String, KConfigError> {
        let name = parts[0].as_str();
        let call_args = &parts[1..];

        if let Ok(n) = name.parse::<usize>() {
            return Ok(args.get(n).cloned().unwrap_or_default());
        }

        if let Some(variable) = self.variables.get(name) {
            if !variable.recursive && call_args.is_empty() {
                return Ok(variable.value.clone());
            }

            let fn_args: Vec<String> = parts.to_vec();
            return self.expand_with(&variable.value, &fn_args, location, depth + 1);
        }

        match name {
            "filename" => return Ok(location.filename.display().to_string()),
            "lineno" => return Ok(location.line.to_string()),
            _ => (),
        }

        if call_args.is_empty() {
            return match self.context.var(name) {
                Ok(value) => Ok(value),
                Err(VarError::NotPresent) => Ok(String::new()),
                Err(VarError::NotUnicode(_)) => Err(KConfigError::invalid_env(name, location)),
            };
        }

        match name {
            "info" => {
                info!("{location}: {}", call_args.join(","));
                Ok(String::new())
            }
            "warning-if" => {
                if call_args[0] == "y" {
                    warn!("{location}: {}", call_args[1..].join(","));
                }
                Ok(String::new())
            }
            "error-if" => {
                if call_args[0] == "y" {
                    Err(KConfigError::syntax(call_args[1..].join(","), location))
                } else {
                    Ok(String::new())
                }
            }
            "shell" => self.shell(&call_args.join(","), location),
            "success" => Ok(yes_no(self.succeeds(&call_args.join(","), location))),
            "failure" => Ok(yes_no(!self.succeeds(&call_args.join(","), location))),
            "if-success" => match call_args {
                [cmd, then, otherwise] => {
                    Ok(if self.succeeds(cmd, location) {
                        then.clone()
                    } else {
                        otherwise.clone()
                    })
                }
                _ => Err(KConfigError::syntax("if-success takes 3 arguments", location)),
            },
            _ => Err(KConfigError::syntax(format!("unknown function {name:?}"), location)),
        }
    }

    fn command(&self, cmd: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd).stdin(Stdio::null());

        for name in EXPORTED_VARS {
            if let Ok(value) = self.context.var(name) {
                command.env(name, value);
            }
        }

        command
    }

    /// Run `cmd` and return its output with newlines replaced by spaces.
    fn shell(&self, cmd: &str, location: Location) -> Result<String, KConfigError> {
        let output = match self.command(cmd).output() {
            Ok(output) => output,
            Err(e) => {
                warn!("{location}: unable to run {cmd:?}: {e}");
                return Ok(String::new());
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("{location}: {cmd:?}: {}", stderr.trim_end());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = stdout.lines().collect::<Vec<_>>().join(" ");
        debug!("{location}: $(shell,{cmd}) = {result:?}");
        Ok(result)
    }

    /// Run `cmd` with its output discarded and report whether it exited successfully.
    fn succeeds(&self, cmd: &str, location: Location) -> bool {
        let status = self.command(cmd).stdout(Stdio::null()).stderr(Stdio::null()).status();
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("{location}: unable to run {cmd:?}: {e}");
                false
            }
        }
    }
}

fn yes_no(b: bool) -> String {
    let value = if b {
        "y"
    } else {
        "n"
    };
    value.to_string()
}

fn join_words(lhs: &str, rhs: &str) -> String {
    match (lhs.is_empty(), rhs.is_empty()) {
        (true, _) => rhs.to_string(),
        (_, true) => lhs.to_string(),
        _ => format!("{lhs} {rhs}"),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::Preprocessor,
        crate::{parser::Location, BuildEnv},
        std::path::Path,
    };

    #[test]
    fn variables_and_context() {
        let env = BuildEnv::new("x86_64", None, "", None, None, "/src");
        let mut pp = Preprocessor::new(&env);
        let loc = Location::start_of(Path::new("Kconfig"));

        assert!(pp.try_assignment("ARCHDIR := arch/$(SRCARCH)", loc).unwrap());
        assert!(pp.try_assignment("LAZY = $(ARCHDIR)/Kconfig", loc).unwrap());
        assert!(pp.try_assignment("ARCHDIR := arch/um", loc).unwrap());
        assert!(pp.try_assignment("FLAGS := -a", loc).unwrap());
        assert!(pp.try_assignment("FLAGS += -b", loc).unwrap());
        assert!(!pp.try_assignment("config FOO", loc).unwrap());
        assert!(!pp.try_assignment("depends on A = B", loc).unwrap());

        assert_eq!(pp.expand("source \"$(LAZY)\"", loc).unwrap(), "source \"arch/um/Kconfig\"");
        assert_eq!(pp.expand("$(FLAGS)", loc).unwrap(), "-a -b");
        assert_eq!(pp.expand("$(CC) $(UNDEFINED)!", loc).unwrap(), "gcc !");
        assert!(pp.expand("$(CC", loc).is_err());
    }

    #[test]
    fn functions() {
        let env = BuildEnv::default();
        let mut pp = Preprocessor::new(&env);
        let loc = Location::start_of(Path::new("Kconfig"));

        assert!(pp.try_assignment("greet = hello $(1) and $(2)", loc).unwrap());
        assert_eq!(pp.expand("$(greet,a,b)", loc).unwrap(), "hello a and b");
        assert!(pp.expand("$(error-if,y,stop)", loc).is_err());
        assert!(pp.expand("$(no-such-fn,x)", loc).is_err());

        assert!(pp.try_assignment("self = $(self)", loc).unwrap());
        assert!(pp.expand("$(self)", loc).is_err());
    }

    #[test]
    fn commands() {
        let env = BuildEnv::new("arm64", None, "aarch64-linux-gnu-", None, None, "/src");
        let pp = Preprocessor::new(&env);
        let loc = Location::start_of(Path::new("Kconfig"));

        assert_eq!(pp.expand("$(shell,echo hi)", loc).unwrap(), "hi");
        assert_eq!(pp.expand("$(shell,printf 'a\\nb\\n')", loc).unwrap(), "a b");
        assert_eq!(
            pp.expand("$(shell,echo $CC $LD $SRCARCH)", loc).unwrap(),
            "aarch64-linux-gnu-gcc aarch64-linux-gnu-ld arm64"
        );
        assert_eq!(pp.expand("$(shell,false)", loc).unwrap(), "");

        assert_eq!(pp.expand("$(success,true)", loc).unwrap(), "y");
        assert_eq!(pp.expand("$(success,false)", loc).unwrap(), "n");
        assert_eq!(pp.expand("$(failure,false)", loc).unwrap(), "y");
        assert_eq!(pp.expand("$(failure,echo noise)", loc).unwrap(), "n");
        assert_eq!(pp.expand("$(if-success,true,yes,no)", loc).unwrap(), "yes");
        assert_eq!(pp.expand("$(if-success,test -n \"$CC\",has-cc,no-cc)", loc).unwrap(), "has-cc");
        assert_eq!(pp.expand("$(if-success,false,yes,no)", loc).unwrap(), "no");
        assert!(pp.expand("$(if-success,true,yes)", loc).is_err());
    }
}
