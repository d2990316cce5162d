use std::{
    collections::{BTreeMap, HashMap},
    env::VarError,
    path::PathBuf,
};

/// A trait for performing variable lookups.
pub trait Context {
    /// Returns the value of the given variable, or an error if the variable could not be found.
    fn var(&self, name: &str) -> Result<String, VarError>;
}

/// A [context][Context] that uses the environment for variable lookups.
pub struct SystemContext;

impl Context for SystemContext {
    fn var(&self, name: &str) -> Result<String, VarError> {
        std::env::var(name)
    }
}

impl Context for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Result<String, VarError> {
        self.get(name).cloned().ok_or(VarError::NotPresent)
    }
}

impl Context for HashMap<String, String> {
    fn var(&self, name: &str) -> Result<String, VarError> {
        self.get(name).cloned().ok_or(VarError::NotPresent)
    }
}

/// The build environment a kernel Kconfig tree is evaluated in.
///
/// Kconfig files reference `$(ARCH)`, `$(SRCARCH)`, `$(CC)`, `$(LD)` and `$(srctree)`. These are passed
/// explicitly rather than read from the process environment.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BuildEnv {
    /// Target architecture (`ARCH`).
    pub arch: String,

    /// Source architecture directory (`SRCARCH`).
    pub srcarch: String,

    /// Cross compiler prefix (`CROSS_COMPILE`).
    pub cross_compile: String,

    /// C compiler command (`CC`).
    pub cc: String,

    /// Linker command (`LD`).
    pub ld: String,

    /// Root of the source tree (`srctree`).
    pub srctree: PathBuf,

    /// Additional variables.
    pub vars: BTreeMap<String, String>,
}

impl BuildEnv {
    /// Create a build environment for `arch`.
    ///
    /// `SRCARCH` is derived from `arch` unless given. `cc` and `ld` default to `gcc` and `ld` and are
    /// prefixed with `cross_compile` unless they already start with it.
    pub fn new(
        arch: &str,
        srcarch: Option<&str>,
        cross_compile: &str,
        cc: Option<&str>,
        ld: Option<&str>,
        srctree: impl Into<PathBuf>,
    ) -> Self {
        Self {
            arch: arch.to_string(),
            srcarch: srcarch.map(str::to_string).unwrap_or_else(|| srcarch_for(arch).to_string()),
            cross_compile: cross_compile.to_string(),
            cc: with_prefix(cross_compile, cc.unwrap_or("gcc")),
            ld: with_prefix(cross_compile, ld.unwrap_or("ld")),
            srctree: srctree.into(),
            vars: BTreeMap::new(),
        }
    }

    /// Add a variable to the environment.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Context for BuildEnv {
    fn var(&self, name: &str) -> Result<String, VarError> {
        match name {
            "ARCH" => Ok(self.arch.clone()),
            "SRCARCH" => Ok(self.srcarch.clone()),
            "CROSS_COMPILE" => Ok(self.cross_compile.clone()),
            "CC" => Ok(self.cc.clone()),
            "LD" => Ok(self.ld.clone()),
            "srctree" => Ok(self.srctree.to_string_lossy().into_owned()),
            _ => self.vars.var(name),
        }
    }
}

/// Returns the source architecture directory for a kernel `ARCH` value.
pub fn srcarch_for(arch: &str) -> &str {
    match arch {
        "i386" | "x86_64" => "x86",
        "sparc32" | "sparc64" => "sparc",
        "parisc64" => "parisc",
        _ => arch,
    }
}

fn with_prefix(prefix: &str, command: &str) -> String {
    if command.starts_with(prefix) {
        command.to_string()
    } else {
        format!("{prefix}{command}")
    }
}

/// Create a closure around a context for [`env_with_context`][shellexpand::env_with_context].
pub(crate) fn context_closure<C>(context: &C) -> impl Fn(&str) -> Result<Option<String>, VarError> + '_
where
    C: Context + ?Sized,
{
    move |var| context.var(var).map(Some)
}

#[cfg(test)]
mod tests {
    use {
        super::{srcarch_for, BuildEnv, Context},
        std::env::VarError,
    };

    #[test]
    fn srcarch_mapping() {
        assert_eq!(srcarch_for("x86_64"), "x86");
        assert_eq!(srcarch_for("i386"), "x86");
        assert_eq!(srcarch_for("sparc64"), "sparc");
        assert_eq!(srcarch_for("parisc64"), "parisc");
        assert_eq!(srcarch_for("arm64"), "arm64");
    }

    #[test]
    fn toolchain_prefix() {
        let env = BuildEnv::new("arm64", None, "aarch64-linux-gnu-", None, Some("aarch64-linux-gnu-ld.bfd"), ".");
        assert_eq!(env.cc, "aarch64-linux-gnu-gcc");
        assert_eq!(env.ld, "aarch64-linux-gnu-ld.bfd");
        assert_eq!(env.var("SRCARCH").unwrap(), "arm64");

        let env = BuildEnv::new("x86_64", Some("um"), "", Some("clang"), None, "/src").with_var("KERNELVERSION", "6.8");
        assert_eq!(env.cc, "clang");
        assert_eq!(env.var("SRCARCH").unwrap(), "um");
        assert_eq!(env.var("srctree").unwrap(), "/src");
        assert_eq!(env.var("KERNELVERSION").unwrap(), "6.8");
        assert_eq!(env.var("HOME"), Err(VarError::NotPresent));
    }
}
