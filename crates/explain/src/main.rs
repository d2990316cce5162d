//! Add Kconfig prompts, help text and menu structure to defconfig files.

use {
    clap::Parser,
    defconfig_explainer_lib::{BuildEnv, DefconfigExplainer, ExplainError, OptionInput, OptionRegistry, OptionSetting},
    log::{error, warn},
    std::{
        fs::{remove_file, File},
        io::{stdout, BufWriter, Write},
        path::{Path, PathBuf},
        process::ExitCode,
    },
};

/// Command line options for the explainer.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Options {
    /// Defconfig files to explain.
    load_files: Vec<PathBuf>,

    /// Defconfig files to merge over the loaded files.
    #[arg(long, short, value_name = "FILE")]
    merge: Vec<PathBuf>,

    /// Configuration files that only supply values for symbols the explained files do not assign.
    #[arg(long, short, value_name = "FILE")]
    preload: Vec<PathBuf>,

    /// The top-level Kconfig file, relative to the source tree.
    #[arg(long, short, default_value = "Kconfig")]
    kconfig: PathBuf,

    /// Where to write the explained defconfig. Defaults to stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// The target architecture.
    #[arg(long, short, env = "ARCH")]
    arch: Option<String>,

    /// The architecture source directory. Derived from the architecture if not present.
    #[arg(long)]
    srcarch: Option<String>,

    /// The root of the source tree.
    #[arg(long, default_value = ".")]
    srctree: PathBuf,

    /// The cross compiler prefix.
    #[arg(long, env = "CROSS_COMPILE", default_value = "")]
    cross_compile: String,

    /// The C compiler.
    #[arg(long, env = "CC")]
    cc: Option<String>,

    /// The linker.
    #[arg(long, env = "LD")]
    ld: Option<String>,

    /// Use the recommended settings: original config lines, choice items and separator lines.
    #[arg(long, short)]
    recommended: bool,

    /// Set an explainer option. See --option-help.
    #[arg(long = "option", short = 'O', value_name = "KEY[=VALUE]")]
    options: Vec<OptionSetting>,

    /// List the explainer options and exit.
    #[arg(long)]
    option_help: bool,

    /// Print the build environment and the files being loaded.
    #[arg(long, short)]
    verbose: bool,
}

impl Options {
    /// The rendering options given by `-r` and `-O`, in order. Values for list options accumulate.
    fn print_format_params(&self, registry: &OptionRegistry) -> Result<Vec<(String, OptionInput)>, ExplainError> {
        let mut params: Vec<(String, OptionInput)> = Vec::new();

        if self.recommended {
            params.push(("print_orig_config".to_string(), OptionInput::Bool(true)));
            params.push(("print_choice_item".to_string(), OptionInput::Bool(true)));
            params.push(("separator_char_list".to_string(), vec!["=", "-"].into()));
        }

        for setting in &self.options {
            if registry.get(&setting.name).is_none() {
                return Err(ExplainError::unknown_option(&setting.name));
            }

            let value = if registry.is_list(&setting.name) {
                OptionInput::List(vec![setting.value.clone()])
            } else {
                OptionInput::Str(setting.value.clone())
            };

            match params.iter().position(|(name, _)| *name == setting.name) {
                Some(i) => match (&mut params[i].1, value) {
                    (OptionInput::List(values), OptionInput::List(mut more)) => values.append(&mut more),
                    (existing, value) => *existing = value,
                },
                None => params.push((setting.name.clone(), value)),
            }
        }

        Ok(params)
    }
}

fn main() -> ExitCode {
    let options = Options::parse();
    let level = if options.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if options.option_help {
        print_option_help();
        return ExitCode::SUCCESS;
    }

    let Some(arch) = options.arch.as_deref() else {
        error!("Architecture is not specified.");
        return ExitCode::FAILURE;
    };

    let env = BuildEnv::new(
        arch,
        options.srcarch.as_deref(),
        &options.cross_compile,
        options.cc.as_deref(),
        options.ld.as_deref(),
        &options.srctree,
    );

    match run(&options, &env) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_option_help() {
    println!("  -O OPTION, --option OPTION");
    println!("     OPTION in KEY or KEY=VALUE");
    for line in OptionRegistry::defaults().help_table().lines() {
        println!("     {line}");
    }
}

fn run(options: &Options, env: &BuildEnv) -> Result<(), ExplainError> {
    let params = options.print_format_params(&OptionRegistry::defaults())?;
    let kconfig_file = options.srctree.join(&options.kconfig);

    if options.verbose {
        print_summary(options, env, &kconfig_file, &params);
    }

    let mut explainer = DefconfigExplainer::from_kconfig_file(&kconfig_file, env, [("undef_warnings", true)])?;
    explainer.preload_config_files(&options.preload)?;
    explainer.load_config_files(&options.load_files, true)?;
    explainer.load_config_files(&options.merge, false)?;
    explainer.generate_print_format(params)?;

    match &options.output {
        None => {
            let mut out = stdout().lock();
            explainer.write(&mut out)?;
            out.flush()?;
            Ok(())
        }
        Some(path) => write_file(&explainer, path),
    }
}

fn write_file(explainer: &DefconfigExplainer, path: &Path) -> Result<(), ExplainError> {
    let file = File::create(path).map_err(|e| ExplainError::file(path, e))?;
    let mut out = BufWriter::new(file);
    let result = explainer.write(&mut out).and_then(|()| out.flush().map_err(|e| ExplainError::file(path, e)));

    if result.is_err() {
        drop(out);
        if let Err(e) = remove_file(path) {
            warn!("Unable to remove {}: {e}", path.display());
        }
    }

    result
}

fn print_summary(options: &Options, env: &BuildEnv, kconfig_file: &Path, params: &[(String, OptionInput)]) {
    println!("## export ARCH={}", env.arch);
    println!("## export CROSS_COMPILE={}", env.cross_compile);
    println!("## export CC={}", env.cc);
    println!("## export LD={}", env.ld);
    println!("## export SRCARCH={}", env.srcarch);
    println!("## export srctree={}", env.srctree.display());
    println!("## kconfig file = {}", kconfig_file.display());
    println!("## preload defconfig files = {}", display_paths(&options.preload));
    println!("## load defconfig files    = {}", display_paths(&options.load_files));
    println!("## merge defconfig files   = {}", display_paths(&options.merge));
    println!(
        "## output file             = {}",
        options.output.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string())
    );
    let params: Vec<String> = params.iter().map(|(name, value)| format!("{name}={value}")).collect();
    println!("## print_format_params     = {{{}}}", params.join(", "));
}

fn display_paths(paths: &[PathBuf]) -> String {
    let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", paths.join(", "))
}
