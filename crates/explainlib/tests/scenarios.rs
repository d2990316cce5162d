use {
    defconfig_explainer_lib::{BuildEnv, DefconfigExplainer, OptionInput},
    std::{fs, path::PathBuf},
    tempfile::TempDir,
};

const KCONFIG: &str = r#"
mainmenu "Test $(ARCH) Configuration"

menu "Main"

config FOO
	bool "Enable Foo"
	help
	  Foo support.

config BAR
	bool "Enable Bar"

endmenu

source "arch/$(SRCARCH)/Kconfig"
"#;

const ARCH_KCONFIG: &str = r#"
menu "Platform"

config PLATFORM_NAME
	string "Platform name"
	default "generic"

config NR_CPUS
	int "Maximum number of CPUs"
	range 1 64
	default 8

endmenu
"#;

struct Tree {
    dir: TempDir,
    env: BuildEnv,
}

impl Tree {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("arch/x86")).unwrap();
        fs::write(dir.path().join("Kconfig"), KCONFIG).unwrap();
        fs::write(dir.path().join("arch/x86/Kconfig"), ARCH_KCONFIG).unwrap();
        let env = BuildEnv::new("x86_64", None, "", None, None, dir.path());
        Self {
            dir,
            env,
        }
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn explainer(&self) -> DefconfigExplainer {
        DefconfigExplainer::from_kconfig_file(&self.dir.path().join("Kconfig"), &self.env, [("undef_warnings", true)])
            .unwrap()
    }
}

fn render(explainer: &DefconfigExplainer) -> String {
    let mut out = Vec::new();
    explainer.write(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test_log::test]
fn defined_symbol_with_its_menu() {
    let tree = Tree::new();
    let defconfig = tree.file("defconfig", "CONFIG_FOO=y\n");

    let mut explainer = tree.explainer();
    explainer.load_config_files(&[&defconfig], true).unwrap();
    explainer.generate_print_format(Vec::<(&str, bool)>::new()).unwrap();

    let out = render(&explainer);
    assert_eq!(out, "## \n## Main\n## \n\n### \n### Enable Foo\n### \nCONFIG_FOO=y\n\n## end of Main\n\n");
    assert!(!out.contains("Bar"));
}

#[test_log::test]
fn unset_line_is_kept_verbatim() {
    let tree = Tree::new();
    let defconfig = tree.file("defconfig", "# CONFIG_FOO is not set   \n");

    let mut explainer = tree.explainer();
    explainer.load_config_files(&[&defconfig], true).unwrap();

    let out = render(&explainer);
    assert!(out.contains("\n# CONFIG_FOO is not set\n"));
    assert_eq!(explainer.index().get("FOO").unwrap().line, "# CONFIG_FOO is not set");
}

#[test_log::test]
fn same_level_symbols() {
    let tree = Tree::new();
    let defconfig = tree.file("defconfig", "CONFIG_FOO=y\n");

    let mut explainer = tree.explainer();
    explainer.load_config_files(&[&defconfig], true).unwrap();
    explainer.generate_print_format([("print_same_level_item", true)]).unwrap();

    let out = render(&explainer);
    let foo = out.find("Enable Foo").unwrap();
    let bar = out.find("Enable Bar").unwrap();
    assert!(foo < bar);
    assert!(out.contains("\n### CONFIG_BAR is not set\n"));
    assert!(!out.contains("Platform"));
}

#[test_log::test]
fn option_errors() {
    let tree = Tree::new();
    let mut explainer = tree.explainer();

    let err = explainer.generate_print_format([("no_such_option", true)]).unwrap_err();
    assert!(err.is_unknown_option());
    assert_eq!(err.to_string(), "no_such_option is not option name");

    let err = explainer.generate_print_format([("print_max_column", "abc")]).unwrap_err();
    assert!(err.is_invalid_option_value());
    assert_eq!(explainer.options().get_int("print_max_column", 0), 80);

    let err = DefconfigExplainer::from_kconfig_file(&tree.dir.path().join("Kconfig"), &tree.env, [("warnings", 3i64)])
        .unwrap_err();
    assert!(err.is_invalid_option_value());
}

#[test_log::test]
fn merged_file_wins() {
    let tree = Tree::new();
    let first = tree.file("first_defconfig", "CONFIG_FOO=y\nCONFIG_NR_CPUS=4\n");
    let second = tree.file("second_defconfig", "# Foo is not wanted here\nCONFIG_FOO=n\n");

    let mut explainer = tree.explainer();
    explainer.load_config_files(&[&first], true).unwrap();
    explainer.load_config_files(&[&second], false).unwrap();
    explainer.generate_print_format([("print_comment", true)]).unwrap();

    assert_eq!(explainer.index().len(), 2);
    assert_eq!(explainer.index().get("FOO").unwrap().line, "CONFIG_FOO=n");

    let out = render(&explainer);
    assert!(out.contains("# Foo is not wanted here\nCONFIG_FOO=n\n"));
    assert!(!out.contains("CONFIG_FOO=y"));
    assert!(out.contains("CONFIG_NR_CPUS=4"));

    // Replacing forgets everything loaded before.
    explainer.load_config_files(&[&second], true).unwrap();
    assert_eq!(explainer.index().len(), 1);
    assert!(!render(&explainer).contains("NR_CPUS"));
}

#[test_log::test]
fn recommended_layout() {
    let tree = Tree::new();
    let base = tree.file("base_config", "CONFIG_PLATFORM_NAME=\"board\"\n");
    let defconfig = tree.file("defconfig", "CONFIG_NR_CPUS=4\n");

    let mut explainer = tree.explainer();
    explainer.preload_config_files(&[&base]).unwrap();
    explainer.load_config_files(&[&defconfig], false).unwrap();
    explainer
        .generate_print_format([
            ("print_orig_config", OptionInput::Bool(true)),
            ("print_same_level_item", OptionInput::Bool(true)),
            ("print_location", OptionInput::Bool(true)),
            ("print_max_column", OptionInput::Int(12)),
            ("separator_char_list", OptionInput::List(vec!["=".to_string(), "-".to_string()])),
        ])
        .unwrap();

    let out = render(&explainer);
    assert_eq!(
        out,
        "## =========\n## Platform\n## =========\n## arch/x86/Kconfig : 2\n##\n\n\
         ### --------\n### Platform name\n### --------\n### arch/x86/Kconfig : 4\n###\n\
         ### CONFIG_PLATFORM_NAME=\"board\"\n\n\
         ### --------\n### Maximum number of CPUs\n### --------\n### arch/x86/Kconfig : 8\n###\n\
         CONFIG_NR_CPUS=4\n\n\
         ## end of Platform\n\n"
    );
}

#[test_log::test]
fn main_menu_level() {
    let tree = Tree::new();
    let defconfig = tree.file("defconfig", "CONFIG_BAR=y\n");

    let mut explainer = tree.explainer();
    explainer.load_config_files(&[&defconfig], true).unwrap();
    explainer.generate_print_format([("print_first_level", 0i64)]).unwrap();

    let out = render(&explainer);
    assert!(out.starts_with("# \n# Test x86_64 Configuration\n# \n\n## \n## Main\n"));
    assert!(out.ends_with("# end of Test x86_64 Configuration\n\n"));
}

const TOOLCHAIN_KCONFIG: &str = r#"
config CC_IS_GCC
	def_bool $(success,test "$(CC)" = gcc)

config CC_HAS_NOTHING
	def_bool $(success,false)

config PICKED
	string
	default "$(if-success,true,yes,no)"

config GCC_FEATURE
	bool "GCC feature"
	depends on CC_IS_GCC

config MISSING_FEATURE
	bool "Missing feature"
	depends on CC_HAS_NOTHING
"#;

#[test_log::test]
fn toolchain_tests_gate_symbols() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Kconfig"), TOOLCHAIN_KCONFIG).unwrap();
    let defconfig = dir.path().join("defconfig");
    fs::write(&defconfig, "CONFIG_GCC_FEATURE=y\nCONFIG_MISSING_FEATURE=y\n").unwrap();

    let env = BuildEnv::new("x86_64", None, "", None, None, dir.path());
    let mut explainer =
        DefconfigExplainer::from_kconfig_file(&dir.path().join("Kconfig"), &env, [("undef_warnings", true)]).unwrap();
    explainer.load_config_files(&[&defconfig], true).unwrap();

    let kconfig = explainer.kconfig();
    let picked = kconfig.symbol_by_name("PICKED").unwrap();
    assert_eq!(kconfig.sym_str_value(picked), "yes");

    assert_eq!(render(&explainer), "## \n## GCC feature\n## \nCONFIG_GCC_FEATURE=y\n\n");
}
