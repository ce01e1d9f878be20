// xtask - Build automation for gos
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Installs the `gos` binary and the system import directory.
//!
//! `$import "name"` falls back to a well-known directory after the
//! including file's own; `install` creates that directory and populates
//! it with the library sources under `gos-std/`, so system imports
//! resolve out of the box. `uninstall` removes exactly what `install`
//! put there.

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, exit};

/// Where `$import` looks for system libraries.
const SYSTEM_IMPORT_DIR: &str = "/usr/local/gos";

/// Install locations, after option parsing.
struct Options {
    bin_dir: PathBuf,
    import_dir: PathBuf,
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("install") => install(&parse_options(&args[1..])),
        Some("uninstall") => uninstall(&parse_options(&args[1..])),
        Some("help") | Some("-h") | Some("--help") | None => help(),
        Some(cmd) => {
            eprintln!("Unknown command: {}", cmd);
            help();
            exit(1);
        }
    }
}

fn help() {
    println!(
        r#"gos xtask - Build automation

USAGE:
    cargo xtask <COMMAND>

COMMANDS:
    install     Build release, install the gos binary to ~/.cargo/bin and
                the gos-std libraries to {import}
    uninstall   Remove the installed binary and libraries
    help        Show this message

OPTIONS:
    --prefix <PATH>       Install the binary to PATH/bin instead
    --import-dir <PATH>   Install libraries to PATH instead of {import}
                          (point $import there with files in a custom
                          location next to your sources)
"#,
        import = SYSTEM_IMPORT_DIR
    );
}

fn parse_options(args: &[String]) -> Options {
    let mut bin_dir = home_dir().join(".cargo").join("bin");
    let mut import_dir = PathBuf::from(SYSTEM_IMPORT_DIR);

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--prefix" => bin_dir = expect_path(arg, iter.next()).join("bin"),
            "--import-dir" => import_dir = expect_path(arg, iter.next()),
            other => {
                eprintln!("Unknown option: {}", other);
                exit(1);
            }
        }
    }

    Options {
        bin_dir,
        import_dir,
    }
}

fn expect_path(option: &str, arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from).unwrap_or_else(|| {
        eprintln!("{} requires a path argument", option);
        exit(1);
    })
}

fn home_dir() -> PathBuf {
    env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| {
        eprintln!("Could not determine home directory");
        exit(1);
    })
}

fn project_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).parent().unwrap().to_path_buf()
}

/// The `.gos` library sources bundled under `gos-std/`.
fn stdlib_sources(root: &Path) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    if let Ok(entries) = fs::read_dir(root.join("gos-std")) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("gos") {
                sources.push(path);
            }
        }
    }
    sources.sort();
    sources
}

fn install(opts: &Options) {
    let root = project_root();

    println!("Building release...");
    let status = Command::new("cargo")
        .args(["build", "--release"])
        .current_dir(&root)
        .status()
        .expect("Failed to run cargo build");
    if !status.success() {
        eprintln!("Build failed");
        exit(1);
    }

    fs::create_dir_all(&opts.bin_dir).expect("Failed to create bin directory");
    let binary = opts.bin_dir.join("gos");
    fs::copy(root.join("target/release/gos"), &binary).expect("Failed to copy gos binary");
    fs::set_permissions(&binary, fs::Permissions::from_mode(0o755))
        .expect("Failed to set permissions");
    println!("Installed {}", binary.display());

    install_stdlib(opts, &root);

    println!();
    println!("System imports resolve against {}", opts.import_dir.display());
    println!("Ensure {} is in your PATH", opts.bin_dir.display());
}

/// Create the import directory and copy the bundled libraries into it.
fn install_stdlib(opts: &Options, root: &Path) {
    if let Err(e) = fs::create_dir_all(&opts.import_dir) {
        if e.kind() == ErrorKind::PermissionDenied {
            eprintln!(
                "Cannot create {} (permission denied)",
                opts.import_dir.display()
            );
            eprintln!("Re-run with sudo, or pass --import-dir <PATH>");
        } else {
            eprintln!("Failed to create {}: {}", opts.import_dir.display(), e);
        }
        exit(1);
    }

    let sources = stdlib_sources(root);
    if sources.is_empty() {
        eprintln!("No library sources found under gos-std/");
        exit(1);
    }
    for source in sources {
        let name = source.file_name().expect("library files have names");
        let target = opts.import_dir.join(name);
        fs::copy(&source, &target).expect("Failed to copy library file");
        println!("Installed {}", target.display());
    }
}

fn uninstall(opts: &Options) {
    remove_if_present(&opts.bin_dir.join("gos"));

    // Only the files install put there; anything else in the import
    // directory is the user's.
    let root = project_root();
    for source in stdlib_sources(&root) {
        let name = source.file_name().expect("library files have names");
        remove_if_present(&opts.import_dir.join(name));
    }

    let emptied = fs::read_dir(&opts.import_dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if emptied {
        println!("Removing {}", opts.import_dir.display());
        let _ = fs::remove_dir(&opts.import_dir);
    }

    println!("Uninstalled gos");
}

fn remove_if_present(path: &Path) {
    if path.exists() {
        println!("Removing {}", path.display());
        fs::remove_file(path).expect("Failed to remove file");
    }
}
