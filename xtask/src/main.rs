use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use s3_unzip_core::contract::{EndpointConfig, DEFAULT_ENDPOINT_CONFIG_KEY};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "s3_unzip_lambda";
const LAMBDA_BINARY: &str = "unzip_forwarder";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the unzip forwarder workspace",
    long_about = "A unified CLI for CI checks, Lambda packaging, and sample\n\
                  archives used to exercise the unzip forwarder by hand."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the forwarder binary and package it as a Lambda `bootstrap` zip
    LambdaPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
        /// Directory receiving the packaged zip
        #[arg(long, default_value = "dist")]
        dist_dir: String,
    },
    /// Write a demo archive and a matching endpoint config for manual uploads
    SampleArchive {
        /// Output directory for the archive and config
        #[arg(long, default_value = "sample")]
        output_dir: String,
        /// Endpoint written into the config object
        #[arg(long, env = "SAMPLE_ENDPOINT", default_value = "http://localhost:8080/ingest")]
        endpoint: String,
        /// Number of log entries in the archive
        #[arg(long, default_value_t = 3)]
        entries: usize,
        /// Lines written into each entry
        #[arg(long, default_value_t = 20)]
        lines: usize,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Tests only
    Test,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn package_lambda(target: &str, profile: BuildProfile, dist_dir: &Path) {
    ensure_rust_target_installed(target);

    step("Build forwarder lambda binary");

    let mut cargo_args = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--target",
        target,
        "--bin",
        LAMBDA_BINARY,
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifact");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    let zip_path = dist_dir.join(format!("{LAMBDA_BINARY}.zip"));
    package_lambda_zip(&target_dir.join(LAMBDA_BINARY), &zip_path);

    eprintln!("\nPackaged artifact:\n- {}", zip_path.display());
}

/// Fails early with an install hint instead of a long cargo error.
fn ensure_rust_target_installed(target: &str) {
    let Ok(output) = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    else {
        eprintln!("warning: rustup not found; skipping target check for `{target}`");
        return;
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if output.status.success() && !installed.lines().any(|line| line.trim() == target) {
        panic!("rust target `{target}` is missing; run `rustup target add {target}`");
    }
}

fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    let binary = fs::read(binary_path).unwrap_or_else(|error| {
        panic!("failed to read lambda binary '{}': {error}", binary_path.display())
    });

    // Lambda's custom runtime executes a file named `bootstrap`.
    let mut zip = ZipWriter::new(fs::File::create(zip_path).expect("failed to create lambda zip"));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry");
    zip.write_all(&binary).expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

fn write_sample_archive(output_dir: &Path, endpoint: &str, entries: usize, lines: usize) {
    step("Write sample archive");
    fs::create_dir_all(output_dir).expect("failed to create sample directory");

    let archive_path = output_dir.join("sample-logs.zip");
    let file = fs::File::create(&archive_path).expect("failed to create sample archive");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for entry in 0..entries {
        zip.start_file(format!("logs/app-{entry:03}.log"), options)
            .expect("failed to start sample entry");
        for line in 0..lines {
            writeln!(
                zip,
                "2024-01-01T00:00:{:02}Z level=info entry={entry} line={line} msg=\"sample event\"",
                line % 60
            )
            .expect("failed to write sample line");
        }
    }
    zip.finish().expect("failed to finish sample archive");

    let config = EndpointConfig {
        endpoint: endpoint.to_string(),
        headers: BTreeMap::new(),
    };
    let config_path = output_dir.join(DEFAULT_ENDPOINT_CONFIG_KEY);
    let body = serde_json::to_vec_pretty(&config).expect("endpoint config should serialize");
    fs::write(&config_path, body).expect("failed to write endpoint config");

    eprintln!(
        "\nWrote:\n- {}\n- {}\nUpload both to the same bucket; the config must sit at the bucket root.",
        archive_path.display(),
        config_path.display()
    );
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_test() {
    step("Test s3_unzip_core");
    run_cargo(&["test", "-p", "s3_unzip_core"]);

    step("Test s3_unzip_lambda");
    run_cargo(&["test", "-p", LAMBDA_PACKAGE]);
}

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    ci_test();
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Test => ci_test(),
            }
            eprintln!("\nCI job passed.");
        }
        Commands::LambdaPackage {
            target,
            profile,
            dist_dir,
        } => {
            package_lambda(&target, profile, Path::new(&dist_dir));
        }
        Commands::SampleArchive {
            output_dir,
            endpoint,
            entries,
            lines,
        } => {
            write_sample_archive(Path::new(&output_dir), &endpoint, entries, lines);
        }
    }
}
