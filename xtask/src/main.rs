use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "records_lambda";
const DIST_DIR: &str = "target/lambda/records_lambda";
const CRATES: &[&str] = &["records_core", "records_lambda"];

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the record service workspace",
    long_about = "A unified CLI for running tests, CI checks, and packaging\n\
                  the record service Lambda artifact."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the workspace test suite
    Test,
    /// Run CI checks (fmt, clippy, tests, package)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the Lambda binary and zip it as `bootstrap`
    LambdaPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Build and zip the Lambda artifact for the host target
    Package,
    /// Run check + package
    All,
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
}

// ── lambda artifact ────────────────────────────────────────────────

/// The record service binary for one target, and where its zip lands.
struct LambdaArtifact<'a> {
    target: &'a str,
    profile: BuildProfile,
}

impl LambdaArtifact<'_> {
    fn binary_path(&self) -> PathBuf {
        let file_name = if self.target.contains("windows") {
            format!("{LAMBDA_PACKAGE}.exe")
        } else {
            LAMBDA_PACKAGE.to_string()
        };
        Path::new("target")
            .join(self.target)
            .join(self.profile.dir_name())
            .join(file_name)
    }

    fn build(&self) {
        step("Build record service lambda binary");
        let mut args = vec!["build", "-p", LAMBDA_PACKAGE, "--bin", LAMBDA_PACKAGE];
        args.extend(["--target", self.target]);
        if matches!(self.profile, BuildProfile::Release) {
            args.push("--release");
        }
        cargo(&args);
    }

    /// Zips the binary as `bootstrap`, the entry name the custom runtime expects.
    fn package(&self) -> io::Result<PathBuf> {
        step("Package lambda zip artifact");
        let binary = fs::read(self.binary_path())?;
        fs::create_dir_all(DIST_DIR)?;

        let zip_path = Path::new(DIST_DIR).join("bootstrap.zip");
        let mut zip = ZipWriter::new(fs::File::create(&zip_path)?);
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o755);
        zip.start_file("bootstrap", options)?;
        zip.write_all(&binary)?;
        zip.finish()?;
        Ok(zip_path)
    }
}

fn package_lambda(target: &str, profile: BuildProfile) {
    require_target(target);

    let artifact = LambdaArtifact { target, profile };
    artifact.build();
    match artifact.package() {
        Ok(zip_path) => eprintln!("\nPackaged artifact:\n- {}", zip_path.display()),
        Err(error) => fail(&format!(
            "could not package '{}': {error}",
            artifact.binary_path().display()
        )),
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    exit(1);
}

/// Runs cargo and exits with its status code on failure.
fn cargo(args: &[&str]) {
    eprintln!("+ cargo {}", args.join(" "));
    match Command::new("cargo").args(args).status() {
        Ok(status) if status.success() => {}
        Ok(status) => exit(status.code().unwrap_or(1)),
        Err(error) => fail(&format!("failed to execute cargo: {error}")),
    }
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Skipped with a warning when rustup is unavailable.
fn require_target(target: &str) {
    let Some(installed) = command_stdout("rustup", &["target", "list", "--installed"]) else {
        eprintln!("warning: could not list installed rust targets; skipping preflight");
        return;
    };
    if !installed.lines().any(|line| line.trim() == target) {
        fail(&format!(
            "rust target `{target}` is not installed; run `rustup target add {target}`"
        ));
    }
}

fn host_target() -> String {
    command_stdout("rustc", &["-vV"])
        .and_then(|info| {
            info.lines()
                .find_map(|line| line.strip_prefix("host: "))
                .map(str::to_string)
        })
        .unwrap_or_else(|| fail("rustc -vV did not report a host target"))
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    cargo(&["clippy", "--all-targets", "--all-features", "--", "-D", "warnings"]);

    for &package in CRATES {
        step(&format!("Test {package}"));
        cargo(&["test", "-p", package]);
    }
}

fn ci_package() {
    package_lambda(&host_target(), BuildProfile::Debug);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test => cargo(&["test", "--workspace"]),
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Package => ci_package(),
                CiJob::All => {
                    ci_check();
                    ci_package();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::LambdaPackage { target, profile } => package_lambda(&target, profile),
    }
}
