//! kernreap command-line entry point.
//!
//! Thin orchestration around the library pipeline: list packages, build the
//! catalog, classify, validate a removal plan, and (optionally) hand the
//! validated plan to apt. Dry-run and real removal run the identical
//! pipeline; only the final execution step differs.

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use kernreap::error::{AppError, SystemError};
use kernreap::kernel::validator::{PlanStatus, ProposedPlan};
use kernreap::report::{self, OutputLevel, Reporter};
use kernreap::system::{self, AptGet, Dpkg, PackageLister, PackageRemover};
use kernreap::{build_catalog, classify};

// Exit-code contract, preserved as-is for automation consumers even though
// it mixes negative and positive codes (the shell sees -1 as 255).
const EXIT_WORK_DONE: i32 = 0;
const EXIT_NOTHING_TO_DO: i32 = 1;
const EXIT_REBOOT_REQUIRED: i32 = 2;
const EXIT_NO_PRIVILEGES: i32 = -1;
const EXIT_REMOVAL_FAILED: i32 = -2;

#[derive(Parser, Debug)]
#[command(
    name = "kernreap",
    version,
    about = "Detect and remove obsolete Linux kernels and headers",
    after_help = "Example: kernreap --dry-run  # see what would be removed"
)]
struct Cli {
    /// Show what would be removed without actually removing anything
    #[arg(long)]
    dry_run: bool,

    /// Remove obsolete kernels and headers (requires root)
    #[arg(long)]
    remove: bool,

    /// Assume yes to all prompts (use with --remove)
    #[arg(long, requires = "remove")]
    yes: bool,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Emit the analysis as JSON instead of apt-style text
    #[arg(long, conflicts_with = "remove")]
    json: bool,
}

impl Cli {
    fn output_level(&self) -> OutputLevel {
        if self.quiet {
            OutputLevel::Quiet
        } else if self.verbose {
            OutputLevel::Verbose
        } else {
            OutputLevel::Normal
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default_filter = if cli.verbose {
        "kernreap=debug"
    } else if cli.quiet {
        "kernreap=error"
    } else {
        "kernreap=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);
    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let reporter = Reporter::new(cli.output_level());
    match execute(cli, &reporter) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            match err {
                AppError::System(SystemError::InsufficientPrivileges) => EXIT_NO_PRIVILEGES,
                AppError::System(SystemError::RemovalFailed { .. }) => EXIT_REMOVAL_FAILED,
                _ => EXIT_NOTHING_TO_DO,
            }
        }
    }
}

fn execute(cli: &Cli, reporter: &Reporter) -> Result<i32, AppError> {
    if !cli.quiet && !cli.json {
        println!("kernreap v{}", env!("CARGO_PKG_VERSION"));
    }

    // One inventory snapshot per run; everything downstream derives from it.
    let lister = Dpkg;
    debug!("detecting running kernel");
    let release = lister.running_kernel()?;
    debug!("querying installed packages");
    let records = lister.installed_packages()?;

    let catalog = build_catalog(&records, &release)?;

    if catalog.is_empty() {
        reporter.print_empty_catalog();
        return Ok(EXIT_NOTHING_TO_DO);
    }

    let classification = classify(&catalog);

    let plan = match ProposedPlan::from_classification(&catalog, &classification)
        .validate(&catalog, &classification)
    {
        Ok(plan) => plan,
        Err(rejection) => {
            // Surfaced as a refusal with explanation; no removal happens.
            eprintln!("Refusing to remove: {rejection}");
            return Ok(EXIT_NOTHING_TO_DO);
        }
    };

    if cli.json {
        println!("{}", report::render_json(&catalog, &classification, &plan)?);
        return Ok(if plan.is_empty() {
            EXIT_NOTHING_TO_DO
        } else {
            EXIT_WORK_DONE
        });
    }

    reporter.print_analysis(&catalog, &classification);

    if plan.status() == PlanStatus::Empty {
        reporter.print_clean();
        return Ok(EXIT_NOTHING_TO_DO);
    }

    // Privileges are verified before anything is echoed as about to run.
    if cli.remove && !cli.dry_run && !system::is_root() {
        eprintln!("Error: Root privileges required for package removal.");
        eprintln!("Please run with sudo:");
        eprintln!("  sudo kernreap --remove");
        return Ok(EXIT_NO_PRIVILEGES);
    }

    let argv = system::removal_command(plan.packages())?;

    if cli.dry_run || cli.remove {
        reporter.print_command(&argv, cli.dry_run);
    }

    if cli.dry_run {
        reporter.print_dry_run_footer();
        return Ok(EXIT_WORK_DONE);
    }

    if !cli.remove {
        reporter.print_list_hint();
        return Ok(EXIT_WORK_DONE);
    }

    // The bulk-removal flag demands an affirmative answer; --yes counts as
    // the upstream auto-confirmation.
    let must_prompt = if plan.requires_confirmation() {
        !cli.yes
    } else {
        !cli.yes && !cli.quiet
    };
    if must_prompt && !reporter.confirm(plan.package_count())? {
        reporter.print_aborted();
        return Ok(EXIT_WORK_DONE);
    }

    let remover = AptGet;
    match remover.remove(plan.packages()) {
        Ok(()) => {}
        Err(SystemError::InsufficientPrivileges) => {
            eprintln!("Error: Root privileges required for package removal.");
            return Ok(EXIT_NO_PRIVILEGES);
        }
        Err(err) => {
            // All-or-nothing uncertain: the core does not guess which
            // packages were actually removed. A retry needs a fresh scan.
            eprintln!("Error during package removal: {err}");
            return Ok(EXIT_REMOVAL_FAILED);
        }
    }

    reporter.print_summary(plan.package_count());

    let reboot_needed =
        system::reboot_pending() || classification.running != classification.latest;
    if reboot_needed {
        reporter.print_reboot_notice();
        return Ok(EXIT_REBOOT_REQUIRED);
    }

    Ok(EXIT_WORK_DONE)
}
