//! Output reporting: apt-style text and machine-readable JSON.
//!
//! Dry-run and real removal share the same analysis pipeline; the reporter
//! only changes how the result is displayed, never what was computed.

use std::io::{self, BufRead, Write};

use serde::Serialize;

use crate::kernel::validator::{PlanStatus, ValidatedPlan};
use crate::models::{Catalog, Classification};

/// Output verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutputLevel {
    Quiet,
    Normal,
    Verbose,
}

/// Handles formatted terminal output with configurable verbosity.
pub struct Reporter {
    level: OutputLevel,
}

impl Reporter {
    pub fn new(level: OutputLevel) -> Self {
        Reporter { level }
    }

    fn quiet(&self) -> bool {
        self.level == OutputLevel::Quiet
    }

    /// Print the analysis block in apt-style format.
    pub fn print_analysis(&self, catalog: &Catalog, classification: &Classification) {
        if self.quiet() {
            return;
        }

        println!("Reading package lists... Done");
        println!("Building dependency tree... Done");
        println!();

        println!("Running kernel: {}", classification.running);
        println!("Latest kernel:  {}", classification.latest);

        if !catalog.running_installed() {
            println!(
                "*** Running kernel {} has no installed package; it stays protected ***",
                classification.running
            );
        }

        if classification.running != classification.latest {
            println!(
                "*** System will boot into {} after reboot ***",
                classification.latest
            );
        }

        println!();

        let removable_packages: usize = classification
            .removable
            .iter()
            .filter_map(|version| catalog.get(version))
            .map(|entry| entry.packages.len())
            .sum();

        if removable_packages > 0 {
            println!("The following packages will be REMOVED:");
            for version in &classification.removable {
                if let Some(entry) = catalog.get(version) {
                    for kind in entry.packages.values() {
                        println!("  {}* ({})", version, kind.label());
                    }
                }
            }
            println!();
            println!(
                "0 upgraded, 0 newly installed, {removable_packages} to remove and 0 not upgraded."
            );
        } else {
            println!("0 upgraded, 0 newly installed, 0 to remove and 0 not upgraded.");
        }
    }

    /// Echo the command that will (or would) be executed.
    pub fn print_command(&self, argv: &[String], dry_run: bool) {
        if self.quiet() {
            return;
        }
        let cmd = argv.join(" ");
        println!();
        if dry_run {
            println!("[DRY RUN] Would execute: {cmd}");
        } else {
            println!("Executing: {cmd}");
        }
        println!();
    }

    /// Interactive confirmation prompt. Returns true when the operator
    /// answered yes.
    pub fn confirm(&self, package_count: usize) -> io::Result<bool> {
        println!();
        println!("About to remove {package_count} package(s).");
        print!("Continue? [y/N]: ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let answer = line.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    pub fn print_aborted(&self) {
        if !self.quiet() {
            println!("Aborted.");
        }
    }

    pub fn print_dry_run_footer(&self) {
        if !self.quiet() {
            println!("[DRY RUN] No packages were removed.");
        }
    }

    pub fn print_list_hint(&self) {
        if !self.quiet() {
            println!("Run with --dry-run to see what would be removed");
            println!("Run with --remove to remove obsolete packages (requires sudo)");
        }
    }

    pub fn print_summary(&self, removed: usize) {
        if self.quiet() {
            return;
        }
        println!();
        println!("Successfully removed {removed} package(s).");
        println!();
        println!("Done.");
    }

    pub fn print_reboot_notice(&self) {
        if self.quiet() {
            return;
        }
        println!();
        println!("A reboot is required to use the updated kernel.");
        println!("Run 'sudo reboot' to restart the system.");
    }

    pub fn print_clean(&self) {
        if self.quiet() {
            return;
        }
        println!("No obsolete kernels or headers found.");
        println!("Your system is clean!");
    }

    pub fn print_empty_catalog(&self) {
        if self.quiet() {
            return;
        }
        println!("No kernel packages found in the package database.");
        println!("Nothing to do.");
    }
}

#[derive(Serialize)]
struct PlanReport<'a> {
    status: PlanStatus,
    requires_confirmation: bool,
    packages: &'a [String],
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    classification: &'a Classification,
    running_installed: bool,
    plan: PlanReport<'a>,
}

/// Render the full analysis as a JSON document for machine consumers.
pub fn render_json(
    catalog: &Catalog,
    classification: &Classification,
    plan: &ValidatedPlan,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        classification,
        running_installed: catalog.running_installed(),
        plan: PlanReport {
            status: plan.status(),
            requires_confirmation: plan.requires_confirmation(),
            packages: plan.packages(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::catalog::build_catalog;
    use crate::kernel::classify::classify;
    use crate::kernel::validator::ProposedPlan;
    use crate::models::PackageRecord;

    #[test]
    fn test_json_report_contains_plan_and_partition() {
        let records = vec![
            PackageRecord::new("linux-image-5.4.0-1-generic", "5.4.0-1.2"),
            PackageRecord::new("linux-image-5.4.0-2-generic", "5.4.0-2.3"),
            PackageRecord::new("linux-image-5.15.0-1-generic", "5.15.0-1.1"),
        ];
        let catalog = build_catalog(&records, "5.4.0-1-generic").unwrap();
        let classification = classify(&catalog);
        let plan = ProposedPlan::from_classification(&catalog, &classification)
            .validate(&catalog, &classification)
            .unwrap();

        let rendered = render_json(&catalog, &classification, &plan).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["running"], "5.4.0-1-generic");
        assert_eq!(value["latest"], "5.15.0-1-generic");
        assert_eq!(value["running_installed"], true);
        assert_eq!(value["plan"]["status"], "ready");
        assert_eq!(value["plan"]["requires_confirmation"], false);
        assert_eq!(
            value["plan"]["packages"][0],
            "linux-image-5.4.0-2-generic"
        );
    }
}
