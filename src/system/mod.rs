//! System collaborators: security-validated command execution around the
//! host package manager.
//!
//! The core treats these as atomic black boxes: one listing pass at startup,
//! at most one removal pass at the end, no retries. All inputs are validated
//! before any OS command line is assembled.

use std::path::Path;
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::SystemError;
use crate::models::PackageRecord;

/// Queries the host for the running kernel and the installed package set.
pub trait PackageLister {
    /// Running kernel identifier, e.g. `5.15.0-82-generic`.
    fn running_kernel(&self) -> Result<String, SystemError>;

    /// Installed package records in listing order.
    fn installed_packages(&self) -> Result<Vec<PackageRecord>, SystemError>;
}

/// Executes a validated removal plan against the system package manager.
pub trait PackageRemover {
    fn remove(&self, packages: &[String]) -> Result<(), SystemError>;
}

/// Production lister backed by `uname -r` and `dpkg -l`.
pub struct Dpkg;

// Installed rows: "ii  <name>  <version>  <arch>  <description>"
static DPKG_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ii\s+(\S+)\s+(\S+)").unwrap());

impl PackageLister for Dpkg {
    fn running_kernel(&self) -> Result<String, SystemError> {
        let output = Command::new("uname").arg("-r").output().map_err(|source| {
            SystemError::CommandLaunch {
                cmd: "uname -r".to_string(),
                source,
            }
        })?;

        if !output.status.success() {
            return Err(SystemError::CommandFailed {
                cmd: "uname -r".to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let release = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if release.is_empty() {
            return Err(SystemError::CommandFailed {
                cmd: "uname -r".to_string(),
                reason: "empty kernel release".to_string(),
            });
        }

        debug!(%release, "detected running kernel");
        Ok(release)
    }

    fn installed_packages(&self) -> Result<Vec<PackageRecord>, SystemError> {
        let output = Command::new("dpkg").arg("-l").output().map_err(|source| {
            SystemError::CommandLaunch {
                cmd: "dpkg -l".to_string(),
                source,
            }
        })?;

        if !output.status.success() {
            return Err(SystemError::CommandFailed {
                cmd: "dpkg -l".to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_dpkg_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `dpkg -l` output into package records.
///
/// Only rows in the installed state (`ii`) are kept. Rows that claim to be
/// installed but do not follow the column layout are skipped with a warning
/// rather than failing the whole listing.
pub fn parse_dpkg_listing(listing: &str) -> Vec<PackageRecord> {
    let mut records = Vec::new();
    for line in listing.lines() {
        if !line.starts_with("ii") {
            continue;
        }
        match DPKG_ROW.captures(line) {
            Some(caps) => records.push(PackageRecord::new(&caps[1], &caps[2])),
            None => warn!(line, "skipping malformed dpkg row"),
        }
    }
    records
}

// Debian package-name charset; anything outside it never reaches a shell.
static PACKAGE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9+.\-]*$").unwrap());

/// Build the removal command line for a validated package list.
///
/// Uses `apt-get -y remove --autoremove --purge` so configuration files and
/// now-unused dependencies go with the packages. Every name is checked
/// against the package-name charset before the command is assembled; a name
/// that fails is a hard error, not a skip.
pub fn removal_command(packages: &[String]) -> Result<Vec<String>, SystemError> {
    if packages.is_empty() {
        return Err(SystemError::EmptyRemovalList);
    }

    let mut argv: Vec<String> = ["apt-get", "-y", "remove", "--autoremove", "--purge"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for package in packages {
        if !PACKAGE_NAME.is_match(package) {
            return Err(SystemError::InvalidPackageName(package.clone()));
        }
        argv.push(package.clone());
    }

    Ok(argv)
}

/// Production remover backed by `apt-get`.
pub struct AptGet;

impl PackageRemover for AptGet {
    fn remove(&self, packages: &[String]) -> Result<(), SystemError> {
        if !is_root() {
            return Err(SystemError::InsufficientPrivileges);
        }

        let argv = removal_command(packages)?;
        debug!(cmd = %argv.join(" "), "executing removal");

        // stdout/stderr stay attached to the terminal so the operator sees
        // apt's own progress output.
        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .map_err(|source| SystemError::CommandLaunch {
                cmd: argv.join(" "),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SystemError::RemovalFailed { status })
        }
    }
}

/// True when the effective uid is root.
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

// Debian/Ubuntu systems create this file when a reboot is pending.
const REBOOT_REQUIRED_FILE: &str = "/var/run/reboot-required";

/// True when the host reports a pending reboot.
pub fn reboot_pending() -> bool {
    Path::new(REBOOT_REQUIRED_FILE).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DPKG_FIXTURE: &str = "\
Desired=Unknown/Install/Remove/Purge/Hold
| Status=Not/Inst/Conf-files/Unpacked/halF-conf/Half-inst/trig-aWait/Trig-pend
|/ Err?=(none)/Reinst-required (Status,Err: uppercase=bad)
||/ Name                               Version                 Architecture Description
+++-==================================-=======================-============-===========
ii  linux-image-5.15.0-82-generic      5.15.0-82.91            amd64        Signed kernel image generic
ii  linux-headers-5.15.0-82-generic    5.15.0-82.91            amd64        Linux kernel headers
rc  linux-image-5.11.0-27-generic      5.11.0-27.29            amd64        Signed kernel image generic
ii  vim                                2:8.2.3995-1ubuntu2     amd64        Vi IMproved
ii
";

    #[test]
    fn test_parse_dpkg_listing_keeps_installed_rows() {
        let records = parse_dpkg_listing(DPKG_FIXTURE);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "linux-image-5.15.0-82-generic",
                "linux-headers-5.15.0-82-generic",
                "vim"
            ]
        );
        assert_eq!(records[0].version, "5.15.0-82.91");
    }

    #[test]
    fn test_removal_command_shape() {
        let packages = vec![
            "linux-image-5.4.0-2-generic".to_string(),
            "linux-headers-5.4.0-2-generic".to_string(),
        ];
        let argv = removal_command(&packages).expect("command should build");
        assert_eq!(
            argv[..5],
            ["apt-get", "-y", "remove", "--autoremove", "--purge"]
        );
        assert_eq!(&argv[5..], packages.as_slice());
    }

    #[test]
    fn test_removal_command_rejects_bad_names() {
        let packages = vec!["linux-image-5.4.0; rm -rf /".to_string()];
        let err = removal_command(&packages).expect_err("injection must be refused");
        assert!(matches!(err, SystemError::InvalidPackageName(_)));
    }

    #[test]
    fn test_removal_command_rejects_empty_list() {
        let err = removal_command(&[]).expect_err("empty list must be refused");
        assert!(matches!(err, SystemError::EmptyRemovalList));
    }
}
