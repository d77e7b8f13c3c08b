use std::path::Path;
use std::process::Command;

use anyhow::{bail, Result};

use rapl_sweep::config::Config;
use rapl_sweep::profiler::{running_as_root, Credential, CredentialPolicy};

const RAPL_PATH: &str = "/sys/devices/virtual/powercap/intel-rapl";

fn check_tool(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

pub fn run_check(config: &Config) -> Result<()> {
    println!("RAPL-SWEEP DEPENDENCY CHECK");
    println!();

    let mut ok = true;
    let root = running_as_root();

    let profiler = &config.profiler.binary;
    if is_executable(profiler) {
        println!("  {:<24}OK ({})", "profiler", profiler.display());
    } else {
        println!("  {:<24}MISSING ({})", "profiler", profiler.display());
        ok = false;
    }

    // ROOT NEEDS NO WRAPPER
    let wrapper = &config.elevation.command;
    if root {
        println!("  {:<24}SKIPPED (RUNNING AS ROOT)", wrapper);
    } else if check_tool(wrapper) {
        println!("  {:<24}OK", wrapper);
    } else {
        println!("  {:<24}MISSING", wrapper);
        ok = false;
    }

    // PRESENCE ONLY. THE VALUE IS NEVER PRINTED.
    let var = &config.elevation.credential_env;
    let has_credential = Credential::from_env(var).is_some();
    match (root, has_credential, config.elevation.policy) {
        (true, _, _) => println!("  ${:<23}NOT NEEDED", var),
        (false, true, _) => println!("  ${:<23}SET", var),
        (false, false, CredentialPolicy::AssumeElevated) => {
            println!("  ${:<23}UNSET (ASSUME-ELEVATED: sudo -n)", var)
        }
        (false, false, CredentialPolicy::Require) => {
            println!("  ${:<23}UNSET (REQUIRED)", var);
            ok = false;
        }
    }

    if Path::new(RAPL_PATH).exists() {
        println!("  {:<24}AVAILABLE", "intel-rapl powercap");
    } else {
        println!("  {:<24}NOT FOUND ({})", "intel-rapl powercap", RAPL_PATH);
        ok = false;
    }

    let workload = &config.workload.command;
    match workload.first() {
        Some(program) if check_tool(program) || Path::new(program).exists() => {
            println!("  {:<24}OK ({})", "workload", workload.join(" "));
        }
        Some(program) => {
            println!("  {:<24}NOT FOUND ({})", "workload", program);
            ok = false;
        }
        None => {
            println!("  {:<24}EMPTY", "workload");
            ok = false;
        }
    }
    println!();

    if !ok {
        bail!("SOME CHECKS FAILED");
    }
    println!("ALL CHECKS PASSED");
    Ok(())
}
