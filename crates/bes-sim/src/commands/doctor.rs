use std::error::Error;
use std::path::PathBuf;

use bes_exp::{inspect_measures, load_config, to_canonical_json_bytes};
use clap::Args;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Measures directory to inspect.
    #[arg(long, default_value = "measures", conflicts_with = "config")]
    pub measures_dir: PathBuf,
    /// Take the measures directory from a sweep configuration instead.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Emit only JSON.
    #[arg(long)]
    pub quiet: bool,
}

pub fn run(args: &DoctorArgs) -> Result<(), Box<dyn Error>> {
    let measures_dir = match &args.config {
        Some(path) => load_config(path)?.measures_dir,
        None => args.measures_dir.clone(),
    };
    let report = inspect_measures(&measures_dir)?;
    let rendered = String::from_utf8(to_canonical_json_bytes(&report)?)?;
    if args.quiet {
        println!("{rendered}");
    } else {
        println!("Checking measures in {}", measures_dir.display());
        for name in &report.measures {
            println!("[OK] {name}");
        }
        for finding in &report.findings {
            println!("{finding}");
        }
    }
    if !report.is_healthy() {
        return Err(format!("{} measure error(s) found", report.errors().count()).into());
    }
    Ok(())
}
