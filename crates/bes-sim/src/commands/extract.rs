use std::error::Error;
use std::path::PathBuf;

use bes_exp::{extract_record, to_canonical_json_bytes, Job, ResultRecord};
use clap::Args;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Result store (`eplusout.sql`) to read.
    #[arg(long)]
    pub store: PathBuf,
    /// Label for the run in the printed record.
    #[arg(long, default_value = "run_0000")]
    pub run_id: String,
}

pub fn run(args: &ExtractArgs) -> Result<(), Box<dyn Error>> {
    let job = Job {
        run_id: args.run_id.clone(),
        index: 0,
        params: Default::default(),
    };
    let record = extract_record(Some(args.store.as_path()), ResultRecord::for_job(&job));
    let bytes = to_canonical_json_bytes(&record.cells())?;
    println!("{}", String::from_utf8(bytes)?);
    match record.failure {
        Some(kind) => Err(format!("{} yielded no usable metrics ({kind})", args.store.display()).into()),
        None => Ok(()),
    }
}
