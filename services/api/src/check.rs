use clap::Args;
use scholarship_intake::error::AppError;
use scholarship_intake::workflows::intake::{prepare, PreparedSubmission};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Path to a JSON file holding one application submission
    #[arg(long)]
    pub(crate) file: PathBuf,
}

pub(crate) fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let prepared = match check_file(&args.file) {
        Ok(prepared) => prepared,
        Err(AppError::Validation(errors)) => {
            let rendered = serde_json::to_string_pretty(&json!({
                "ok": false,
                "fieldErrors": errors,
            }))?;
            println!("{rendered}");
            return Err(AppError::Validation(errors));
        }
        Err(err) => return Err(err),
    };
    let rendered = serde_json::to_string_pretty(&json!({
        "ok": true,
        "applicant": prepared.applicant,
        "confirmation": prepared.confirmation,
    }))?;
    println!("{rendered}");
    Ok(())
}

fn check_file(path: &Path) -> Result<PreparedSubmission, AppError> {
    let contents = std::fs::read_to_string(path)?;
    let raw: Value = serde_json::from_str(&contents)?;
    let prepared = prepare(&raw)?;
    Ok(prepared)
}
