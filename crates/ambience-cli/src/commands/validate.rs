//! Report effective-tree validation problems in a workspace document.

use ambience_model::{load_workspace, validate_environment};
use clap::Args;

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the persisted workspace JSON document.
    workspace: std::path::PathBuf,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let state = load_workspace(&args.workspace)?;

    let mut problem_count = 0usize;
    for env in &state.environments {
        if let Err(errors) = validate_environment(env) {
            for err in errors.0 {
                println!("{err}");
                problem_count += 1;
            }
        }
    }

    if problem_count == 0 {
        println!("{} environment(s) OK", state.environments.len());
        Ok(())
    } else {
        anyhow::bail!("{problem_count} validation problem(s) found");
    }
}
