//! Summarize a workspace document's environments, layers, and files.

use ambience_model::load_workspace;
use clap::Args;

/// Print a workspace document's environments, layers, and sound files.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the persisted workspace JSON document.
    workspace: std::path::PathBuf,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let state = load_workspace(&args.workspace)?;

    println!("master volume: {:.2}", state.master_volume);
    println!("sound files:   {}", state.files.len());
    println!("environments:  {}", state.environments.len());
    println!();

    for env in &state.environments {
        println!("- {} ({})", env.name, env.id);
        println!(
            "    max_weight: {:.2}  play_state: {:?}  soundboard: {} sounds",
            env.max_weight,
            env.play_state,
            env.soundboard.len()
        );
        for layer in &env.layers {
            println!(
                "    layer '{}' mode={:?} chance={:.2} weight={:.2} cooldown={} sounds={}",
                layer.name,
                layer.mode,
                layer.chance,
                layer.weight,
                layer.cooldown_cycles,
                layer.sounds.len()
            );
        }
        if !env.presets.is_empty() {
            let names: Vec<&str> = env.presets.iter().map(|p| p.name.as_str()).collect();
            println!("    presets: {}", names.join(", "));
        }
    }

    Ok(())
}
