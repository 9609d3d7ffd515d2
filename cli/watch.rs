use crate::cli_args::WatchArgs;
use crate::commands::generate;
use crate::output::{OutputTargets, same_path};
use crate::{ConfigOverrides, determine_project_root, load_config_for_command};
use anyhow::{Context, Result};
use colored::*;
use ctxbuilder_core::{Config, TokenEstimator};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebouncedEvent, Debouncer, new_debouncer};
use std::path::Path;
use std::sync::mpsc;

/// Everything derived from the config that a regeneration needs.
struct WatchState {
    config: Config,
    estimator: TokenEstimator,
    targets: OutputTargets,
}

impl WatchState {
    fn load(watch_args: &WatchArgs, project_root: &Path) -> Result<Self> {
        let config = load_config_for_command(
            project_root,
            &watch_args.project_config,
            ConfigOverrides {
                scan: Some(&watch_args.scan),
                format_output: Some(&watch_args.format_output),
                selection: Some(&watch_args.selection),
                tokens: Some(&watch_args.tokens),
                watch_delay: watch_args.watch_delay.as_ref(),
            },
        )?;
        let estimator = TokenEstimator::for_model(&config.tokens.model);
        let targets = OutputTargets::from_flags(
            &config,
            project_root,
            watch_args.save.as_ref(),
            watch_args.copy,
            false,
        );
        Ok(Self {
            config,
            estimator,
            targets,
        })
    }

    fn regenerate(&self, project_root: &Path, quiet: bool) -> Result<()> {
        generate::trigger_generation(
            project_root,
            &self.config,
            &self.estimator,
            &self.targets,
            quiet,
        )
        .map(|_| ())
    }
}

pub fn run_watch_mode(watch_args: WatchArgs, quiet: bool, verbose: u8) -> Result<()> {
    let project_root = determine_project_root(&watch_args.project_config)?;

    if !quiet {
        eprintln!(
            "👀 Starting watch mode for '{}'. Press Ctrl+C to exit.",
            project_root.display()
        );
    }

    let mut state = WatchState::load(&watch_args, &project_root)
        .context("Failed to load initial configuration for watch mode")?;

    if let Err(e) = state.regenerate(&project_root, quiet) {
        if !quiet {
            eprintln!("{} {:#}\n", "⚠️ Error during initial generation:".yellow(), e);
        }
    } else if !quiet && verbose > 0 {
        eprintln!("{}\n", "✅ Initial generation complete.".green());
    }

    let (tx, rx) = mpsc::channel();
    let delay_duration = state
        .config
        .get_watch_delay()
        .context("Invalid watch delay duration")?;
    let mut debouncer: Debouncer<RecommendedWatcher> = new_debouncer(delay_duration, tx)
        .map_err(|e| anyhow::anyhow!("Failed to create debouncer: {}", e))?;
    debouncer
        .watcher()
        .watch(&project_root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", project_root.display()))?;
    log::debug!(
        "Watching {} recursively with a {:?} debounce.",
        project_root.display(),
        delay_duration
    );

    loop {
        match rx.recv() {
            Ok(Ok(debounced_events)) => {
                let relevant: Vec<&DebouncedEvent> = debounced_events
                    .iter()
                    .filter(|event| !is_own_output(&event.path, &state.targets))
                    .collect();
                if relevant.is_empty() {
                    log::trace!("Ignoring events caused by our own output.");
                    continue;
                }
                for event in &relevant {
                    log::trace!("Debounced event: {:?}", event);
                }
                if !quiet && verbose > 0 {
                    eprintln!("\n{} {} change(s) detected.", "🔄".blue(), relevant.len());
                }

                if config_file_changed(&project_root, &watch_args, &relevant) {
                    if !quiet {
                        eprintln!("{}", "🔄 Config file changed. Reloading configuration...".blue());
                    }
                    match WatchState::load(&watch_args, &project_root) {
                        Ok(reloaded) => state = reloaded,
                        Err(e) => {
                            if !quiet {
                                eprintln!("{} {:#}\n", "⚠️ Error reloading config:".yellow(), e);
                            }
                        }
                    }
                }

                if let Err(e) = state.regenerate(&project_root, quiet) {
                    if !quiet {
                        eprintln!("{} {:#}\n", "⚠️ Error during regeneration:".yellow(), e);
                    }
                } else if !quiet && verbose > 0 {
                    eprintln!("{}\n", "✅ Regeneration complete.".green());
                }
            }
            Ok(Err(error)) => {
                if !quiet {
                    eprintln!("{} {:#}\n", "⚠️ Watch error:".yellow(), error);
                }
                log::error!("Notify error received: {:?}", error);
            }
            Err(e) => {
                eprintln!("{} {:#}\n", "⛔ Watcher channel error:".red(), e);
                break Ok(());
            }
        }
    }
}

/// Saving the document below the root would otherwise retrigger the watcher.
fn is_own_output(event_path: &Path, targets: &OutputTargets) -> bool {
    targets.is_save_target(event_path)
}

fn config_file_changed(project_root: &Path, watch_args: &WatchArgs, events: &[&DebouncedEvent]) -> bool {
    let config_path = Config::resolve_config_path(
        project_root,
        watch_args.project_config.context_file.as_ref(),
        watch_args.project_config.disable_context_file,
    );
    match config_path {
        Ok(Some(path)) => events.iter().any(|event| same_path(&event.path, &path)),
        _ => false,
    }
}
