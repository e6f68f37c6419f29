//! Purpose: Hold top-level CLI command dispatch for `manifest-kv-sync`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap; turn flags into configs and run pipelines.
//! Invariants: Configs are validated before any runtime or network resource is created.
//! Invariants: Each command prints exactly one JSON document on stdout on success.

use super::*;

use manifest_kv_sync::pipeline;

pub(super) fn dispatch_command(command: Command, color_mode: ColorMode) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "manifest-kv-sync", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Plan {
            bungie,
            shard_count,
            oversized_tables,
            skip,
            cache_dir,
            output_file,
        } => {
            let mut settings = Settings {
                shard_count,
                oversized_tables,
                skipped_tables: skip.skipped_tables,
                cache_dir,
                output_file,
                ..Settings::default()
            };
            bungie.apply(&mut settings);
            let config = settings.plan_config()?;

            let report = pipeline::plan(&config)?;
            emit_json(report.outputs().to_json(), color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Sync {
            bungie,
            kv,
            tables,
            cache_dir,
            batch,
        } => {
            let mut settings = Settings {
                manifest_tables: tables,
                cache_dir,
                ..Settings::default()
            };
            bungie.apply(&mut settings);
            kv.apply(&mut settings);
            batch.apply(&mut settings);
            let config = settings.sync_config()?;

            let report = block_on(pipeline::sync(&config))?;
            emit_json(
                json!({
                    "sync": {
                        "tables": report.tables,
                        "items": report.items,
                        "chunks": report.chunks,
                    }
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
        Command::Export {
            bungie,
            skip,
            output_dir,
            batch,
        } => {
            let mut settings = Settings {
                skipped_tables: skip.skipped_tables,
                export_dir: output_dir,
                ..Settings::default()
            };
            bungie.apply(&mut settings);
            batch.apply(&mut settings);
            let config = settings.export_config()?;

            let report = block_on(pipeline::export(&config))?;
            let files: Vec<String> = report
                .files
                .iter()
                .map(|path| path.display().to_string())
                .collect();
            emit_json(
                json!({
                    "export": {
                        "manifest_version": report.manifest_version,
                        "tables": report.tables,
                        "files": files,
                    }
                }),
                color_mode,
            );
            Ok(RunOutcome::ok())
        }
    }
}

fn block_on<F, T>(future: F) -> Result<T, Error>
where
    F: std::future::Future<Output = Result<T, Error>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start runtime")
                .with_source(err)
        })?;
    let result = runtime.block_on(future);
    // Blocking requests still in flight after a failure are abandoned.
    runtime.shutdown_background();
    result
}
