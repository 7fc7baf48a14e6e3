use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use place_view::{api, cli, config, error, monitor, render};
use place_view_common::{apply_sort, JobSlot};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use api::{ApiClient, EtlApi};
use cli::{Cli, Commands};
use config::Config;
use error::{PlaceViewError, Result};
use monitor::{JobMonitor, PollOutcome};

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("place_view=debug,place_view_common=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load()?;
    let api_base = config.resolve_api_base(cli.api_base.as_deref());
    tracing::debug!(%api_base, "using api base");
    let client = ApiClient::new(&api_base, config.timeout())?;

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await;
            println!("{}  {}", render::format_health(healthy), client.base());
            if !healthy {
                return Err(PlaceViewError::Unavailable(client.base().to_string()));
            }
        }

        Commands::Counts => {
            let counts = client.counts().await?;
            print!("{}", render::format_counts(Some(&counts)));
        }

        Commands::Search(args) => {
            let filters = args.filter_state(config.default_limit);
            let sort = args.sort_state();

            println!("🔍 place-view - 検索\n");
            let places = client.places(&filters).await?;
            let ranked = apply_sort(&places, sort);
            println!("✔ {}件\n", ranked.len());

            print!("{}", render::format_places_table(&ranked, sort));
            if args.details {
                for place in &ranked {
                    println!();
                    print!("{}", render::format_place_details(place));
                }
            }
        }

        Commands::Status => {
            let status = client.etl_status().await?;
            print!("{}", render::format_status(Some(&status)));
        }

        Commands::Start(args) => {
            let mut monitor = JobMonitor::with_interval(client.clone(), config.poll_interval());

            println!("🚀 {} を起動中...", args.job.label());
            let outcome = match args.job {
                JobSlot::GoogleImport => monitor.start_import(&args.import_form()).await?,
                slot => {
                    if args.has_import_options() {
                        println!("⚠ 取込用オプションは {} では無視されます", slot.label());
                    }
                    monitor.start(slot, None).await?
                }
            };
            println!("✔ 起動しました\n");

            if outcome == PollOutcome::Failed {
                println!("⚠ ジョブ状態を取得できませんでした");
            }
            if args.watch {
                watch(&mut monitor).await;
            } else {
                print!("{}", render::format_status(monitor.status()));
            }
        }

        Commands::Watch => {
            let mut monitor = JobMonitor::with_interval(client.clone(), config.poll_interval());
            monitor.mount().await;
            println!("{}  {}", render::format_health(monitor.healthy()), client.base());
            watch(&mut monitor).await;
        }

        Commands::Config { show, set_api_base } => {
            if let Some(base) = set_api_base {
                config.set_api_base(base)?;
                println!("✔ APIベースURLを保存しました: {}", config.api_base);
            }

            if show {
                println!("設定ファイル: {}", Config::config_path()?.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
                println!("使用中のAPIベースURL: {}", api_base);
            }
        }
    }

    Ok(())
}

/// 実行中のジョブがなくなるまで監視し、最終状態を表示
async fn watch(monitor: &mut JobMonitor<ApiClient>) {
    if !monitor.is_polling() {
        println!("実行中のジョブはありません\n");
        print!("{}", render::format_status(monitor.status()));
        return;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {elapsed} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(render::format_summary(monitor.status()));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    monitor
        .run_until_idle(shutdown, |m, outcome| {
            if outcome == PollOutcome::Failed {
                pb.println("⚠ ジョブ状態を取得できませんでした");
            }
            pb.set_message(render::format_summary(m.status()));
        })
        .await;
    pb.finish_and_clear();

    if monitor.is_closed() {
        println!("⏹ 監視を中断しました\n");
    } else if monitor.status().is_none() {
        println!("⚠ ジョブ状態が不明のため監視を終了しました（再実行: place-view watch）\n");
    } else {
        println!("✅ 実行中のジョブはなくなりました\n");
    }
    print!("{}", render::format_status(monitor.status()));
    if monitor.counts().is_some() {
        print!("{}", render::format_counts(monitor.counts()));
    }
}
