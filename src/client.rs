use crate::ui;
use auction_dapp::{
    bootstrap::{
        Running,
        bootstrap,
    },
    commands::Command,
    config::AppConfig,
    eth_provider::EthProvider,
    provider::CapabilityProvider,
    session::Session,
    snapshot::refresh_snapshot,
    view::View,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::Path,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time::{
        self,
        Instant,
        Interval,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "auction-dapp.log";

/// Logs go to a daily rolling file since the terminal belongs to the UI. Keep
/// the returned guard alive until exit so buffered records are flushed.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("failed to create log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("failed to install log subscriber: {e}"))?;
    Ok(guard)
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let provider = EthProvider::connect(&config.rpc_url)
        .await
        .wrap_err_with(|| format!("failed to connect to {}", config.rpc_url))?;
    let view = View::new();
    let running = bootstrap(Arc::new(provider), &config, &view)
        .await
        .wrap_err("auction client initialization failed")?;

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        running,
        view,
        config.refresh_interval,
        &mut ui_state,
        &mut input_events,
    )
    .await;
    ui::terminal_exit()?;
    res
}

enum SnapshotWorkerCommand {
    FetchNow,
    Shutdown,
}

/// Re-reads the auction on every tick and on demand. Failed reads are logged
/// by `refresh_snapshot` and leave the last render in place.
async fn snapshot_worker<P: CapabilityProvider>(
    session: Session<P>,
    view: View,
    poll_interval: Option<Duration>,
    mut cmd_rx: mpsc::UnboundedReceiver<SnapshotWorkerCommand>,
) {
    let mut ticker = poll_interval.map(|period| {
        // bootstrap already rendered the first snapshot
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });

    loop {
        tokio::select! {
            _ = next_tick(&mut ticker) => {
                refresh_snapshot(&session, &view).await.ok();
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SnapshotWorkerCommand::FetchNow) => {
                        debug!("manual refresh requested");
                        refresh_snapshot(&session, &view).await.ok();
                    }
                    Some(SnapshotWorkerCommand::Shutdown) | None => break,
                }
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run_loop<P: CapabilityProvider>(
    running: Running<P>,
    view: View,
    refresh_interval: Option<Duration>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    let Running {
        session,
        dispatcher,
        events,
        ..
    } = running;

    let (snapshot_cmd_tx, snapshot_cmd_rx) = mpsc::unbounded_channel();
    let snapshot_handle = tokio::spawn(snapshot_worker(
        session,
        view.clone(),
        refresh_interval,
        snapshot_cmd_rx,
    ));

    ui::draw(ui_state, &view.state()).wrap_err("initial draw failed")?;
    loop {
        tokio::select! {
            _ = view.changed() => {
                ui::draw(ui_state, &view.state())
                    .wrap_err("draw after view update failed")?;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, &view, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Refresh => {
                        let _ = snapshot_cmd_tx.send(SnapshotWorkerCommand::FetchNow);
                    }
                    ui::UserEvent::SubmitBid => {
                        dispatcher.trigger(Command::Bid);
                    }
                    ui::UserEvent::Withdraw => {
                        dispatcher.trigger(Command::Withdraw);
                    }
                    ui::UserEvent::CancelAuction => {
                        dispatcher.trigger(Command::CancelAuction);
                    }
                    ui::UserEvent::DismissAlert => {
                        view.dismiss_alert();
                    }
                    ui::UserEvent::Redraw => {}
                }
                ui::draw(ui_state, &view.state())
                    .wrap_err("draw after input failed")?;
            }
        }
    }

    let _ = snapshot_cmd_tx.send(SnapshotWorkerCommand::Shutdown);
    if let Err(err) = snapshot_handle.await {
        warn!(?err, "snapshot worker failed");
    }
    events.shutdown();
    info!("auction client stopped");
    Ok(())
}
