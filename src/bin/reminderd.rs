use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};

use voice_reminder::core::Config;
use voice_reminder::database::Database;
use voice_reminder::features::alarms::{AlarmScheduler, TokioAlarmScheduler};
use voice_reminder::features::presentation::{
    CompositePresenter, NotificationPresenter, SpeechPresenter,
};
use voice_reminder::features::reminders::{RecoveryCoordinator, ReminderService};
use voice_reminder::ipc::IpcServer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting voice reminder daemon...");

    let database = Database::new(&config.database_path).await?;

    let (scheduler, alarms) =
        TokioAlarmScheduler::new(config.exact_alarms, config.inexact_window);
    if !config.exact_alarms {
        warn!(
            "Exact alarms disabled, reminders may fire up to {:?} late",
            config.inexact_window
        );
    }
    let scheduler: Arc<dyn AlarmScheduler> = Arc::new(scheduler);

    let ipc_server = IpcServer::new(config.socket_path.clone());

    let speech = Arc::new(SpeechPresenter::new(config.speech.clone()));
    let presenter = CompositePresenter::new()
        .with(Arc::new(NotificationPresenter))
        .with(speech.clone())
        .with(Arc::new(ipc_server.broadcaster()));
    if !config.speech.enabled {
        info!("🔇 Speech disabled, reminders will only be shown");
    }

    let service = Arc::new(ReminderService::new(
        database.clone(),
        scheduler.clone(),
        Arc::new(presenter),
    ));
    let recovery = Arc::new(RecoveryCoordinator::new(database, scheduler.clone()));

    // A daemon start is a restart signal: timers from any previous run are gone
    recovery.clone().spawn();

    let dispatcher = tokio::spawn(service.clone().run(alarms));

    let ipc_server = Arc::new(
        ipc_server
            .with_reminders(service, recovery.clone())
            .with_speech(speech),
    );
    if let Err(e) = ipc_server.clone().start().await {
        error!("Failed to start IPC server: {e}. CLI control will be unavailable.");
    } else {
        info!("📡 IPC server started on {}", ipc_server.socket_path());
    }
    ipc_server.clone().start_command_processor();

    // Spawn IPC heartbeat task
    let heartbeat_ipc = ipc_server.clone();
    let heartbeat_interval = config.heartbeat_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(heartbeat_interval);
        loop {
            interval.tick().await;
            heartbeat_ipc.send_heartbeat();
        }
    });

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    info!("⏰ Voice reminder daemon ready");

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                info!("SIGHUP received, reconciling reminders");
                recovery.clone().spawn();
            }
            _ = terminate.recv() => {
                info!("SIGTERM received, shutting down");
                break;
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {e}");
                }
                info!("Shutting down");
                break;
            }
        }
    }

    // Pending reminders stay in the store and are recovered on the next start
    scheduler.cancel_all().await;
    dispatcher.abort();
    ipc_server.cleanup();

    Ok(())
}
