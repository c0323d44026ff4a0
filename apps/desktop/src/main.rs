use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use client_core::{display_label, ClientChannel, ClientSettings};
use shared::{domain::SensorKind, transport::ServiceConnector};
use step_engine::{sources::SimulatedSensorHub, supports_step_counting};
use step_service::{
    load_settings, ClientPresence, NotificationPresenter, PresenceFlag, ServiceHost,
    StatusSurface, TracingSurface,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SensorChoice {
    Counter,
    Detector,
    None,
}

impl SensorChoice {
    fn kind(self) -> Option<SensorKind> {
        match self {
            SensorChoice::Counter => Some(SensorKind::StepCounter),
            SensorChoice::Detector => Some(SensorKind::StepDetector),
            SensorChoice::None => None,
        }
    }
}

#[derive(Parser, Debug)]
struct Args {
    /// Which step sensor the simulated device has.
    #[arg(long, value_enum, default_value_t = SensorChoice::Counter)]
    sensor: SensorChoice,
    #[arg(long, default_value_t = 700)]
    step_interval_ms: u64,
    /// Counter readings start from this many steps since boot.
    #[arg(long, default_value_t = 0)]
    steps_since_boot: u64,
    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,
    #[arg(long, default_value_t = 30)]
    run_for_secs: u64,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.log.as_str())
        .init();

    let settings = load_settings(args.config.as_deref())?;
    let hub = SimulatedSensorHub::new(
        args.sensor.kind(),
        Duration::from_millis(args.step_interval_ms),
    )
    .with_steps_since_boot(args.steps_since_boot);
    if !supports_step_counting(&hub) {
        warn!("device does not support step counting");
        println!("Your device does not support step counting");
    }

    let presence = Arc::new(PresenceFlag::default());
    let presenter = NotificationPresenter::new(
        &settings,
        Arc::new(TracingSurface) as Arc<dyn StatusSurface>,
        Arc::clone(&presence) as Arc<dyn ClientPresence>,
    );
    let host = ServiceHost::start(&hub, presenter, &settings);

    let client = ClientChannel::new(
        Arc::clone(&host) as Arc<dyn ServiceConnector>,
        ClientSettings::with_poll_interval(Duration::from_secs(args.poll_interval_secs)),
    );
    presence.set_foreground(true);
    let mut display = client.display().watch();
    println!("{}", display_label(*display.borrow_and_update()));
    client.connect().await?;

    let deadline = tokio::time::sleep(Duration::from_secs(args.run_for_secs));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(deadline, ctrl_c);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            changed = display.changed() => {
                if changed.is_err() {
                    break;
                }
                let value = *display.borrow_and_update();
                println!("{}", display_label(value));
            }
        }
    }

    client.disconnect();
    presence.set_foreground(false);
    let mode = host.mode();
    let snapshot = host.snapshot();
    host.shutdown().await;

    println!(
        "{}",
        serde_json::json!({
            "mode": mode,
            "started": snapshot.started,
            "count": snapshot.count,
            "reply_value": snapshot.reply_value(),
        })
    );
    Ok(())
}
