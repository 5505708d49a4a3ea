mod config;
mod desk;

use std::process;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use config::Settings;
use desk::{DeskSession, MAX_HEIGHT_CM, MIN_HEIGHT_CM};

#[derive(Parser, Debug)]
#[command(name = "idasen-ctl", version)]
#[command(about = "Control an IKEA Idasen standing desk over Bluetooth LE")]
struct Cli {
    /// Desk to connect to, by advertised name or address. Remembered for
    /// later runs.
    #[arg(long)]
    desk: Option<String>,

    /// Height to move to, in cm (65.0 to 128.0).
    #[arg(long)]
    pos: Option<f64>,

    /// Save the current height under this favorite name.
    #[arg(long)]
    fav: Option<String>,

    /// Move to a previously saved favorite.
    #[arg(long)]
    movefav: Option<String>,

    /// List favorite positions.
    #[arg(long)]
    listfav: bool,

    /// Remove a favorite position.
    #[arg(long)]
    delfav: Option<String>,

    /// Seconds to wait for the desk to appear during discovery.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load()?;

    if cli.listfav {
        println!("{}", settings.format_favorites());
        return Ok(());
    }

    if let Some(name) = cli.delfav.as_deref() {
        if !settings.del_fav(name) {
            bail!("no favorite named {name:?}");
        }
        settings.save()?;
        println!("Favorite {name:?} deleted.");
        return Ok(());
    }

    let Some(target_desk) = cli.desk.clone().or_else(|| settings.desk.clone()) else {
        bail!("no desk name or address specified; pass --desk to choose one");
    };
    settings.desk = Some(target_desk.clone());
    settings.save()?;

    if cli.pos.is_none() && cli.fav.is_none() && cli.movefav.is_none() {
        println!("Desk set to {target_desk}.");
        return Ok(());
    }

    // Resolve the favorite before any BLE work so a missing name fails
    // without a scan.
    let movefav_height = match cli.movefav.as_deref() {
        Some(name) => Some(
            settings
                .fav(name)
                .with_context(|| format!("no favorite named {name:?}"))?,
        ),
        None => None,
    };

    log::info!("Connecting to {target_desk}...");
    let session = DeskSession::connect(&target_desk, Duration::from_secs(cli.timeout)).await?;

    let outcome = drive(&cli, &mut settings, &session, movefav_height).await;

    if let Err(e) = session.disconnect().await {
        log::warn!("Failed to disconnect cleanly: {e}");
    }

    outcome
}

/// Run the requested desk operations on a connected session.
async fn drive(
    cli: &Cli,
    settings: &mut Settings,
    session: &DeskSession,
    movefav_height: Option<f64>,
) -> Result<()> {
    if let Some(target) = cli.pos {
        session.move_to(target).await.with_context(|| {
            format!("moving to {target} cm (valid range {MIN_HEIGHT_CM}-{MAX_HEIGHT_CM} cm)")
        })?;
        println!("Desk moved to {target:.1} cm.");
    }

    if let Some(name) = cli.fav.as_deref() {
        let height = session.current_position().await?;
        settings.add_fav(name, height);
        settings.save()?;
        println!("Saved current position ({height:.2} cm) as {name:?}.");
    }

    if let Some(height) = movefav_height {
        session.move_to(height).await?;
        println!("Desk moved to {height:.1} cm.");
    }

    Ok(())
}
