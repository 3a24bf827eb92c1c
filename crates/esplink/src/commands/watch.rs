//! `esplink watch` -- run a gateway and print its notifications.

use tracing::{debug, info};

use esplink_api::{ReconnectingClient, ScriptDialer};
use esplink_core::{Gateway, GatewayBuilder};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let (profile, gateway_config) = config::gateway_config(global, &args, &cfg)?;
    if gateway_config.target().is_none() {
        return Err(CliError::NoTarget {
            profile,
            path: config::config_path(global).display().to_string(),
        });
    }

    let dialer = ScriptDialer::from_file(&args.script)?;
    info!(script = %args.script.display(), events = dialer.len(), "replaying recorded session");

    let builder = GatewayBuilder::new(gateway_config);
    let mut notifications = builder.subscribe_all();

    let once = args.once;
    let gateway = builder.start(move |mut options| {
        options.reconnect = !once;
        ReconnectingClient::new(dialer, options)
    })?;

    // Closes when the event loop exits, i.e. the client gave up.
    let mut event_loop = gateway.watch_status();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        let note = tokio::select! {
            biased;
            Some(note) = notifications.recv() => note,
            changed = event_loop.changed() => {
                if changed.is_err() {
                    debug!("client finished");
                    break;
                }
                continue;
            }
            _ = &mut interrupt => {
                debug!("interrupted");
                break;
            }
        };
        output::emit(&output::render(&note)?)?;
    }

    gateway.shutdown().await;

    // Anything published between the last poll and shutdown.
    while let Ok(note) = notifications.try_recv() {
        output::emit(&output::render(&note)?)?;
    }

    if args.summary {
        print_summary(&gateway)?;
    }
    Ok(())
}

fn print_summary(gateway: &Gateway) -> Result<(), CliError> {
    let entities = gateway.entities();
    output::emit(&output::tagged(
        "entities",
        &serde_json::json!({ "epoch": gateway.epoch(), "entities": &*entities }),
    )?)?;
    if let Some(device) = gateway.device() {
        output::emit(&output::tagged("device", &*device)?)?;
    }
    Ok(())
}
