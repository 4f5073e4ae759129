use crate::cli::{PlayArgs, TransportKind};
use anyhow::Context;
use focus_link::config::load_upload_config;
use focus_link::recording::SampleRecorder;
use focus_link::scoring::ScoringConfig;
use focus_link::upload::{ApiEndpoints, HttpSessionApi, SessionUploader, UploadConfig, UploadSettings};
use focus_link::{ConfigError, PlayOutcome, PlaySession, SessionConfig, TelemetryClient, TransportConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub async fn execute(args: PlayArgs) -> anyhow::Result<()> {
    let json = args.json;
    let skip_health_check = args.skip_health_check;
    let config = session_config(args)?;
    config.validate()?;

    let uploader = match &config.upload {
        Some(upload) => {
            let api = HttpSessionApi::new(config.endpoints.clone())?;
            if !skip_health_check {
                // Reachability only; a failure does not stop the session
                match api.health_check().await {
                    Ok(_) => log::info!("Session API at {} is reachable", config.endpoints.base_url),
                    Err(e) => log::warn!("Session API health check failed: {}", e),
                }
            }

            let uploader = SessionUploader::new(Arc::new(api), config.upload_settings.clone());
            uploader.configure(upload.clone());
            Some(uploader)
        }
        None => {
            log::info!("Uploading disabled");
            None
        }
    };

    let client = TelemetryClient::connect(config.transport.clone())
        .await
        .context("Failed to connect to the telemetry server")?;
    log::info!("Waiting for a good signal on {}", client.endpoint());

    let mut play = PlaySession::new(client, config.scoring).with_tick_interval(config.tick_interval);
    if let Some(uploader) = uploader {
        play = play.with_uploader(uploader);
    }
    if let Some(path) = &config.record_path {
        play = play.with_recorder(SampleRecorder::create(path)?);
    }

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, ending session");
            on_ctrl_c.cancel();
        }
    });

    let outcome = play.run(cancel).await;
    report(&outcome, json)
}

fn session_config(args: PlayArgs) -> Result<SessionConfig, ConfigError> {
    let transport = match args.transport {
        TransportKind::Tcp => TransportConfig::Tcp {
            host: args.host,
            port: args.port,
        },
        TransportKind::Relay => TransportConfig::Relay { url: args.relay_url },
    };

    let upload = if args.no_upload {
        None
    } else if let Some(path) = &args.app_config {
        Some(load_upload_config(path)?)
    } else {
        match (args.game_id, args.prescription_id) {
            (Some(game_id), Some(prescription_id)) => Some(UploadConfig {
                auth_token: args.token,
                game_id,
                prescription_id,
            }),
            _ => {
                return Err(ConfigError::Invalid {
                    field: "game_id",
                    reason: "--game-id and --prescription-id (or --app-config) are required \
                             unless --no-upload is given"
                        .to_string(),
                })
            }
        }
    };

    Ok(SessionConfig {
        transport,
        endpoints: ApiEndpoints {
            base_url: args.api.api_base,
            ..Default::default()
        },
        upload,
        upload_settings: UploadSettings {
            post_interval: Duration::from_millis(args.post_interval_ms),
            session_id_override: args.session_id_override,
            log_requests: !args.quiet_requests,
        },
        scoring: ScoringConfig {
            duration: Duration::from_secs(args.duration),
            attention_threshold: args.attention_threshold,
            good_signal_threshold: args.good_signal,
        },
        tick_interval: Duration::from_millis(args.tick_ms),
        record_path: args.record,
    })
}

fn report(outcome: &PlayOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match &outcome.score {
        Some(score) => {
            println!("Focus score: {:.1}", score.score);
            println!("Focused for {:.1}s", score.focused_seconds);
            if !score.completed {
                println!("(window was cut short)");
            }
        }
        None => println!("No score: the signal never became good enough"),
    }
    if let Some(id) = outcome.session_id {
        println!("Session {}", id);
    }
    Ok(())
}
