use crate::cli::HealthArgs;
use anyhow::Context;
use focus_link::upload::{ApiEndpoints, HttpSessionApi};

pub async fn execute(args: HealthArgs) -> anyhow::Result<()> {
    let api = HttpSessionApi::new(ApiEndpoints {
        base_url: args.api.api_base,
        ..Default::default()
    })?;

    let body = api
        .health_check()
        .await
        .with_context(|| format!("Health check against {} failed", api.endpoints().health_url()))?;

    println!("OK {}", body.trim());
    Ok(())
}
