use metronome::{BoxError, TimerBuilder};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_target(false)
        .init();

    println!("📝 Configuration:");
    println!("   - poller.interval: interval of the async poller");
    println!("   - heartbeat.interval: bare number read in heartbeat.time_unit");
    println!("   - override with APP_ environment variables\n");

    let heartbeat = TimerBuilder::with_toml("demos/config/application.toml")?
        .settings_from("heartbeat")
        .fixed_args(vec![1_u8, 2, 3])
        .build()?;
    heartbeat.on_tick(|args| println!("💓 heartbeat {:?}", args));

    let poller = TimerBuilder::<()>::with_toml("demos/config/application.toml")?
        .settings_from("poller")
        .build_async_producer(|| async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            Ok::<_, BoxError>("payload")
        })?;
    poller.on_data(|payload, timestamp, _| println!("[{}] 📦 {}", timestamp, payload));

    println!("\n✅ Press Ctrl+C to stop.\n");
    tokio::signal::ctrl_c().await?;

    println!("\n👋 Shutting down...");
    heartbeat.destroy();
    poller.destroy();
    Ok(())
}
