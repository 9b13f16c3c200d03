use metronome::{AsyncProducerTimer, BoxError, ProducerTimer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .with_target(false)
        .init();

    let reads = Arc::new(AtomicU64::new(0));
    let sensor = Arc::clone(&reads);
    let sampler = ProducerTimer::new(
        move || {
            let n = sensor.fetch_add(1, Ordering::SeqCst);
            if n % 4 == 3 {
                return Err("sensor timeout");
            }
            Ok(20.0 + n as f64 * 0.5)
        },
        Duration::from_millis(750),
        true,
    )?;
    sampler.on_data(|celsius, timestamp, _| println!("[{}] 🌡️  {:.1}°C", timestamp, celsius));
    sampler.on_error(|error| eprintln!("⚠️  {}", error));

    let poller = AsyncProducerTimer::new(
        || async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok::<_, BoxError>(chrono::Local::now().format("%H:%M:%S%.3f").to_string())
        },
        Duration::from_secs(1),
        true,
    )?;
    poller.on_data(|fetched, _, interval| println!("🌐 fetched at {} (every {:?})", fetched, interval));

    tokio::time::sleep(Duration::from_secs(5)).await;

    sampler.destroy();
    poller.destroy();
    println!("\n👋 Done");
    Ok(())
}
