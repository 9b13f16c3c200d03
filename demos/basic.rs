use metronome::{Timer, TimerError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), TimerError> {
    println!("🚀 Heartbeat every 500ms, paused halfway through...\n");

    let timer: Timer<&str> = Timer::new(Duration::from_millis(500), false, vec!["heartbeat"])?;
    let count = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&count);
    timer.on_tick(move |args| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        println!("[TICK] #{} {:?}", n, args);
    });
    timer.on_start(|| println!("▶️  started"));
    timer.on_stop(|| println!("⏸️  stopped"));

    timer.start();
    tokio::time::sleep(Duration::from_secs(2)).await;

    timer.toggle();
    timer.tick(vec!["manual"]);
    tokio::time::sleep(Duration::from_secs(1)).await;

    timer.toggle();
    tokio::time::sleep(Duration::from_secs(2)).await;

    timer.destroy();
    println!("\n✅ {} ticks delivered", count.load(Ordering::SeqCst));
    Ok(())
}
