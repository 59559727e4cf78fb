//! Basic usage of the TASCAM SDK
//!
//! Connects to a deck, starts playback and prints status changes until
//! Ctrl+C is pressed.
//!
//! Run with: cargo run -p tascam-sdk --example basic_usage -- /dev/ttyUSB0 9600

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tascam_sdk::logging::{init_logging, LoggingMode};
use tascam_sdk::{SdkError, TascamDeck};

fn main() -> Result<(), SdkError> {
    init_logging(LoggingMode::Development)?;

    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let baud_rate = args
        .next()
        .and_then(|b| b.parse().ok())
        .unwrap_or(9600);

    println!("TASCAM SDK - Basic Usage");
    println!("========================");
    println!("Connecting to {} at {} baud...", port, baud_rate);

    let deck = TascamDeck::open(&port, baud_rate)?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
        println!("Could not install Ctrl+C handler: {}", e);
    }

    let updates = deck.subscribe();
    deck.play()?;

    while running.load(Ordering::SeqCst) {
        let Some(status) = updates.recv_timeout(Duration::from_millis(500)) else {
            if !deck.is_connected() {
                println!("Waiting for the deck to come back...");
            }
            continue;
        };

        println!(
            "[{}] {:?} track {}/{} {} (remaining {})",
            status.device_name,
            status.mecha_status,
            status.track_number,
            status.total_tracks,
            status.time_elapsed,
            status.time_remaining,
        );

        if let Some(errors) = &status.error_status {
            println!("   Device errors: {}", errors.names().join(", "));
        }
        if let Some(cautions) = &status.caution_status {
            println!("   Device cautions: {}", cautions.names().join(", "));
        }
    }

    println!("\nStopping playback");
    if deck.is_connected() {
        deck.stop()?;
        std::thread::sleep(Duration::from_millis(200));
    }
    deck.disconnect()?;
    Ok(())
}
