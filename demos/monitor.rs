// SPDX-License-Identifier: MPL-2.0

//! Test program: Print every sensor transition reported by the cloud service.
//!
//! The configuration is a JSON file such as:
//!
//! ```json
//! {
//!     "username": "user@example.com",
//!     "password": "secret",
//!     "sensors": [
//!         {"id": 1, "type": "door"},
//!         {"id": 2, "type": "motion", "name": "Hallway"}
//!     ]
//! }
//! ```
//!
//! Leave `sensors` out to watch every input the panel lists.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example monitor -- <config.json> [seconds]
//! ```

use std::env;
use std::time::Duration;

use metronet_bridge::{Bridge, BridgeConfig, BridgeEvent};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <config.json> [seconds]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --example monitor -- metronet.json 600");
        std::process::exit(1);
    }

    let config: BridgeConfig = serde_json::from_str(&std::fs::read_to_string(&args[1])?)?;
    let seconds: u64 = args.get(2).map_or(Ok(300), |s| s.parse())?;

    let mut bridge = Bridge::new(config)?;
    let mut events = bridge.subscribe();

    println!("Connecting to {}...", bridge.config().base_url);
    if !bridge.connect().await? {
        eprintln!("Login rejected, check the credentials");
        std::process::exit(2);
    }

    println!("Sensors:");
    for sensor in bridge.list_sensors() {
        println!(
            "  {:>3}  {:<24} {:<8} {}",
            sensor.id(),
            sensor.name().unwrap_or("-"),
            sensor.kind().unwrap_or("-"),
            sensor.state()
        );
        bridge.register_callback(sensor.id(), |id, active| {
            println!("Sensor {id} is now {}", if active { "active" } else { "inactive" });
        });
    }

    bridge.start().await?;
    println!("Watching for {seconds} seconds...");

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            event = events.recv() => match event {
                Ok(BridgeEvent::SessionRenewed) => println!("Session renewed"),
                Ok(BridgeEvent::PollFailed(failure)) => {
                    println!("Poll failed: {failure}");
                    if failure.fatal {
                        break;
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(e) => {
                    println!("Event stream closed: {e}");
                    break;
                }
            },
        }
    }

    bridge.stop().await?;
    println!("Stopped.");
    Ok(())
}
