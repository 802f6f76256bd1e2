//! Voltage PZEM Demo
//!
//! Polls a PZEM-004T-V3 and prints a full reading snapshot every few seconds.
//! Optionally sets the alarm threshold or resets the energy counter first.
//!
//! Usage: cargo run --bin demo [port] [slave_address]
//! Example: cargo run --bin demo /dev/ttyUSB0 1
//!
//! Flags:
//!   --alarm <watts>   set the power alarm threshold before polling
//!   --reset-energy    zero the energy counter before polling
//!   --debug           hex-dump every frame

use std::time::Duration;
use tokio::time::sleep;
use voltage_pzem::{MeterDriver, SlaveId};

const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", voltage_pzem::info());
    println!("=====================================\n");

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = "/dev/ttyUSB0".to_string();
    let mut slave_addr: SlaveId = 1;
    let mut alarm_threshold: Option<u16> = None;
    let mut reset_energy = false;
    let mut debug = false;

    let mut positional = 0;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--alarm" => {
                let value = iter
                    .next()
                    .ok_or("--alarm requires a threshold in Watts")?;
                alarm_threshold = Some(value.parse()?);
            }
            "--reset-energy" => reset_energy = true,
            "--debug" => debug = true,
            other => {
                match positional {
                    0 => port = other.to_string(),
                    1 => slave_addr = other.parse()?,
                    _ => return Err(format!("Unexpected argument: {}", other).into()),
                }
                positional += 1;
            }
        }
    }

    println!("Opening {} (slave address {})...", port, slave_addr);

    let mut meter = match MeterDriver::open_with_logging(&port, slave_addr, debug) {
        Ok(meter) => {
            println!("Port opened.\n");
            meter
        }
        Err(e) => {
            eprintln!("Failed to open meter: {}", e);
            eprintln!("(Is the USB-RS485 adapter plugged in?)");
            return Ok(());
        }
    };

    if let Some(threshold) = alarm_threshold {
        match meter.set_alarm(threshold).await {
            Ok(_) => println!("Alarm threshold set to {} W", threshold),
            Err(e) => eprintln!("Failed to set alarm threshold: {}", e),
        }
    }

    if reset_energy {
        match meter.reset_energy().await {
            Ok(_) => println!("Energy counter reset"),
            Err(e) => eprintln!("Failed to reset energy counter: {}", e),
        }
    }

    loop {
        match meter.read_all().await {
            Ok(reading) => {
                println!("--- meter reading ---");
                println!("{}\n", reading);
            }
            Err(e) => {
                eprintln!("Failed to read from meter: {}", e);
            }
        }

        sleep(POLL_INTERVAL).await;
    }
}
