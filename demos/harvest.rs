//! Runs the harvester once against an offline pcap file.
//!
//! ```text
//! cargo run --example harvest -- capture.pcap
//! ```

use certgrep::capture::OfflineSource;
use certgrep::shutdown::TripWire;
use certgrep::{Config, Harvester};

#[tokio::main]
async fn main() {
    certgrep::trace::init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: harvest <path-to-pcap-file>");
            std::process::exit(2);
        }
    };

    let config = Config::try_from(Config::figment()).unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        std::process::exit(1);
    });

    let source = OfflineSource::open(std::path::Path::new(&path), &config.bpf)
        .unwrap_or_else(|e| {
            eprintln!("failed to open {path}: {e}");
            std::process::exit(1);
        });

    let shutdown = TripWire::new();
    let ctrl_c_wire = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl_c_wire.trip();
    });

    match Harvester::new(config).run(Box::new(source), shutdown).await {
        Ok(totals) => {
            println!("capture rate: {}", totals.bits_per_second_label());
            println!("packets/s: {:.0}", totals.packets_per_second());
        }
        Err(e) => {
            eprintln!("harvest failed: {e}");
            std::process::exit(1);
        }
    }
}
