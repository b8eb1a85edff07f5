// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic cart-sync usage example.
//!
//! Demonstrates:
//! 1. Starting a session over a file-backed local store and an in-process remote
//! 2. Editing the cart (burst of edits → one debounced save)
//! 3. Riding out a flaky remote with backoff
//! 4. Going offline, editing, and reconnecting
//! 5. Restarting and reloading the cart from disk
//! 6. Displaying metrics
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;
use std::time::Duration;

use cart_sync::{
    CartGateway, CartSession, CartSyncConfig, ConnectivityMonitor, DurableLocalStore,
    InMemoryGateway, ItemDescriptor, Seller, UserId,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

fn card(id: u64, title: &str, price: f64) -> ItemDescriptor {
    ItemDescriptor {
        id,
        title: title.into(),
        price,
        currency: "USD".into(),
        image: format!("https://img.example/{}.png", id),
        seller: Seller {
            name: "CardShack".into(),
            verified: true,
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║             cart-sync: Basic Usage Example                    ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure and start the session
    // ─────────────────────────────────────────────────────────────────────────
    let dir = tempfile::tempdir()?;
    let config = CartSyncConfig {
        persistent_dir: Some(dir.path().to_string_lossy().into_owned()),
        // Short timings so the demo finishes quickly
        debounce_ms: 300,
        retry_base_ms: 200,
        ..Default::default()
    };

    let user = UserId::new("collector-7");
    let gateway = Arc::new(InMemoryGateway::new());
    let connectivity = ConnectivityMonitor::online();

    println!("🚀 Starting session for {}...", user);
    let session = CartSession::start(
        config.clone(),
        Some(user.clone()),
        DurableLocalStore::from_config(&config)?,
        Arc::clone(&gateway) as Arc<dyn CartGateway>,
        connectivity.clone(),
    )
    .await;
    println!("   └─ Status: {:?}", session.sync_status().state);

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Burst of edits
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Editing the cart...");
    session.add_item(card(1, "Charizard Holo", 349.99));
    session.add_item(card(2, "Black Lotus (played)", 899.00));
    session.add_item(card(1, "Charizard Holo", 349.99));
    session.save_for_later(2);
    println!("   └─ {} item(s), subtotal ${:.2}", session.item_count(), session.subtotal());

    sleep(Duration::from_millis(500)).await;
    println!("   ✅ Saves so far: {} (one for the whole burst)", gateway.save_count());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Flaky remote
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n⚡ Remote fails the next 2 calls...");
    gateway.fail_next(2);
    session.add_item(card(3, "Pikachu Illustrator", 4_999.00));
    sleep(Duration::from_millis(400)).await;
    println!("   └─ {:?}", session.sync_status().error);
    sleep(Duration::from_millis(800)).await;
    println!("   ✅ Synced after backoff: {}", session.is_synced());

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Offline edits
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📴 Going offline...");
    connectivity.set_online(false);
    sleep(Duration::from_millis(50)).await;
    session.move_to_cart(2);
    session.update_quantity(3, 2);
    match session.sync_cart().await {
        Ok(()) => println!("   └─ Unexpected sync while offline"),
        Err(e) => println!("   └─ Manual sync: {}", e),
    }

    println!("\n📶 Back online...");
    connectivity.set_online(true);
    sleep(Duration::from_millis(200)).await;
    println!("   ✅ Synced: {}", session.is_synced());
    if let Some(remote) = gateway.stored(&user) {
        for item in remote {
            println!("   └─ remote: {} × {}", item.quantity, item.title);
        }
    }

    session.shutdown().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Restart from disk
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔁 Restarting (fresh memory tier, same directory)...");
    let restarted = CartSession::start(
        config.clone(),
        Some(user),
        DurableLocalStore::from_config(&config)?,
        gateway as Arc<dyn CartGateway>,
        connectivity,
    )
    .await;
    println!(
        "   └─ Reloaded {} line(s), {} item(s)",
        restarted.items().len(),
        restarted.item_count()
    );
    restarted.shutdown().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Metrics:");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let mut lines: Vec<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, value)| {
            let (_, key) = composite_key.into_parts();
            let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
            let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };
            let rendered = match value {
                DebugValue::Counter(v) => v.to_string(),
                DebugValue::Gauge(v) => format!("{:.2}", v.into_inner()),
                DebugValue::Histogram(samples) => {
                    let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                    format!("count={} sum={:.4}", samples.len(), sum)
                }
            };
            format!("{}{} = {}", key.name(), label_str, rendered)
        })
        .collect();
    lines.sort();

    if lines.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
    for line in lines {
        println!("   └─ {}", line);
    }
}
