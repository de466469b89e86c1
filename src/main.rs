//! Krist Mining Client
//!
//! Drives one mining thread per selected OpenCL device and the network
//! runner on the main task.

use clap::Parser;
use krist_mining_client::config::Args;
use krist_mining_client::core::{SharedState, Solution, Target};
use krist_mining_client::error::{Error, Result};
use krist_mining_client::protocol::network::{self, MiningEvents, NetOptions};
use krist_mining_client::utils;
use krist_mining_client::workers::device::{all_devices, score_device, unique_id};
use krist_mining_client::workers::gpu::{Miner, MinerOptions};
use ocl::Device;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Interval between hashrate reports
const STATUS_INTERVAL: Duration = Duration::from_secs(3);

/// Logs protocol events as they happen
struct StatusEvents;

impl MiningEvents for StatusEvents {
    fn on_connect(&self) {
        info!("Connected to node");
    }

    fn on_disconnect(&self, reconnecting: bool) {
        if reconnecting {
            warn!("Connection lost, reconnecting");
        } else {
            warn!("Connection lost");
        }
    }

    fn on_target(&self, target: &Target) {
        info!(%target, "New mining target");
    }

    fn on_submitted(&self, solution: &Solution) {
        info!(nonce = %solution.nonce, "Submitted solution");
    }

    fn on_solved(&self, solution: &Solution, height: u64, value: u64) {
        info!(nonce = %solution.nonce, height, value, "Block mined");
    }

    fn on_rejected(&self, solution: &Solution, error: &str) {
        warn!(nonce = %solution.nonce, error, "Solution rejected");
    }
}

fn print_device_list() -> Result<()> {
    let row = |device: &str, id: &str, score: &str| {
        println!("{:<30.30} | {:<15.15} | {:<10.10}", device, id, score)
    };

    row("Device", "ID", "Score");

    for device in all_devices()? {
        row(
            &device.name().map_err(Error::from)?,
            &unique_id(&device).unwrap_or_else(|| "(n/a)".to_string()),
            &score_device(&device)?.to_string(),
        );
    }

    Ok(())
}

fn select_devices(args: &Args) -> Result<Vec<Device>> {
    let all = all_devices()?;
    let mut selected = Vec::new();

    if args.all_devices {
        selected.extend(all.iter().copied());
    }

    if args.best_device {
        let best = all
            .iter()
            .copied()
            .max_by_key(|device| score_device(device).unwrap_or(0))
            .ok_or_else(Error::no_devices)?;
        selected.push(best);
    }

    for id in &args.device_ids {
        let device = all
            .iter()
            .copied()
            .find(|device| unique_id(device).as_deref() == Some(id))
            .ok_or_else(|| Error::invalid_argument(format!("No device with ID: {}", id)))?;
        selected.push(device);
    }

    for &num in &args.device_nums {
        let device = all.get(num).copied().ok_or_else(|| {
            Error::invalid_argument(format!("Device number out of range: {}", num))
        })?;
        selected.push(device);
    }

    Ok(selected)
}

fn spawn_miner_thread(mut miner: Miner, state: Arc<SharedState>) {
    let name = miner.name().to_string();

    thread::spawn(move || {
        if let Err(e) = miner.run(Arc::clone(&state)) {
            error!(miner = %name, error = %e, "Miner failed, stopping");
            state.stop();
        }
    });
}

fn spawn_status_thread(state: Arc<SharedState>) {
    thread::spawn(move || {
        let mut last = state.hashes_completed();

        while !state.is_stopped() {
            thread::sleep(STATUS_INTERVAL);

            let now = state.hashes_completed();
            let rate = (now - last) as f64 / STATUS_INTERVAL.as_secs_f64();
            last = now;

            info!("Hashrate: {}", utils::format_hashrate(rate));
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    utils::init_logging(args.verbose);

    if args.list_devices {
        print_device_list()?;
        return Ok(());
    }

    let devices = select_devices(&args)?;
    info!("{} device(s) selected", devices.len());

    if devices.is_empty() {
        error!("No devices selected");
        std::process::exit(1);
    }

    let mut miners = Vec::new();
    for device in devices {
        let options = MinerOptions::new(
            args.miner_prefix(),
            args.worksize,
            args.vector_width,
            args.cl_opts.clone(),
        )?;

        let miner = Miner::new(device, options)?;
        info!("Created miner: {}", miner);
        miners.push(miner);
    }

    for miner in &mut miners {
        miner.run_tests()?;
    }
    info!("Tests completed successfully");

    if args.only_test {
        return Ok(());
    }

    let state = Arc::new(SharedState::new(args.address));

    for miner in miners {
        spawn_miner_thread(miner, Arc::clone(&state));
    }

    spawn_status_thread(Arc::clone(&state));

    if let Some(secs) = args.exit_after {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            info!("Exit timer elapsed, stopping");
            state.stop();
        });
    }

    let options = NetOptions {
        auto_reconnect: true,
        events: Arc::new(StatusEvents),
    };

    let result = match args.demo {
        Some(work) => network::run_demo(work, Arc::clone(&state), options).await,
        None => network::run(&args.node, Arc::clone(&state), options).await,
    };

    info!("Mining client stopped");
    result
}
