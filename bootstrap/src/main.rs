mod config;
mod context;
mod error;
mod logging;
mod setup;

use crate::setup::utils::host::SystemHost;
use tracing::{error, info};

fn main() {
	logging::init();
	info!("Cluster bootstrap started.");
	let outcome = config::cluster().and_then(|config| setup::setup(&config, &SystemHost));
	match outcome {
		Ok(outcome) => {
			info!(
				"Cluster bootstrap finished successfully as {:?} ({} steps).",
				outcome.role,
				outcome.completed.len()
			);
			if let Some(follow_up) = outcome.follow_up {
				info!("{follow_up}");
			}
		}
		Err(err) => {
			error!("Bootstrap failed: {err}");
			std::process::exit(1);
		}
	}
}
