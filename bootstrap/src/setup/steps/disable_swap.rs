use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::SetupStep;
use std::path::Path;
use tracing::info;

pub struct DisableSwap;

impl DisableSwap {
	pub const FSTAB_PATH: &str = "/etc/fstab";
	pub const SWAPS_PATH: &str = "/proc/swaps";

	fn is_swap_entry(line: &str) -> bool {
		!line.trim_start().starts_with('#') && line.split_whitespace().nth(2) == Some("swap")
	}

	/// Comments out active swap mounts, leaving every other byte in place.
	pub fn comment_swap_entries(fstab: &str) -> String {
		fstab
			.split_inclusive('\n')
			.map(|line| {
				if DisableSwap::is_swap_entry(line) {
					format!("#{line}")
				} else {
					line.to_owned()
				}
			})
			.collect()
	}
}

impl SetupStep for DisableSwap {
	fn name(&self) -> &'static str {
		"DisableSwap"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		let swaps = ctx.host.read_to_string(Path::new(DisableSwap::SWAPS_PATH))?;
		if swaps.lines().count() > 1 {
			info!("Swap is enabled.");
			return Ok(false);
		}
		let Ok(config_txt) = ctx.host.read_to_string(Path::new(DisableSwap::FSTAB_PATH)) else {
			info!("fstab is missing or unreadable.");
			return Ok(false);
		};
		if config_txt.lines().any(DisableSwap::is_swap_entry) {
			info!("Swap is enabled in fstab.");
			return Ok(false);
		}
		info!("Swap is already disabled.");
		Ok(true)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		info!("Disabling swap.");
		Cmd::sudo("swapoff").arg("-a").run(ctx.host)?;
		let config_path = Path::new(DisableSwap::FSTAB_PATH);
		let original = ctx.host.read_to_string(config_path)?;
		let commented = DisableSwap::comment_swap_entries(&original);
		if commented != original {
			info!("Commenting out swap entries in {}.", DisableSwap::FSTAB_PATH);
			ctx.host.write_privileged(config_path, &commented)?;
		}
		Ok(())
	}
}
