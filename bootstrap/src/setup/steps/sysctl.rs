use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::SetupStep;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct Sysctl;

impl Sysctl {
	pub const CONFIG_PATH: &str = "/etc/sysctl.d/k8s.conf";
	pub const PARAMETERS: &[&str] = &[
		"net.bridge.bridge-nf-call-iptables = 1",
		"net.bridge.bridge-nf-call-ip6tables = 1",
		"net.ipv4.ip_forward = 1",
	];

	pub fn config_txt() -> String {
		Sysctl::PARAMETERS.join("\n") + "\n"
	}
}

impl SetupStep for Sysctl {
	fn name(&self) -> &'static str {
		"Sysctl"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		let Ok(config_txt) = ctx.host.read_to_string(Path::new(Sysctl::CONFIG_PATH)) else {
			info!("Sysctl config missing or unreadable.");
			return Ok(false);
		};
		let is_valid =
			Sha256::digest(config_txt.as_bytes()) == Sha256::digest(Sysctl::config_txt());
		if !is_valid {
			info!("Sysctl is misconfigured.");
			return Ok(false);
		}
		info!("Sysctl already configured.");
		Ok(true)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		info!("Configuring sysctl.");
		ctx.host
			.write_privileged(Path::new(Sysctl::CONFIG_PATH), &Sysctl::config_txt())?;
		Cmd::sudo("sysctl").arg("--system").run(ctx.host)?;
		info!("Sysctl has been successfully configured.");
		Ok(())
	}
}
