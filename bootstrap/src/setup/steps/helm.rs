use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::SetupStep;
use tracing::info;

pub struct Helm;

impl Helm {
	pub const INSTALL_SCRIPT_URL: &str =
		"https://raw.githubusercontent.com/helm/helm/main/scripts/get-helm-3";
}

impl SetupStep for Helm {
	fn name(&self) -> &'static str {
		"Helm"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		let is_installed = Cmd::new("helm").args(["version", "--short"]).probe(ctx.host)?;
		if is_installed {
			info!("Helm is already installed.");
		} else {
			info!("Helm is not installed.");
		}
		Ok(is_installed)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		info!("Installing Helm.");
		Cmd::new("bash")
			.arg("-c")
			.arg(format!(
				"set -euo pipefail; curl -fsSL {} | bash",
				Helm::INSTALL_SCRIPT_URL
			))
			.streamed()
			.run(ctx.host)?;
		info!("Helm has been installed.");
		Ok(())
	}
}
