use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::utils::pkg;
use crate::setup::SetupStep;
use tracing::info;

pub struct Kubes;

impl Kubes {
	pub const PACKAGE_NAMES: &[&str] = &["kubelet", "kubeadm", "kubectl"];
	pub const DEPENDENCIES: &[&str] = &["apt-transport-https", "ca-certificates", "curl", "gpg"];
	pub const APT_CONFIG_PATH: &str = "/etc/apt/sources.list.d/kubernetes.list";
	pub const APT_KEY_PATH: &str = "/etc/apt/keyrings/kubernetes-apt-keyring.gpg";

	pub fn base_url(channel: &str) -> String {
		format!("https://pkgs.k8s.io/core:/stable:/{channel}/deb")
	}
}

impl SetupStep for Kubes {
	fn name(&self) -> &'static str {
		"Kubes"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		if !pkg::all_installed(ctx.host, Kubes::PACKAGE_NAMES)? {
			return Ok(false);
		}
		if !pkg::is_held(ctx.host, Kubes::PACKAGE_NAMES)? {
			info!("Kubes are installed but not held.");
			return Ok(false);
		}
		info!("Kubes are installed and held.");
		Ok(true)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		info!(
			"Installing Kubernetes {} tooling via apt-get.",
			ctx.config.tooling_channel
		);
		let base_url = Kubes::base_url(&ctx.config.tooling_channel);
		pkg::update(ctx.host)?;
		pkg::install(ctx.host, Kubes::DEPENDENCIES)?;
		pkg::ensure_repository(
			ctx.host,
			&format!("{base_url}/Release.key"),
			Kubes::APT_KEY_PATH,
			Kubes::APT_CONFIG_PATH,
			&format!("deb [signed-by={}] {base_url}/ /", Kubes::APT_KEY_PATH),
		)?;
		pkg::update(ctx.host)?;
		pkg::install(ctx.host, Kubes::PACKAGE_NAMES)?;
		pkg::mark(ctx.host, Kubes::PACKAGE_NAMES)?;
		Cmd::sudo("systemctl")
			.args(["enable", "--now", "kubelet"])
			.run(ctx.host)?;
		info!("Kubernetes tooling installed.");
		Ok(())
	}
}
