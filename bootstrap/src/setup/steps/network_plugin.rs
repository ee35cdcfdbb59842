use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::{kctl, wait};
use crate::setup::SetupStep;
use tracing::info;

/// Calico pod network.
pub struct NetworkPlugin;

impl NetworkPlugin {
	pub const NAMESPACE: &str = "kube-system";
	pub const DAEMONSET: &str = "calico-node";
	pub const POD_LABEL: &str = "k8s-app=calico-node";

	fn pods_ready(ctx: &Context) -> Result<bool, InstallError> {
		let listing = kctl::pod_readiness(ctx, NetworkPlugin::NAMESPACE, NetworkPlugin::POD_LABEL)?;
		Ok(match wait::not_ready(&listing) {
			Some(pending) if pending.is_empty() => true,
			Some(pending) => {
				info!("Pods not ready yet: {}.", pending.join(", "));
				false
			}
			None => false,
		})
	}
}

impl SetupStep for NetworkPlugin {
	fn name(&self) -> &'static str {
		"NetworkPlugin"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		let is_installed = kctl::exists(
			ctx,
			"daemonset",
			NetworkPlugin::DAEMONSET,
			Some(NetworkPlugin::NAMESPACE),
		)?;
		if !is_installed {
			info!("Pod network is not installed.");
			return Ok(false);
		}
		NetworkPlugin::pods_ready(ctx)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		info!("Applying pod network manifest {}.", ctx.config.network_manifest_url);
		kctl::apply_url(ctx, &ctx.config.network_manifest_url)?;
		wait::until(
			"calico-node pods",
			ctx.config.network_timeout,
			ctx.config.poll_interval,
			|| NetworkPlugin::pods_ready(ctx),
		)
	}
}
