use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::{kctl, wait};
use crate::setup::SetupStep;
use tracing::{info, warn};

/// Read-only report on node and system pod health.
pub struct Verify;

impl Verify {
	fn nodes_ready(ctx: &Context) -> Result<bool, InstallError> {
		let listing = kctl::node_readiness(ctx)?;
		Ok(match wait::not_ready(&listing) {
			Some(pending) if pending.is_empty() => true,
			Some(pending) => {
				info!("Nodes not ready yet: {}.", pending.join(", "));
				false
			}
			None => false,
		})
	}

	fn report(ctx: &Context, title: &str, args: &[&str]) {
		match kctl::kubectl(ctx).args(args.iter().copied()).stdout(ctx.host) {
			Ok(out) => info!("{title}:\n{out}"),
			Err(err) => warn!("Could not read {title}: {err}"),
		}
	}
}

impl SetupStep for Verify {
	fn name(&self) -> &'static str {
		"Verify"
	}

	fn check(&self, _ctx: &Context) -> Result<bool, InstallError> {
		Ok(false)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		let waited = wait::until(
			"cluster nodes",
			ctx.config.verify_timeout,
			ctx.config.poll_interval,
			|| Verify::nodes_ready(ctx),
		);
		match waited {
			Ok(()) => info!("All nodes are ready."),
			Err(err @ InstallError::Timeout { .. }) => warn!("{err}"),
			Err(err) => warn!("Node readiness unavailable: {err}"),
		}
		Verify::report(ctx, "Cluster info", &["cluster-info"]);
		Verify::report(ctx, "Nodes", &["get", "nodes", "-o", "wide"]);
		Verify::report(ctx, "System pods", &["get", "pods", "-n", "kube-system"]);
		Ok(())
	}

	/// Diagnostics only: never fails an otherwise completed run.
	fn run(&self, ctx: &Context) -> Result<(), InstallError> {
		self.set(ctx)
	}
}
