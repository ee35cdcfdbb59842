use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::SetupStep;
use tracing::{info, warn};

/// Refuses to touch the machine unless the run can finish: regular user,
/// passwordless sudo, every peer reachable.
pub struct Preflight;

impl SetupStep for Preflight {
	fn name(&self) -> &'static str {
		"Preflight"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		if ctx.identity.uid == 0 {
			return Err(InstallError::Precondition(
				"run as a regular user with passwordless sudo, not as root".to_owned(),
			));
		}
		if !Cmd::sudo("true").probe(ctx.host)? {
			return Err(InstallError::Precondition(format!(
				"passwordless sudo is not available for {}",
				ctx.identity.user
			)));
		}
		let wait_secs = ctx.config.ping_timeout.as_secs().max(1).to_string();
		let mut unreachable = Vec::new();
		for peer in ctx.peers() {
			let is_reachable = Cmd::new("ping")
				.args(["-c", "1", "-W", wait_secs.as_str()])
				.arg(peer.address.to_string())
				.probe(ctx.host)?;
			if is_reachable {
				info!("{} ({}) is reachable.", peer.name, peer.address);
			} else {
				warn!("{} ({}) is unreachable.", peer.name, peer.address);
				unreachable.push(format!("{} ({})", peer.name, peer.address));
			}
		}
		if !unreachable.is_empty() {
			return Err(InstallError::Precondition(format!(
				"unreachable peers: {}",
				unreachable.join(", ")
			)));
		}
		Ok(true)
	}

	fn set(&self, _ctx: &Context) -> Result<(), InstallError> {
		Err(InstallError::Precondition(
			"preflight failures must be fixed by the operator".to_owned(),
		))
	}
}
