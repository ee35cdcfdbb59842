use crate::config::{JoinPolicy, Member};
use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::utils::{kctl, wait};
use crate::setup::SetupStep;
use std::net::Ipv4Addr;
use tracing::{error, info};

/// Pushes the join script to every worker over scp and runs it over ssh.
pub struct WorkerJoin;

impl WorkerJoin {
	const SSH_OPTIONS: &[&str] = &[
		"-o",
		"BatchMode=yes",
		"-o",
		"ConnectTimeout=10",
		"-o",
		"StrictHostKeyChecking=accept-new",
	];

	fn is_registered(registered: &[Ipv4Addr], worker: &Member) -> bool {
		registered.contains(&worker.address)
	}

	fn join(ctx: &Context, worker: &Member) -> Result<(), InstallError> {
		let script = ctx.config.join_command_path.display().to_string();
		let target = format!("{}@{}", ctx.config.ssh_user, worker.address);
		info!("Copying join command to {} ({}).", worker.name, worker.address);
		Cmd::new("scp")
			.args(WorkerJoin::SSH_OPTIONS.iter().copied())
			.arg(&script)
			.arg(format!("{target}:{script}"))
			.run(ctx.host)?;
		info!("Running join command on {}.", worker.name);
		Cmd::new("ssh")
			.args(WorkerJoin::SSH_OPTIONS.iter().copied())
			.arg(&target)
			.args(["sudo", "bash", script.as_str()])
			.streamed()
			.run(ctx.host)?;
		info!("{} joined the cluster.", worker.name);
		Ok(())
	}

	fn all_registered(ctx: &Context) -> Result<bool, InstallError> {
		let registered = kctl::node_addresses(ctx)?;
		Ok(ctx
			.config
			.topology
			.workers
			.iter()
			.all(|worker| WorkerJoin::is_registered(&registered, worker)))
	}
}

impl SetupStep for WorkerJoin {
	fn name(&self) -> &'static str {
		"WorkerJoin"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		let is_joined = WorkerJoin::all_registered(ctx)?;
		if is_joined {
			info!("All workers are registered.");
		}
		Ok(is_joined)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		let path = &ctx.config.join_command_path;
		if !ctx.host.exists(path) {
			return Err(InstallError::JoinCommandMissing { path: path.clone() });
		}
		let registered = kctl::node_addresses(ctx)?;
		let mut failures = Vec::new();
		for worker in &ctx.config.topology.workers {
			if WorkerJoin::is_registered(&registered, worker) {
				info!("{} is already registered, skipping.", worker.name);
				continue;
			}
			if let Err(err) = WorkerJoin::join(ctx, worker) {
				error!("Failed to join {} ({}): {err}", worker.name, worker.address);
				failures.push(format!("{} ({}): {err}", worker.name, worker.address));
				if ctx.config.join_policy == JoinPolicy::AbortOnFirstFailure {
					break;
				}
			}
		}
		if !failures.is_empty() {
			return Err(InstallError::WorkerJoin { failures });
		}
		wait::until(
			"workers to register",
			ctx.config.join_timeout,
			ctx.config.poll_interval,
			|| WorkerJoin::all_registered(ctx),
		)
	}
}
