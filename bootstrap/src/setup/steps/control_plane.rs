use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::SetupStep;
use std::path::Path;
use tracing::info;

pub struct ControlPlane;

impl ControlPlane {
	pub const ADMIN_CONF: &str = "/etc/kubernetes/admin.conf";

	fn kubeadm_init(ctx: &Context) -> Result<(), InstallError> {
		let config = ctx.config;
		let control_plane = &config.topology.control_plane;
		info!("Kubeadm init for {}.", control_plane.name);
		Cmd::sudo("kubeadm")
			.arg("init")
			.args(["--apiserver-advertise-address".to_owned(), control_plane.address.to_string()])
			.args(["--pod-network-cidr", config.pod_cidr.as_str()])
			.args(["--service-cidr", config.service_cidr.as_str()])
			.args(["--kubernetes-version", config.kubernetes_version.as_str()])
			.args(["--node-name", control_plane.name.as_str()])
			.streamed()
			.run(ctx.host)?;
		info!("Kubeadm initialized.");
		Ok(())
	}

	fn install_kubeconfig(ctx: &Context) -> Result<(), InstallError> {
		let kubeconfig = ctx.kubeconfig().display().to_string();
		let kube_dir = ctx.identity.home.join(".kube").display().to_string();
		Cmd::new("mkdir").args(["-p", kube_dir.as_str()]).run(ctx.host)?;
		Cmd::sudo("cp")
			.args(["-f", ControlPlane::ADMIN_CONF, kubeconfig.as_str()])
			.run(ctx.host)?;
		Cmd::sudo("chown")
			.arg(format!("{}:{}", ctx.identity.uid, ctx.identity.gid))
			.arg(&kubeconfig)
			.run(ctx.host)?;
		info!("Kubeconfig set for {} at {kubeconfig}.", ctx.identity.user);
		Ok(())
	}

	fn write_join_command(ctx: &Context) -> Result<(), InstallError> {
		let cmd = Cmd::sudo("kubeadm").args(["token", "create", "--print-join-command"]);
		let join_cmd = cmd.stdout(ctx.host)?;
		if !join_cmd.starts_with("kubeadm join ") {
			return Err(InstallError::Parse {
				cmd: cmd.to_string(),
				detail: format!("expected a kubeadm join command, got {join_cmd:?}"),
			});
		}
		let path = &ctx.config.join_command_path;
		ctx.host
			.write(path, &format!("#!/bin/bash\n{join_cmd}\n"))?;
		Cmd::new("chmod")
			.args(["0755".to_owned(), path.display().to_string()])
			.run(ctx.host)?;
		info!("Join command written to {}.", path.display());
		Ok(())
	}
}

impl SetupStep for ControlPlane {
	fn name(&self) -> &'static str {
		"ControlPlane"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		if !ctx.host.exists(Path::new(ControlPlane::ADMIN_CONF)) {
			info!("ControlPlane is not initialized.");
			return Ok(false);
		}
		if !ctx.host.exists(&ctx.kubeconfig()) {
			info!("Kubeconfig missing for {}.", ctx.identity.user);
			return Ok(false);
		}
		if !ctx.host.exists(&ctx.config.join_command_path) {
			info!("Join command has not been generated.");
			return Ok(false);
		}
		info!("ControlPlane is already set up.");
		Ok(true)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		if ctx.host.exists(Path::new(ControlPlane::ADMIN_CONF)) {
			info!("Cluster already bootstrapped, skipping kubeadm init.");
		} else {
			ControlPlane::kubeadm_init(ctx)?;
		}
		ControlPlane::install_kubeconfig(ctx)?;
		ControlPlane::write_join_command(ctx)
	}
}
