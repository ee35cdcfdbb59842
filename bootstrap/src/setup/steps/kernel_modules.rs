use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::SetupStep;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct KernelModules;

impl KernelModules {
	pub const CONFIG_PATH: &str = "/etc/modules-load.d/k8s.conf";
	pub const MODULES: &[&str] = &["overlay", "br_netfilter"];

	pub fn config_txt() -> String {
		KernelModules::MODULES.join("\n") + "\n"
	}

	pub fn is_loaded(ctx: &Context, module_name: &str) -> bool {
		ctx.host.exists(&Path::new("/sys/module/").join(module_name))
	}

	pub fn load(ctx: &Context, module_name: &str) -> Result<(), InstallError> {
		info!("Loading kernel module: {module_name}.");
		Cmd::sudo("modprobe").arg(module_name).run(ctx.host)?;
		Ok(())
	}
}

impl SetupStep for KernelModules {
	fn name(&self) -> &'static str {
		"KernelModules"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		let Ok(config_txt) = ctx.host.read_to_string(Path::new(KernelModules::CONFIG_PATH)) else {
			info!("Kernel module config missing or unreadable.");
			return Ok(false);
		};
		let is_valid =
			Sha256::digest(config_txt.as_bytes()) == Sha256::digest(KernelModules::config_txt());
		if !is_valid {
			info!("Kernel modules are misconfigured.");
			return Ok(false);
		}
		for module_name in KernelModules::MODULES {
			if !KernelModules::is_loaded(ctx, module_name) {
				info!("Kernel module {module_name} not loaded.");
				return Ok(false);
			}
		}
		info!("Kernel modules are already configured and loaded.");
		Ok(true)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		info!("Configuring kernel modules.");
		ctx.host.write_privileged(
			Path::new(KernelModules::CONFIG_PATH),
			&KernelModules::config_txt(),
		)?;
		for module_name in KernelModules::MODULES {
			KernelModules::load(ctx, module_name)?;
		}
		info!("Kernel modules have been successfully configured and loaded.");
		Ok(())
	}
}
