use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::utils::pkg;
use crate::setup::SetupStep;
use std::path::Path;
use tracing::info;

pub struct Containerd;

impl Containerd {
	pub const SERVICE_NAME: &str = "containerd";
	pub const PACKAGE_NAME: &str = "containerd.io";
	pub const DEPENDENCIES: &[&str] = &["ca-certificates", "curl", "gnupg"];
	pub const CONFIG_PATH: &str = "/etc/containerd/config.toml";
	pub const APT_KEY_URL: &str = "https://download.docker.com/linux/ubuntu/gpg";
	pub const APT_KEY_PATH: &str = "/etc/apt/keyrings/docker.gpg";
	pub const APT_CONFIG_PATH: &str = "/etc/apt/sources.list.d/docker.list";

	pub fn is_systemd_cgroup(config_txt: &str) -> bool {
		config_txt
			.lines()
			.any(|line| line.trim() == "SystemdCgroup = true")
	}

	/// Flips every `SystemdCgroup = false` to `true`, keeping indentation.
	pub fn enable_systemd_cgroup(config_txt: &str) -> String {
		config_txt
			.split_inclusive('\n')
			.map(|line| {
				if line.trim() == "SystemdCgroup = false" {
					line.replacen("false", "true", 1)
				} else {
					line.to_owned()
				}
			})
			.collect()
	}

	fn source_line(ctx: &Context) -> Result<String, InstallError> {
		let arch = Cmd::new("dpkg").arg("--print-architecture").stdout(ctx.host)?;
		let codename = Cmd::new("lsb_release").arg("-cs").stdout(ctx.host)?;
		Ok(format!(
			"deb [arch={arch} signed-by={}] https://download.docker.com/linux/ubuntu {codename} stable",
			Containerd::APT_KEY_PATH
		))
	}

	fn is_active(ctx: &Context) -> Result<bool, InstallError> {
		Cmd::new("systemctl")
			.args(["is-active", "--quiet", Containerd::SERVICE_NAME])
			.probe(ctx.host)
	}
}

impl SetupStep for Containerd {
	fn name(&self) -> &'static str {
		"Containerd"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		if !pkg::is_installed(ctx.host, Containerd::PACKAGE_NAME)? {
			info!("Containerd is not installed.");
			return Ok(false);
		}
		let is_configured = ctx
			.host
			.read_to_string(Path::new(Containerd::CONFIG_PATH))
			.is_ok_and(|config_txt| Containerd::is_systemd_cgroup(&config_txt));
		if !is_configured {
			info!("Containerd is not configured for systemd cgroups.");
			return Ok(false);
		}
		if !Containerd::is_active(ctx)? {
			info!("Containerd is not active.");
			return Ok(false);
		}
		info!("Containerd is already configured and active.");
		Ok(true)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		if !pkg::is_installed(ctx.host, Containerd::PACKAGE_NAME)? {
			info!("Installing containerd via apt-get.");
			pkg::update(ctx.host)?;
			pkg::install(ctx.host, Containerd::DEPENDENCIES)?;
			let source_line = Containerd::source_line(ctx)?;
			pkg::ensure_repository(
				ctx.host,
				Containerd::APT_KEY_URL,
				Containerd::APT_KEY_PATH,
				Containerd::APT_CONFIG_PATH,
				&source_line,
			)?;
			pkg::update(ctx.host)?;
			pkg::install(ctx.host, &[Containerd::PACKAGE_NAME])?;
		}
		Cmd::sudo("mkdir").args(["-p", "/etc/containerd"]).run(ctx.host)?;
		let config_path = Path::new(Containerd::CONFIG_PATH);
		let current = ctx.host.read_to_string(config_path).unwrap_or_default();
		let config_txt = if current.trim().is_empty() {
			info!("Generating default containerd config.");
			Cmd::new("containerd").args(["config", "default"]).run(ctx.host)?.stdout
		} else {
			info!("Containerd config already exists, skipping generation.");
			current.clone()
		};
		let config_txt = Containerd::enable_systemd_cgroup(&config_txt);
		if config_txt != current {
			info!("Writing {} with systemd cgroups enabled.", Containerd::CONFIG_PATH);
			ctx.host.write_privileged(config_path, &config_txt)?;
		}
		info!("Restarting containerd service.");
		Cmd::sudo("systemctl")
			.args(["restart", Containerd::SERVICE_NAME])
			.run(ctx.host)?;
		Cmd::sudo("systemctl")
			.args(["enable", Containerd::SERVICE_NAME])
			.run(ctx.host)?;
		Ok(())
	}
}
