use crate::config::Member;
use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use crate::setup::SetupStep;
use std::{
	path::Path,
	time::{SystemTime, UNIX_EPOCH},
};
use tracing::info;

pub struct HostRegistry;

impl HostRegistry {
	pub const HOSTS_PATH: &str = "/etc/hosts";

	/// Lines to append so every member resolves, skipping ones already present.
	pub fn missing_entries<'a>(
		hosts_txt: &str,
		members: impl Iterator<Item = &'a Member>,
	) -> Vec<String> {
		members
			.filter(|member| {
				let address = member.address.to_string();
				!hosts_txt.lines().any(|line| {
					let line = line.split('#').next().unwrap_or_default();
					let mut fields = line.split_whitespace();
					fields.next() == Some(address.as_str())
						&& fields.any(|name| name == member.name)
				})
			})
			.map(|member| format!("{} {}", member.address, member.name))
			.collect()
	}
}

impl SetupStep for HostRegistry {
	fn name(&self) -> &'static str {
		"HostRegistry"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		let hosts_txt = ctx.host.read_to_string(Path::new(HostRegistry::HOSTS_PATH))?;
		let missing = HostRegistry::missing_entries(&hosts_txt, ctx.config.topology.members());
		if missing.is_empty() {
			info!("All cluster members are in {}.", HostRegistry::HOSTS_PATH);
			Ok(true)
		} else {
			info!("{} cluster members missing from {}.", missing.len(), HostRegistry::HOSTS_PATH);
			Ok(false)
		}
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		let hosts_path = Path::new(HostRegistry::HOSTS_PATH);
		let hosts_txt = ctx.host.read_to_string(hosts_path)?;
		let missing = HostRegistry::missing_entries(&hosts_txt, ctx.config.topology.members());
		if missing.is_empty() {
			return Ok(());
		}
		let stamp = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|elapsed| elapsed.as_secs())
			.unwrap_or_default();
		let backup = format!("{}.bak.{stamp}", HostRegistry::HOSTS_PATH);
		info!("Backing up {} to {backup}.", HostRegistry::HOSTS_PATH);
		Cmd::sudo("cp")
			.args(["-p", HostRegistry::HOSTS_PATH, backup.as_str()])
			.run(ctx.host)?;
		let mut addition = if hosts_txt.is_empty() || hosts_txt.ends_with('\n') {
			String::new()
		} else {
			"\n".to_owned()
		};
		for entry in &missing {
			info!("Adding '{entry}' to {}.", HostRegistry::HOSTS_PATH);
			addition.push_str(entry);
			addition.push('\n');
		}
		ctx.host.append_privileged(hosts_path, &addition)
	}
}
