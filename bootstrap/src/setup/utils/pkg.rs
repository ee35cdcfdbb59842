use crate::error::InstallError;
use crate::setup::utils::host::{Cmd, Host};
use std::path::Path;
use tracing::info;

pub fn is_installed(host: &dyn Host, package_name: &str) -> Result<bool, InstallError> {
	let output = host.exec(&Cmd::new("dpkg-query").args(["-W", "-f=${Status}", package_name]))?;
	if !output.success() {
		return Ok(false);
	}
	let status = output.stdout.trim();
	Ok(status == "install ok installed" || status == "hold ok installed")
}

pub fn all_installed(host: &dyn Host, package_names: &[&str]) -> Result<bool, InstallError> {
	for package_name in package_names {
		if !is_installed(host, package_name)? {
			info!("{package_name} is not installed.");
			return Ok(false);
		}
	}
	Ok(true)
}

pub fn is_held(host: &dyn Host, package_names: &[&str]) -> Result<bool, InstallError> {
	let held = Cmd::new("apt-mark").arg("showhold").stdout(host)?;
	Ok(package_names
		.iter()
		.all(|name| held.lines().any(|line| line.trim() == *name)))
}

pub fn update(host: &dyn Host) -> Result<(), InstallError> {
	Cmd::sudo("apt-get").arg("update").streamed().run(host)?;
	Ok(())
}

pub fn install(host: &dyn Host, package_names: &[&str]) -> Result<(), InstallError> {
	Cmd::sudo("apt-get")
		.args(["install", "-y", "--no-install-recommends"])
		.args(package_names.iter().copied())
		.env("DEBIAN_FRONTEND", "noninteractive")
		.streamed()
		.run(host)?;
	Ok(())
}

pub fn mark(host: &dyn Host, package_names: &[&str]) -> Result<(), InstallError> {
	Cmd::sudo("apt-mark")
		.arg("hold")
		.args(package_names.iter().copied())
		.run(host)?;
	Ok(())
}

/// Installs an apt signing key and source list unless both are already present.
pub fn ensure_repository(
	host: &dyn Host,
	key_url: &str,
	key_path: &str,
	list_path: &str,
	source_line: &str,
) -> Result<bool, InstallError> {
	let expected = format!("{source_line}\n");
	let is_key_present = host.exists(Path::new(key_path));
	let is_list_current = host
		.read_to_string(Path::new(list_path))
		.is_ok_and(|current| current == expected);
	if is_key_present && is_list_current {
		info!("Apt repository {list_path} already configured.");
		return Ok(false);
	}
	info!("Registering apt repository {list_path}.");
	Cmd::sudo("install").args(["-m", "0755", "-d", "/etc/apt/keyrings"]).run(host)?;
	Cmd::new("bash")
		.arg("-c")
		.arg(format!(
			"set -euo pipefail; curl -fsSL {key_url} | sudo -n gpg --dearmor --yes -o {key_path}"
		))
		.run(host)?;
	host.write_privileged(Path::new(list_path), &expected)?;
	Ok(true)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::setup::utils::fake::FakeHost;

	#[test]
	fn held_packages_count_as_installed() {
		let host = FakeHost::new()
			.respond("dpkg-query -W -f=${Status} kubelet", "hold ok installed")
			.respond("dpkg-query -W -f=${Status} kubectl", "deinstall ok config-files");
		assert!(is_installed(&host, "kubelet").unwrap());
		assert!(!is_installed(&host, "kubectl").unwrap());
	}

	#[test]
	fn hold_requires_every_package() {
		let host = FakeHost::new().respond("apt-mark showhold", "kubeadm\nkubelet\n");
		assert!(is_held(&host, &["kubelet", "kubeadm"]).unwrap());
		assert!(!is_held(&host, &["kubelet", "kubeadm", "kubectl"]).unwrap());
	}

	#[test]
	fn repository_is_registered_once() {
		let host = FakeHost::new();
		let line = "deb [signed-by=/etc/apt/keyrings/k.gpg] https://example.test/deb /";
		assert!(ensure_repository(
			&host,
			"https://example.test/key",
			"/etc/apt/keyrings/k.gpg",
			"/etc/apt/sources.list.d/k.list",
			line,
		)
		.unwrap());
		assert_eq!(host.file("/etc/apt/sources.list.d/k.list").unwrap(), format!("{line}\n"));
		let host = host.with_file("/etc/apt/keyrings/k.gpg", "key");
		assert!(!ensure_repository(
			&host,
			"https://example.test/key",
			"/etc/apt/keyrings/k.gpg",
			"/etc/apt/sources.list.d/k.list",
			line,
		)
		.unwrap());
	}
}
