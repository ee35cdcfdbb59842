use crate::config::{ClusterConfig, Member};
use crate::error::InstallError;
use crate::setup::utils::host::{Cmd, Host};
use std::{net::Ipv4Addr, path::PathBuf};

/// Who and where this process is.
#[derive(Debug, Clone)]
pub struct Identity {
	pub user: String,
	pub uid: u32,
	pub gid: u32,
	pub home: PathBuf,
	pub hostname: String,
	pub address: Ipv4Addr,
}

impl Identity {
	pub fn detect(host: &dyn Host) -> Result<Self, InstallError> {
		let user = Cmd::new("id").arg("-un").stdout(host)?;
		let uid = parse_id(&Cmd::new("id").arg("-u"), host)?;
		let gid = parse_id(&Cmd::new("id").arg("-g"), host)?;
		let passwd = Cmd::new("getent").args(["passwd", user.as_str()]).stdout(host)?;
		let home = passwd
			.split(':')
			.nth(5)
			.filter(|home| !home.is_empty())
			.map(PathBuf::from)
			.ok_or_else(|| InstallError::Parse {
				cmd: format!("getent passwd {user}"),
				detail: "no home directory field".to_owned(),
			})?;
		let hostname = Cmd::new("hostname").stdout(host)?;
		let address = primary_address(host)?;
		Ok(Identity {
			user,
			uid,
			gid,
			home,
			hostname,
			address,
		})
	}
}

fn parse_id(cmd: &Cmd, host: &dyn Host) -> Result<u32, InstallError> {
	let out = cmd.stdout(host)?;
	out.parse().map_err(|_| InstallError::Parse {
		cmd: cmd.to_string(),
		detail: format!("'{out}' is not a numeric id"),
	})
}

/// First IPv4 address reported by `hostname -I`.
fn primary_address(host: &dyn Host) -> Result<Ipv4Addr, InstallError> {
	let cmd = Cmd::new("hostname").arg("-I");
	let out = cmd.stdout(host)?;
	out.split_whitespace()
		.find_map(|addr| addr.parse::<Ipv4Addr>().ok())
		.ok_or_else(|| InstallError::Parse {
			cmd: cmd.to_string(),
			detail: format!("no IPv4 address in '{out}'"),
		})
}

/// Everything a setup step may look at, built once per run.
pub struct Context<'a> {
	pub config: &'a ClusterConfig,
	pub identity: Identity,
	pub host: &'a dyn Host,
}

impl<'a> Context<'a> {
	pub fn kubeconfig(&self) -> PathBuf {
		self.identity.home.join(".kube").join("config")
	}

	/// Cluster members other than this node.
	pub fn peers(&self) -> impl Iterator<Item = &Member> {
		let local = self.identity.address;
		self.config
			.topology
			.members()
			.filter(move |member| member.address != local)
	}
}
