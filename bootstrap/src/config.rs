use crate::error::InstallError;
use std::{collections::HashSet, net::Ipv4Addr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
	pub name: String,
	pub address: Ipv4Addr,
}

impl Member {
	fn new(name: &str, address: Ipv4Addr) -> Self {
		Member {
			name: name.to_owned(),
			address,
		}
	}
}

#[derive(Debug, Clone)]
pub struct Topology {
	pub control_plane: Member,
	pub workers: Vec<Member>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
	ControlPlane,
	Worker,
	Unrecognized,
}

impl Topology {
	pub fn members(&self) -> impl Iterator<Item = &Member> {
		std::iter::once(&self.control_plane).chain(self.workers.iter())
	}

	pub fn role_of(&self, address: Ipv4Addr) -> NodeRole {
		if self.control_plane.address == address {
			NodeRole::ControlPlane
		} else if self.workers.iter().any(|worker| worker.address == address) {
			NodeRole::Worker
		} else {
			NodeRole::Unrecognized
		}
	}

	pub fn validate(&self) -> Result<(), InstallError> {
		let mut addresses = HashSet::new();
		let mut names = HashSet::new();
		for member in self.members() {
			if !addresses.insert(member.address) {
				return Err(InstallError::Config(format!(
					"address {} is assigned to more than one node",
					member.address
				)));
			}
			if member.name.is_empty() || !names.insert(member.name.as_str()) {
				return Err(InstallError::Config(format!(
					"node name '{}' is empty or duplicated",
					member.name
				)));
			}
		}
		Ok(())
	}
}

/// What the worker joiner does when one worker fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
	AbortOnFirstFailure,
	ContinueOnFailure,
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
	pub topology: Topology,
	pub pod_cidr: String,
	pub service_cidr: String,
	pub kubernetes_version: String,
	pub tooling_channel: String,
	pub network_manifest_url: String,
	pub storage_manifest_url: String,
	pub storage_class: String,
	pub namespaces: Vec<String>,
	pub ping_timeout: Duration,
	pub network_timeout: Duration,
	pub join_timeout: Duration,
	pub verify_timeout: Duration,
	pub poll_interval: Duration,
	pub remote_join: bool,
	pub join_policy: JoinPolicy,
	pub ssh_user: String,
	pub join_command_path: PathBuf,
}

impl ClusterConfig {
	pub const CONTROL_PLANE_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 56, 10);
	pub const WORKER_ADDRESSES: [Ipv4Addr; 2] =
		[Ipv4Addr::new(192, 168, 56, 11), Ipv4Addr::new(192, 168, 56, 12)];
	pub const KUBERNETES_VERSION: &str = "v1.34.2";
	pub const TOOLING_CHANNEL: &str = "v1.34";
	pub const POD_CIDR: &str = "10.244.0.0/16";
	pub const SERVICE_CIDR: &str = "10.96.0.0/12";
	pub const CALICO_MANIFEST_URL: &str =
		"https://raw.githubusercontent.com/projectcalico/calico/v3.27.0/manifests/calico.yaml";
	pub const LOCAL_PATH_MANIFEST_URL: &str =
		"https://raw.githubusercontent.com/rancher/local-path-provisioner/v0.0.26/deploy/local-path-storage.yaml";
	pub const NAMESPACES: &[&str] = &["monitoring", "logging", "apps"];
	pub const JOIN_COMMAND_PATH: &str = "/tmp/kubeadm_join_cmd.sh";

	pub fn validate(&self) -> Result<(), InstallError> {
		self.topology.validate()?;
		if self.pod_cidr == self.service_cidr {
			return Err(InstallError::Config(
				"pod and service address ranges must differ".to_owned(),
			));
		}
		if self.poll_interval.is_zero() {
			return Err(InstallError::Config("poll interval must be non-zero".to_owned()));
		}
		Ok(())
	}
}

/// The cluster this binary provisions.
pub fn cluster() -> Result<ClusterConfig, InstallError> {
	let [worker1, worker2] = ClusterConfig::WORKER_ADDRESSES;
	let config = ClusterConfig {
		topology: Topology {
			control_plane: Member::new("k8s-master", ClusterConfig::CONTROL_PLANE_ADDRESS),
			workers: vec![
				Member::new("k8s-worker1", worker1),
				Member::new("k8s-worker2", worker2),
			],
		},
		pod_cidr: ClusterConfig::POD_CIDR.to_owned(),
		service_cidr: ClusterConfig::SERVICE_CIDR.to_owned(),
		kubernetes_version: ClusterConfig::KUBERNETES_VERSION.to_owned(),
		tooling_channel: ClusterConfig::TOOLING_CHANNEL.to_owned(),
		network_manifest_url: ClusterConfig::CALICO_MANIFEST_URL.to_owned(),
		storage_manifest_url: ClusterConfig::LOCAL_PATH_MANIFEST_URL.to_owned(),
		storage_class: "local-path".to_owned(),
		namespaces: ClusterConfig::NAMESPACES.iter().map(|ns| ns.to_string()).collect(),
		ping_timeout: Duration::from_secs(2),
		network_timeout: Duration::from_secs(300),
		join_timeout: Duration::from_secs(300),
		verify_timeout: Duration::from_secs(300),
		poll_interval: Duration::from_secs(5),
		remote_join: false,
		join_policy: JoinPolicy::ContinueOnFailure,
		ssh_user: "ubuntu".to_owned(),
		join_command_path: PathBuf::from(ClusterConfig::JOIN_COMMAND_PATH),
	};
	config.validate()?;
	Ok(config)
}

#[cfg(test)]
pub(crate) fn test_cluster() -> ClusterConfig {
	let mut config = cluster().expect("Compiled-in cluster config is valid.");
	config.topology = Topology {
		control_plane: Member::new("cp", Ipv4Addr::new(10, 0, 0, 1)),
		workers: vec![
			Member::new("worker1", Ipv4Addr::new(10, 0, 0, 2)),
			Member::new("worker2", Ipv4Addr::new(10, 0, 0, 3)),
		],
	};
	config.network_timeout = Duration::ZERO;
	config.join_timeout = Duration::ZERO;
	config.verify_timeout = Duration::ZERO;
	config.poll_interval = Duration::ZERO;
	config
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn compiled_in_cluster_is_valid() {
		let config = cluster().unwrap();
		assert_eq!(config.topology.members().count(), 3);
		assert_eq!(config.join_policy, JoinPolicy::ContinueOnFailure);
	}

	#[test]
	fn role_is_derived_from_address() {
		let topology = test_cluster().topology;
		assert_eq!(topology.role_of(Ipv4Addr::new(10, 0, 0, 1)), NodeRole::ControlPlane);
		assert_eq!(topology.role_of(Ipv4Addr::new(10, 0, 0, 2)), NodeRole::Worker);
		assert_eq!(topology.role_of(Ipv4Addr::new(10, 0, 0, 3)), NodeRole::Worker);
		assert_eq!(topology.role_of(Ipv4Addr::new(10, 0, 0, 9)), NodeRole::Unrecognized);
	}

	#[test]
	fn duplicate_addresses_are_rejected() {
		let mut topology = test_cluster().topology;
		topology.workers[1].address = topology.control_plane.address;
		assert!(matches!(topology.validate(), Err(InstallError::Config(_))));
	}

	#[test]
	fn duplicate_names_are_rejected() {
		let mut topology = test_cluster().topology;
		topology.workers[1].name = "worker1".to_owned();
		assert!(matches!(topology.validate(), Err(InstallError::Config(_))));
	}
}
