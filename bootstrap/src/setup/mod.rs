mod steps;
pub(crate) mod utils;

use crate::config::{ClusterConfig, NodeRole};
use crate::context::{Context, Identity};
use crate::error::InstallError;
use crate::setup::steps::{
	Containerd, ControlPlane, DisableSwap, Helm, HostRegistry, KernelModules, Kubes, Namespaces,
	NetworkPlugin, Preflight, StorageClass, Sysctl, Verify, WorkerJoin,
};
use crate::setup::utils::host::Host;
use tracing::info;

pub trait SetupStep {
	fn name(&self) -> &'static str;

	/// Whether the machine is already in the state this step produces.
	fn check(&self, ctx: &Context) -> Result<bool, InstallError>;

	fn set(&self, ctx: &Context) -> Result<(), InstallError>;

	fn run(&self, ctx: &Context) -> Result<(), InstallError> {
		if self.check(ctx)? {
			return Ok(());
		}
		self.set(ctx)?;
		if !self.check(ctx)? {
			return Err(InstallError::StepFailed { step: self.name() });
		}
		Ok(())
	}
}

#[derive(Debug)]
pub struct Outcome {
	pub role: NodeRole,
	pub completed: Vec<&'static str>,
	pub follow_up: Option<String>,
}

const COMMON_STEPS: &[&dyn SetupStep] = &[
	&Preflight,
	&HostRegistry,
	&DisableSwap,
	&KernelModules,
	&Sysctl,
	&Containerd,
	&Kubes,
];

pub fn steps_for(role: NodeRole, config: &ClusterConfig) -> Vec<&'static dyn SetupStep> {
	let mut steps = COMMON_STEPS.to_vec();
	if role == NodeRole::ControlPlane {
		steps.extend_from_slice(&[&ControlPlane as &dyn SetupStep, &NetworkPlugin]);
		if config.remote_join {
			steps.push(&WorkerJoin);
		}
		steps.extend_from_slice(&[&Helm as &dyn SetupStep, &StorageClass, &Namespaces, &Verify]);
	}
	steps
}

pub fn setup(config: &ClusterConfig, host: &dyn Host) -> Result<Outcome, InstallError> {
	let identity = Identity::detect(host)?;
	let role = config.topology.role_of(identity.address);
	if role == NodeRole::Unrecognized {
		return Err(InstallError::UnrecognizedRole {
			address: identity.address,
		});
	}
	info!(
		"Provisioning {} ({}) as {role:?}.",
		identity.hostname, identity.address
	);
	let ctx = Context {
		config,
		identity,
		host,
	};
	let mut completed = Vec::new();
	for step in steps_for(role, config) {
		info!("Step {} started.", step.name());
		step.run(&ctx)?;
		completed.push(step.name());
	}
	let join_path = config.join_command_path.display();
	let follow_up = match role {
		NodeRole::Worker => Some(format!(
			"Worker is prepared. Run the join command generated on the control plane ({join_path}) with sudo to add this node."
		)),
		NodeRole::ControlPlane if !config.remote_join => Some(format!(
			"Control plane is ready. Copy {join_path} to each worker and run it with sudo."
		)),
		_ => None,
	};
	Ok(Outcome {
		role,
		completed,
		follow_up,
	})
}

#[cfg(test)]
pub(crate) mod testing {
	use crate::config::ClusterConfig;
	use crate::context::{Context, Identity};
	use crate::setup::utils::host::Host;
	use std::{net::Ipv4Addr, path::PathBuf};

	pub fn identity(hostname: &str, address: Ipv4Addr) -> Identity {
		Identity {
			user: "alice".to_owned(),
			uid: 1000,
			gid: 1000,
			home: PathBuf::from("/home/alice"),
			hostname: hostname.to_owned(),
			address,
		}
	}

	pub fn context<'a>(config: &'a ClusterConfig, host: &'a dyn Host) -> Context<'a> {
		Context {
			config,
			identity: identity("cp", Ipv4Addr::new(10, 0, 0, 1)),
			host,
		}
	}

	pub fn worker_context<'a>(config: &'a ClusterConfig, host: &'a dyn Host) -> Context<'a> {
		Context {
			config,
			identity: identity("worker1", Ipv4Addr::new(10, 0, 0, 2)),
			host,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::test_cluster;
	use crate::setup::utils::fake::FakeHost;
	use crate::setup::utils::host::CmdOutput;

	const WORKER_STEPS: &[&str] = &[
		"Preflight",
		"HostRegistry",
		"DisableSwap",
		"KernelModules",
		"Sysctl",
		"Containerd",
		"Kubes",
	];

	fn names(steps: &[&dyn SetupStep]) -> Vec<&'static str> {
		steps.iter().map(|step| step.name()).collect()
	}

	fn host_at(address: &str) -> FakeHost {
		FakeHost::new()
			.respond("id -un", "alice\n")
			.respond("id -u", "1000\n")
			.respond("id -g", "1000\n")
			.respond("getent passwd alice", "alice:x:1000:1000::/home/alice:/bin/bash\n")
			.respond("hostname", "node\n")
			.respond("hostname -I", &format!("{address}\n"))
	}

	/// A node whose host-level steps a previous run already applied.
	fn provisioned(address: &str) -> FakeHost {
		host_at(address)
			.with_file(
				"/etc/hosts",
				"127.0.0.1 localhost\n10.0.0.1 cp\n10.0.0.2 worker1\n10.0.0.3 worker2\n",
			)
			.with_file("/proc/swaps", "Filename Type Size Used Priority\n")
			.with_file("/etc/fstab", "UUID=abc / ext4 defaults 0 1\n#/swap.img none swap sw 0 0\n")
			.with_file("/etc/modules-load.d/k8s.conf", "overlay\nbr_netfilter\n")
			.with_file("/sys/module/overlay", "")
			.with_file("/sys/module/br_netfilter", "")
			.with_file(
				"/etc/sysctl.d/k8s.conf",
				"net.bridge.bridge-nf-call-iptables = 1\nnet.bridge.bridge-nf-call-ip6tables = 1\nnet.ipv4.ip_forward = 1\n",
			)
			.with_file("/etc/containerd/config.toml", "[plugins]\n  SystemdCgroup = true\n")
			.respond_prefix("dpkg-query", CmdOutput::ok("install ok installed"))
			.respond("apt-mark showhold", "kubeadm\nkubectl\nkubelet\n")
	}

	#[test]
	fn worker_plan_is_the_common_prefix() {
		let config = test_cluster();
		assert_eq!(names(&steps_for(NodeRole::Worker, &config)), WORKER_STEPS);
	}

	#[test]
	fn control_plane_plan_includes_join_only_when_enabled() {
		let mut config = test_cluster();
		let plan = names(&steps_for(NodeRole::ControlPlane, &config));
		assert_eq!(
			&plan[WORKER_STEPS.len()..],
			["ControlPlane", "NetworkPlugin", "Helm", "StorageClass", "Namespaces", "Verify"]
		);
		config.remote_join = true;
		let plan = names(&steps_for(NodeRole::ControlPlane, &config));
		assert_eq!(plan[WORKER_STEPS.len() + 2], "WorkerJoin");
	}

	#[test]
	fn worker_runs_only_worker_steps() {
		let config = test_cluster();
		let host = provisioned("10.0.0.2");
		let outcome = setup(&config, &host).unwrap();
		assert_eq!(outcome.role, NodeRole::Worker);
		assert_eq!(outcome.completed, WORKER_STEPS);
		assert!(outcome.follow_up.unwrap().contains("join command"));
		assert!(!host.ran("kubeadm init"));
		assert!(!host.ran("kubeadm token"));
		assert!(!host.ran("kubectl --kubeconfig"));
		assert!(!host.ran("get-helm"));
	}

	#[test]
	fn control_plane_runs_cluster_steps_after_host_steps() {
		let config = test_cluster();
		let kubectl = "kubectl --kubeconfig /home/alice/.kube/config";
		let host = provisioned("10.0.0.1")
			.with_file("/etc/kubernetes/admin.conf", "")
			.with_file("/home/alice/.kube/config", "")
			.with_file("/tmp/kubeadm_join_cmd.sh", "#!/bin/bash\nkubeadm join ...\n")
			.respond_prefix(
				&format!("{kubectl} get pods -n kube-system -l k8s-app=calico-node"),
				CmdOutput::ok("calico-node-a True\ncalico-node-b True\n"),
			)
			.respond_prefix(
				&format!("{kubectl} get storageclass local-path -o jsonpath"),
				CmdOutput::ok("true"),
			)
			.respond_prefix(
				&format!("{kubectl} get nodes -o jsonpath"),
				CmdOutput::ok("cp True\nworker1 True\nworker2 True\n"),
			);
		let outcome = setup(&config, &host).unwrap();
		assert_eq!(outcome.role, NodeRole::ControlPlane);
		assert_eq!(&outcome.completed[..WORKER_STEPS.len()], WORKER_STEPS);
		assert_eq!(
			&outcome.completed[WORKER_STEPS.len()..],
			["ControlPlane", "NetworkPlugin", "Helm", "StorageClass", "Namespaces", "Verify"]
		);
		let follow_up = outcome.follow_up.unwrap();
		assert!(follow_up.contains("Copy /tmp/kubeadm_join_cmd.sh to each worker"));
		assert!(!host.ran("kubeadm init"));
		assert!(!host.ran("scp"));
	}

	#[test]
	fn unrecognized_address_fails_before_any_step() {
		let config = test_cluster();
		let host = host_at("10.0.0.9");
		let err = setup(&config, &host).unwrap_err();
		assert!(matches!(
			err,
			InstallError::UnrecognizedRole { address } if address.to_string() == "10.0.0.9"
		));
		assert!(host
			.commands()
			.iter()
			.all(|cmd| !cmd.starts_with("sudo") && !cmd.starts_with("ping")));
	}
}
