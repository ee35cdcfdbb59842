use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::host::Cmd;
use std::net::Ipv4Addr;

pub(crate) const READY_JSONPATH: &str =
	r#"jsonpath={range .items[*]}{.metadata.name}{" "}{.status.conditions[?(@.type=="Ready")].status}{"\n"}{end}"#;

pub(crate) const INTERNAL_IP_JSONPATH: &str =
	r#"jsonpath={range .items[*]}{.status.addresses[?(@.type=="InternalIP")].address}{"\n"}{end}"#;

pub fn kubectl(ctx: &Context) -> Cmd {
	Cmd::new("kubectl").args(["--kubeconfig".to_owned(), ctx.kubeconfig().display().to_string()])
}

pub fn generate_yaml(ctx: &Context, create_args: &[&str]) -> Result<String, InstallError> {
	let output = kubectl(ctx)
		.args(create_args.iter().copied())
		.args(["--dry-run=client", "-o", "yaml"])
		.run(ctx.host)?;
	Ok(output.stdout)
}

pub fn apply_yaml(ctx: &Context, yaml: &str) -> Result<(), InstallError> {
	kubectl(ctx).args(["apply", "-f", "-"]).stdin(yaml).run(ctx.host)?;
	Ok(())
}

/// Create-or-leave-unchanged: renders the `kubectl create` object client side and applies it.
pub fn apply(ctx: &Context, create_args: &[&str]) -> Result<(), InstallError> {
	let yaml = generate_yaml(ctx, create_args)?;
	apply_yaml(ctx, &yaml)
}

pub fn apply_url(ctx: &Context, url: &str) -> Result<(), InstallError> {
	kubectl(ctx).args(["apply", "-f", url]).run(ctx.host)?;
	Ok(())
}

pub fn exists(
	ctx: &Context,
	kind: &str,
	name: &str,
	namespace: Option<&str>,
) -> Result<bool, InstallError> {
	let mut cmd = kubectl(ctx).args(["get", kind, name]);
	if let Some(namespace) = namespace {
		cmd = cmd.args(["-n", namespace]);
	}
	cmd.probe(ctx.host)
}

pub fn get_jsonpath(
	ctx: &Context,
	kind: &str,
	name: &str,
	jsonpath: &str,
) -> Result<String, InstallError> {
	kubectl(ctx)
		.args(["get", kind, name, "-o"])
		.arg(format!("jsonpath={jsonpath}"))
		.stdout(ctx.host)
}

/// `name Ready-status` per pod matching `label`.
pub fn pod_readiness(ctx: &Context, namespace: &str, label: &str) -> Result<String, InstallError> {
	Ok(kubectl(ctx)
		.args(["get", "pods", "-n", namespace, "-l", label, "-o", READY_JSONPATH])
		.run(ctx.host)?
		.stdout)
}

/// `name Ready-status` per registered node.
pub fn node_readiness(ctx: &Context) -> Result<String, InstallError> {
	Ok(kubectl(ctx)
		.args(["get", "nodes", "-o", READY_JSONPATH])
		.run(ctx.host)?
		.stdout)
}

/// InternalIP of every registered node, whatever name its kubelet chose.
pub fn node_addresses(ctx: &Context) -> Result<Vec<Ipv4Addr>, InstallError> {
	let cmd = kubectl(ctx).args(["get", "nodes", "-o", INTERNAL_IP_JSONPATH]);
	cmd.stdout(ctx.host)?
		.split_whitespace()
		.map(|addr| {
			addr.parse().map_err(|_| InstallError::Parse {
				cmd: cmd.to_string(),
				detail: format!("'{addr}' is not an IPv4 address"),
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::setup::testing::context;
	use crate::setup::utils::fake::FakeHost;

	#[test]
	fn apply_pipes_dry_run_yaml_into_apply() {
		let host = FakeHost::new().respond(
			"kubectl --kubeconfig /home/alice/.kube/config create namespace apps --dry-run=client -o yaml",
			"apiVersion: v1\nkind: Namespace\nmetadata:\n  name: apps\n",
		);
		let config = crate::config::test_cluster();
		let ctx = context(&config, &host);
		apply(&ctx, &["create", "namespace", "apps"]).unwrap();
		assert_eq!(
			host.commands().last().unwrap(),
			"kubectl --kubeconfig /home/alice/.kube/config apply -f -"
		);
	}
}
