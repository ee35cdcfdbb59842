use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::kctl;
use crate::setup::SetupStep;
use tracing::info;

/// local-path-provisioner, marked as the cluster default storage class.
pub struct StorageClass;

impl StorageClass {
	pub const DEFAULT_ANNOTATION: &str =
		r"{.metadata.annotations.storageclass\.kubernetes\.io/is-default-class}";
	pub const DEFAULT_PATCH: &str =
		r#"{"metadata": {"annotations":{"storageclass.kubernetes.io/is-default-class":"true"}}}"#;
}

impl SetupStep for StorageClass {
	fn name(&self) -> &'static str {
		"StorageClass"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		let class = &ctx.config.storage_class;
		if !kctl::exists(ctx, "storageclass", class, None)? {
			info!("Storage class {class} is not installed.");
			return Ok(false);
		}
		let annotation =
			kctl::get_jsonpath(ctx, "storageclass", class, StorageClass::DEFAULT_ANNOTATION)?;
		let is_default = annotation == "true";
		if !is_default {
			info!("Storage class {class} is not the default.");
		}
		Ok(is_default)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		let class = &ctx.config.storage_class;
		info!("Applying storage provisioner {}.", ctx.config.storage_manifest_url);
		kctl::apply_url(ctx, &ctx.config.storage_manifest_url)?;
		info!("Marking {class} as the default storage class.");
		kctl::kubectl(ctx)
			.args(["patch", "storageclass", class.as_str(), "-p", StorageClass::DEFAULT_PATCH])
			.run(ctx.host)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::test_cluster;
	use crate::setup::testing::context;
	use crate::setup::utils::fake::FakeHost;
	use crate::setup::utils::host::CmdOutput;

	const KUBECTL: &str = "kubectl --kubeconfig /home/alice/.kube/config";

	#[test]
	fn applies_provisioner_and_patches_default() {
		let config = test_cluster();
		let host = FakeHost::new()
			.respond_seq(
				&format!("{KUBECTL} get storageclass local-path"),
				vec![CmdOutput::failed(1, "NotFound"), CmdOutput::ok("")],
			)
			.respond(
				&format!(
					"{KUBECTL} get storageclass local-path -o jsonpath={}",
					StorageClass::DEFAULT_ANNOTATION
				),
				"true",
			);
		StorageClass.run(&context(&config, &host)).unwrap();
		assert!(host.ran(
			"apply -f https://raw.githubusercontent.com/rancher/local-path-provisioner/v0.0.26/deploy/local-path-storage.yaml"
		));
		assert!(host.ran(&format!(
			"{KUBECTL} patch storageclass local-path -p {}",
			StorageClass::DEFAULT_PATCH
		)));
	}

	#[test]
	fn non_default_class_is_patched() {
		let config = test_cluster();
		let host = FakeHost::new().respond(
			&format!(
					"{KUBECTL} get storageclass local-path -o jsonpath={}",
					StorageClass::DEFAULT_ANNOTATION
				),
			"",
		);
		assert!(!StorageClass.check(&context(&config, &host)).unwrap());
	}
}
