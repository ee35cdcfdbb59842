use crate::context::Context;
use crate::error::InstallError;
use crate::setup::utils::kctl;
use crate::setup::SetupStep;
use tracing::info;

pub struct Namespaces;

impl SetupStep for Namespaces {
	fn name(&self) -> &'static str {
		"Namespaces"
	}

	fn check(&self, ctx: &Context) -> Result<bool, InstallError> {
		for namespace in &ctx.config.namespaces {
			if !kctl::exists(ctx, "namespace", namespace, None)? {
				info!("Namespace {namespace} does not exist.");
				return Ok(false);
			}
		}
		info!("Namespaces exist.");
		Ok(true)
	}

	fn set(&self, ctx: &Context) -> Result<(), InstallError> {
		for namespace in &ctx.config.namespaces {
			info!("Ensuring namespace {namespace}.");
			kctl::apply(ctx, &["create", "namespace", namespace.as_str()])?;
		}
		Ok(())
	}
}
