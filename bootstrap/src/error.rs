use std::{io, net::Ipv4Addr, path::PathBuf, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
	#[error("I/O error: {0}.")]
	Io(#[from] io::Error),

	#[error("Failed to execute command '{cmd}': {source}")]
	CommandLaunch {
		cmd: String,
		#[source]
		source: io::Error,
	},

	#[error("Command failed ({}): {cmd}{}", exit_code(.code), stderr_suffix(.stderr))]
	CommandFailed {
		cmd: String,
		code: Option<i32>,
		stderr: Option<String>,
	},

	#[error("Step '{step}' failed after attempt to set it.")]
	StepFailed { step: &'static str },

	#[error("Preflight check failed: {0}.")]
	Precondition(String),

	#[error("Local address {address} is not part of the cluster topology.")]
	UnrecognizedRole { address: Ipv4Addr },

	#[error("Timed out after {}s waiting for {what}.", .waited.as_secs())]
	Timeout { what: String, waited: Duration },

	#[error("Join command not found at {}: run the control-plane initializer first.", .path.display())]
	JoinCommandMissing { path: PathBuf },

	#[error("Failed to join workers: {}", .failures.join("; "))]
	WorkerJoin { failures: Vec<String> },

	#[error("Invalid configuration: {0}.")]
	Config(String),

	#[error("Unexpected output from '{cmd}': {detail}.")]
	Parse { cmd: String, detail: String },
}

fn exit_code(code: &Option<i32>) -> String {
	match code {
		Some(code) => format!("exit {code}"),
		None => "killed by signal".to_owned(),
	}
}

fn stderr_suffix(stderr: &Option<String>) -> String {
	match stderr {
		Some(stderr) if !stderr.is_empty() => format!(": {stderr}"),
		_ => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn command_failed_includes_code_and_stderr() {
		let err = InstallError::CommandFailed {
			cmd: "sudo -n apt-get update".to_owned(),
			code: Some(100),
			stderr: Some("E: lock held".to_owned()),
		};
		assert_eq!(
			err.to_string(),
			"Command failed (exit 100): sudo -n apt-get update: E: lock held"
		);
	}

	#[test]
	fn join_command_missing_names_path() {
		let err = InstallError::JoinCommandMissing {
			path: PathBuf::from("/tmp/kubeadm_join_cmd.sh"),
		};
		assert!(err.to_string().contains("Join command not found at /tmp/kubeadm_join_cmd.sh"));
	}
}
