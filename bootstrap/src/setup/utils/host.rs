use crate::error::InstallError;
use std::{
	fmt, fs,
	io::{self, Write},
	path::Path,
	process::{Command, Stdio},
	thread,
};
use tracing::debug;

/// A command to run on the local machine, optionally elevated through `sudo -n`.
#[derive(Debug, Clone, Default)]
pub struct Cmd {
	pub program: String,
	pub args: Vec<String>,
	pub sudo: bool,
	pub stdin: Option<String>,
	pub env: Vec<(String, String)>,
	pub stream: bool,
}

impl Cmd {
	pub fn new(program: &str) -> Self {
		Cmd {
			program: program.to_owned(),
			..Default::default()
		}
	}

	pub fn sudo(program: &str) -> Self {
		Cmd {
			sudo: true,
			..Cmd::new(program)
		}
	}

	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn stdin(mut self, input: impl Into<String>) -> Self {
		self.stdin = Some(input.into());
		self
	}

	pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
		self.env.push((key.to_owned(), value.into()));
		self
	}

	/// Let the child write straight to our terminal instead of capturing output.
	pub fn streamed(mut self) -> Self {
		self.stream = true;
		self
	}

	/// Runs the command and fails on a non-zero exit.
	pub fn run(&self, host: &dyn Host) -> Result<CmdOutput, InstallError> {
		let output = host.exec(self)?;
		if !output.success() {
			let stderr = output.stderr.trim();
			return Err(InstallError::CommandFailed {
				cmd: self.to_string(),
				code: output.code,
				stderr: (!stderr.is_empty()).then(|| stderr.to_owned()),
			});
		}
		Ok(output)
	}

	/// Runs the command and reports only whether it exited successfully.
	pub fn probe(&self, host: &dyn Host) -> Result<bool, InstallError> {
		Ok(host.exec(self)?.success())
	}

	pub fn stdout(&self, host: &dyn Host) -> Result<String, InstallError> {
		Ok(self.run(host)?.stdout.trim().to_owned())
	}
}

impl fmt::Display for Cmd {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.sudo {
			write!(f, "sudo -n ")?;
		}
		write!(f, "{}", self.program)?;
		for arg in &self.args {
			write!(f, " {arg}")?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CmdOutput {
	pub code: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl CmdOutput {
	#[cfg(test)]
	pub fn ok(stdout: &str) -> Self {
		CmdOutput {
			code: Some(0),
			stdout: stdout.to_owned(),
			stderr: String::new(),
		}
	}

	#[cfg(test)]
	pub fn failed(code: i32, stderr: &str) -> Self {
		CmdOutput {
			code: Some(code),
			stdout: String::new(),
			stderr: stderr.to_owned(),
		}
	}

	pub fn success(&self) -> bool {
		self.code == Some(0)
	}
}

/// Everything a setup step does to the machine goes through this trait.
pub trait Host {
	fn exec(&self, cmd: &Cmd) -> Result<CmdOutput, InstallError>;

	fn read_to_string(&self, path: &Path) -> Result<String, InstallError>;

	fn exists(&self, path: &Path) -> bool;

	/// Writes a file owned by the invoking user.
	fn write(&self, path: &Path, contents: &str) -> Result<(), InstallError>;

	/// Replaces a root-owned file, going through `sudo tee`.
	fn write_privileged(&self, path: &Path, contents: &str) -> Result<(), InstallError> {
		Cmd::sudo("tee")
			.arg(path.display().to_string())
			.stdin(contents)
			.run(self.as_dyn())?;
		Ok(())
	}

	/// Appends to a root-owned file, going through `sudo tee -a`.
	fn append_privileged(&self, path: &Path, contents: &str) -> Result<(), InstallError> {
		Cmd::sudo("tee")
			.arg("-a")
			.arg(path.display().to_string())
			.stdin(contents)
			.run(self.as_dyn())?;
		Ok(())
	}

	fn as_dyn(&self) -> &dyn Host;
}

/// The machine this process runs on.
pub struct SystemHost;

impl Host for SystemHost {
	fn exec(&self, cmd: &Cmd) -> Result<CmdOutput, InstallError> {
		debug!("Running: {cmd}");
		let mut command = if cmd.sudo {
			let mut command = Command::new("sudo");
			command.arg("-n");
			if !cmd.env.is_empty() {
				command.arg("env");
				command.args(cmd.env.iter().map(|(key, value)| format!("{key}={value}")));
			}
			command.arg(&cmd.program);
			command
		} else {
			let mut command = Command::new(&cmd.program);
			command.envs(cmd.env.iter().map(|(key, value)| (key, value)));
			command
		};
		command.args(&cmd.args);
		let launch_err = |source| InstallError::CommandLaunch {
			cmd: cmd.to_string(),
			source,
		};
		if cmd.stream {
			command.stdin(if cmd.stdin.is_some() { Stdio::piped() } else { Stdio::inherit() });
		} else {
			command
				.stdin(if cmd.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
				.stdout(Stdio::piped())
				.stderr(Stdio::piped());
		}
		let mut child = command.spawn().map_err(launch_err)?;
		// Stdin is fed from its own thread so a child echoing it cannot block on a full stdout.
		let writer = match (&cmd.stdin, child.stdin.take()) {
			(Some(input), Some(mut stdin)) => {
				let input = input.clone();
				Some(thread::spawn(move || stdin.write_all(input.as_bytes())))
			}
			_ => None,
		};
		let output = child.wait_with_output().map_err(launch_err)?;
		if let Some(writer) = writer {
			match writer.join() {
				Ok(Err(err)) if err.kind() != io::ErrorKind::BrokenPipe => return Err(err.into()),
				Err(_) => return Err(io::Error::other("stdin writer panicked").into()),
				_ => {}
			}
		}
		Ok(CmdOutput {
			code: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		})
	}

	fn read_to_string(&self, path: &Path) -> Result<String, InstallError> {
		Ok(fs::read_to_string(path)?)
	}

	fn exists(&self, path: &Path) -> bool {
		path.exists()
	}

	fn write(&self, path: &Path, contents: &str) -> Result<(), InstallError> {
		fs::write(path, contents)?;
		Ok(())
	}

	fn as_dyn(&self) -> &dyn Host {
		self
	}
}
