use crate::error::InstallError;
use crate::setup::utils::host::{Cmd, CmdOutput, Host};
use std::{
	cell::RefCell,
	collections::{BTreeMap, HashMap, VecDeque},
	io,
	path::{Path, PathBuf},
};

/// In-memory machine for step tests.
///
/// Commands are matched on their rendered form (`sudo -n apt-get update`).
/// Exact matches win over prefix matches; anything unmatched succeeds with no
/// output. `tee` is interpreted against the in-memory files.
#[derive(Default)]
pub struct FakeHost {
	files: RefCell<BTreeMap<PathBuf, String>>,
	exact: RefCell<HashMap<String, VecDeque<CmdOutput>>>,
	prefixes: RefCell<Vec<(String, CmdOutput)>>,
	log: RefCell<Vec<String>>,
}

impl FakeHost {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_file(self, path: &str, contents: &str) -> Self {
		self.files
			.borrow_mut()
			.insert(PathBuf::from(path), contents.to_owned());
		self
	}

	pub fn respond(self, cmd: &str, stdout: &str) -> Self {
		self.respond_with(cmd, CmdOutput::ok(stdout))
	}

	pub fn respond_with(self, cmd: &str, output: CmdOutput) -> Self {
		self.respond_seq(cmd, vec![output])
	}

	/// Successive calls get successive outputs; the last one repeats.
	pub fn respond_seq(self, cmd: &str, outputs: Vec<CmdOutput>) -> Self {
		self.exact
			.borrow_mut()
			.insert(cmd.to_owned(), outputs.into());
		self
	}

	pub fn respond_prefix(self, prefix: &str, output: CmdOutput) -> Self {
		self.prefixes.borrow_mut().push((prefix.to_owned(), output));
		self
	}

	pub fn file(&self, path: &str) -> Option<String> {
		self.files.borrow().get(Path::new(path)).cloned()
	}

	pub fn commands(&self) -> Vec<String> {
		self.log.borrow().clone()
	}

	pub fn ran(&self, needle: &str) -> bool {
		self.log.borrow().iter().any(|cmd| cmd.contains(needle))
	}

	fn tee(&self, cmd: &Cmd) -> CmdOutput {
		let append = cmd.args.iter().any(|arg| arg == "-a");
		let Some(path) = cmd.args.iter().find(|arg| !arg.starts_with('-')) else {
			return CmdOutput::failed(1, "tee: missing path");
		};
		let input = cmd.stdin.clone().unwrap_or_default();
		let mut files = self.files.borrow_mut();
		let entry = files.entry(PathBuf::from(path)).or_default();
		if append {
			entry.push_str(&input);
		} else {
			*entry = input.clone();
		}
		CmdOutput::ok(&input)
	}
}

impl Host for FakeHost {
	fn exec(&self, cmd: &Cmd) -> Result<CmdOutput, InstallError> {
		let rendered = cmd.to_string();
		self.log.borrow_mut().push(rendered.clone());
		if let Some(outputs) = self.exact.borrow_mut().get_mut(&rendered) {
			let output = if outputs.len() > 1 {
				outputs.pop_front()
			} else {
				outputs.front().cloned()
			};
			return Ok(output.unwrap_or_default());
		}
		if let Some((_, output)) = self
			.prefixes
			.borrow()
			.iter()
			.rev()
			.find(|(prefix, _)| rendered.starts_with(prefix.as_str()))
		{
			return Ok(output.clone());
		}
		if cmd.program == "tee" {
			return Ok(self.tee(cmd));
		}
		Ok(CmdOutput::ok(""))
	}

	fn read_to_string(&self, path: &Path) -> Result<String, InstallError> {
		self.files
			.borrow()
			.get(path)
			.cloned()
			.ok_or_else(|| io::Error::from(io::ErrorKind::NotFound).into())
	}

	fn exists(&self, path: &Path) -> bool {
		self.files.borrow().contains_key(path)
	}

	fn write(&self, path: &Path, contents: &str) -> Result<(), InstallError> {
		self.files
			.borrow_mut()
			.insert(path.to_path_buf(), contents.to_owned());
		Ok(())
	}

	fn as_dyn(&self) -> &dyn Host {
		self
	}
}
