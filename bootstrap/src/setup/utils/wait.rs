use crate::error::InstallError;
use std::{
	thread::sleep,
	time::{Duration, Instant},
};
use tracing::info;

/// Polls `is_ready` until it reports true or `timeout` elapses.
///
/// The condition is always evaluated at least once, so a zero timeout is a
/// single check.
pub fn until<F>(
	what: &str,
	timeout: Duration,
	interval: Duration,
	mut is_ready: F,
) -> Result<(), InstallError>
where
	F: FnMut() -> Result<bool, InstallError>,
{
	let started = Instant::now();
	let mut attempt = 1u32;
	loop {
		if is_ready()? {
			info!("{what} ready after {}s.", started.elapsed().as_secs());
			return Ok(());
		}
		if started.elapsed() + interval > timeout {
			return Err(InstallError::Timeout {
				what: what.to_owned(),
				waited: timeout,
			});
		}
		info!("Waiting for {what} (attempt {attempt}).");
		attempt += 1;
		sleep(interval);
	}
}

/// Parses `name status` lines, as printed by the readiness jsonpath queries in
/// `kctl`, into the names that are not `True`. `None` means nothing was listed.
pub fn not_ready(listing: &str) -> Option<Vec<&str>> {
	let rows = listing
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(|line| {
			let mut fields = line.split_whitespace();
			(fields.next().unwrap_or_default(), fields.next())
		})
		.collect::<Vec<_>>();
	if rows.is_empty() {
		return None;
	}
	Some(
		rows.into_iter()
			.filter(|(_, status)| *status != Some("True"))
			.map(|(name, _)| name)
			.collect(),
	)
}
