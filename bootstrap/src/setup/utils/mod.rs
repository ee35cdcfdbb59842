pub mod host;
pub mod kctl;
pub mod pkg;
pub mod wait;

#[cfg(test)]
pub mod fake;
