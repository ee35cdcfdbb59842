pub mod containerd;
pub mod control_plane;
pub mod disable_swap;
pub mod helm;
pub mod host_registry;
pub mod kernel_modules;
pub mod kubes;
pub mod namespaces;
pub mod network_plugin;
pub mod preflight;
pub mod storage_class;
pub mod sysctl;
pub mod verify;
pub mod worker_join;

pub use containerd::Containerd;
pub use control_plane::ControlPlane;
pub use disable_swap::DisableSwap;
pub use helm::Helm;
pub use host_registry::HostRegistry;
pub use kernel_modules::KernelModules;
pub use kubes::Kubes;
pub use namespaces::Namespaces;
pub use network_plugin::NetworkPlugin;
pub use preflight::Preflight;
pub use storage_class::StorageClass;
pub use sysctl::Sysctl;
pub use verify::Verify;
pub use worker_join::WorkerJoin;
