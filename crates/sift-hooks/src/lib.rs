//! Host lifecycle hooks

pub mod base;
pub mod pruner;
pub mod reaper;
pub mod registry;

pub use base::Hook;
pub use pruner::PrunerHook;
pub use reaper::PtyReaperHook;
pub use registry::HookRegistry;
