//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Config file (fengshui.toml)
//! 3. Environment variables (FENGSHUI_*)
//!
//! Provider credentials are additionally picked up from the conventional
//! `DEEPSEEK_API_KEY` / `QWEN_API_KEY` environment variables at client
//! construction time.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
