//! Class configuration engine.
//!
//! Classes are resolved from a raw table in three stages:
//! 1. **Templates** - `${name}` placeholders rendered per class ([`template`])
//! 2. **Parsing** - operator keys split into typed field operations ([`field_op`])
//! 3. **Inheritance** - each class merged onto its resolved parent ([`merge`], [`resolver`])
//!
//! Resolved classes then feed [`options`] to build prompt and view options.
//!
//! The raw table and vault settings are loaded from tiers with field-by-field
//! YAML merging:
//! 1. **Defaults** - Embedded at build time from `./defaults/`
//! 2. **Project** - `$CWD/notegen/`
//! 3. **User** - `~/.notegen/` and environment variables
//!
//! ## Environment Variables
//! - `NOTEGEN_CLASSES_PATH` - Explicit class file (overrides all tiers)
//! - `NOTEGEN_VAULT_ROOT` - Vault directory
//! - `NOTEGEN_TEMPLATE_ROOT` - Template directory inside the vault
//! - `NOTEGEN_USER_DIR` - User config dir (default: `~/.notegen`)
//! - `NOTEGEN_PROJECT_DIR` - Project config dir (default: `./notegen`)

pub mod field_op;
pub mod loader;
pub mod merge;
pub mod options;
pub mod resolver;
pub mod string_set;
pub mod template;
pub mod types;
pub mod watcher;

pub use field_op::{ConfigNode, FieldOp, OpKind};
pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all, merge_nodes};
pub use options::{ChatParams, DefaultValue, OptionsFactory, OptionsVariant, PromptOptions, ViewOptions};
pub use resolver::{ConfigResolver, RawTypeTable, ResolvedTypeConfig, resolve};
pub use string_set::StringSet;
pub use template::{Bindings, CompiledTemplate, compile};
pub use types::*;
pub use watcher::{ClassRegistry, ConfigChangeEvent, WatchPaths, WatcherConfig, start_config_watcher};
