//! Default values for codemeta configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Extraction Defaults
// ============================================================================

/// Files above this size degrade to empty (2 MiB). Zero disables the check.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

// ============================================================================
// Compiler Service Defaults
// ============================================================================

/// Executable implementing the compiler-service contract.
pub const DEFAULT_SERVICE_PROGRAM: &str = "codemeta-tsc";

/// Bounded wait for one compiler-service call, in seconds.
pub const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// File Locations
// ============================================================================

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = "codemeta.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "codemeta";

/// File name inside [`USER_CONFIG_DIR`].
pub const USER_CONFIG_FILE: &str = "config.toml";

// ============================================================================
// Environment Overrides
// ============================================================================

pub const ENV_SERVICE_MODE: &str = "CODEMETA_SERVICE_MODE";
pub const ENV_SERVICE_PROGRAM: &str = "CODEMETA_SERVICE_PROGRAM";
pub const ENV_SERVICE_TIMEOUT: &str = "CODEMETA_SERVICE_TIMEOUT";
pub const ENV_MAX_FILE_SIZE: &str = "CODEMETA_MAX_FILE_SIZE";
