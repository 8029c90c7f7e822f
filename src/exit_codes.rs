/// Exit codes for fencefmt
///
/// These let scripts and CI tell a clean run from one that found work to do
/// or could not run at all.
/// Success - Nothing to do, or all documents were processed
pub const SUCCESS: i32 = 0;

/// Changes needed - `--check` found documents that would be reformatted
pub const CHANGES_NEEDED: i32 = 1;

/// Tool error - No document, configuration error, or file access error
pub const TOOL_ERROR: i32 = 2;

/// Helper functions for consistent exit behavior
pub mod exit {
    use super::{CHANGES_NEEDED, SUCCESS, TOOL_ERROR};

    /// Exit with success code (0)
    pub fn success() -> ! {
        std::process::exit(SUCCESS);
    }

    /// Exit with changes needed code (1)
    pub fn changes_needed() -> ! {
        std::process::exit(CHANGES_NEEDED);
    }

    /// Exit with tool error code (2)
    pub fn tool_error() -> ! {
        std::process::exit(TOOL_ERROR);
    }
}
