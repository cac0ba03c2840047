//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | CLI usage error (bad args, unknown subcommand)   |
//! | 3    | Config file unreadable, unparsable or invalid    |
//! | 4    | Cycle/batch input unreadable or malformed        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use rentradar_dedupe::DedupeError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure (e.g. cannot write output).
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be read, parsed or validated.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Input file could not be read or contains a malformed record.
pub const EXIT_INPUT: u8 = 4;

/// Map an engine error to its exit code.
pub fn dedupe_exit_code(err: &DedupeError) -> u8 {
    match err {
        DedupeError::ConfigParse(_) | DedupeError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        DedupeError::InputParse { .. } | DedupeError::UnknownSource(_) | DedupeError::Io(_) => EXIT_INPUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_INVALID_CONFIG, EXIT_INPUT];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn config_errors_map_to_invalid_config() {
        let err = DedupeError::ConfigValidation("trust".into());
        assert_eq!(dedupe_exit_code(&err), EXIT_INVALID_CONFIG);
        let err = DedupeError::InputParse { line: 3, message: "bad".into() };
        assert_eq!(dedupe_exit_code(&err), EXIT_INPUT);
    }
}
