//! Classification of renderer error output.

/// Substrings in the renderer's error stream that mean the submitted script itself is
/// defective: no runnable scene, an unresolvable reference, or malformed source.
pub const FATAL_SCRIPT_PATTERNS: &[&str] = &[
    "No scenes found",
    "ModuleNotFoundError",
    "ImportError",
    "NameError",
    "SyntaxError",
    "IndentationError",
];

/// Returns the first fatal pattern present in `stderr`, if any.
pub fn fatal_script_pattern(stderr: &str) -> Option<&'static str> {
    FATAL_SCRIPT_PATTERNS
        .iter()
        .copied()
        .find(|pattern| stderr.contains(pattern))
}
