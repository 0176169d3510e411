//! Property-based tests for configuration input handling.
//!
//! Uses `proptest` to check that `${VAR}` substitution leaves ordinary text
//! alone and that `KEY=VALUE` overrides keep arbitrary values intact.

use mimo_bridge::bridge::supervisor::LaunchSpec;
use mimo_bridge::cli::parse_env_pair;
use mimo_bridge::config::substitute_env_vars;
use proptest::prelude::*;

proptest! {
    /// Text with no `$` never changes.
    #[test]
    fn substitution_is_identity_without_dollar(s in "[^$]{0,200}") {
        prop_assert_eq!(substitute_env_vars(&s).unwrap(), s);
    }

    /// An unset variable with a default expands to exactly the default.
    #[test]
    fn substitution_uses_default(prefix in "[a-z: ]{0,20}", default in "[^}$]{0,40}") {
        let input = format!("{prefix}${{MIMO_BRIDGE_PROPTEST_NEVER_SET:-{default}}}");
        prop_assert_eq!(substitute_env_vars(&input).unwrap(), format!("{prefix}{default}"));
    }

    /// Everything after the first `=` is the value, verbatim.
    #[test]
    fn env_pair_keeps_value(key in "[A-Z_][A-Z0-9_]{0,15}", value in "\\PC{0,40}") {
        let (k, v) = parse_env_pair(&format!("{key}={value}")).unwrap();
        prop_assert_eq!(k, key);
        prop_assert_eq!(v, value);
    }

    /// The first word is the program and the rest are arguments, unchanged.
    #[test]
    fn launch_spec_splits_command(command in prop::collection::vec("[!-~]{1,12}", 1..8)) {
        let spec = LaunchSpec::from_command(&command).unwrap();
        prop_assert_eq!(&spec.program, &command[0]);
        prop_assert_eq!(&spec.args[..], &command[1..]);
        prop_assert_eq!(spec.display(), command.join(" "));
    }
}
