//! Platform rule evaluation for libraries and conditional arguments.
//!
//! Rules are applied in document order and every rule that carries an `os`
//! clause sets the outcome. A rule whose OS name matches takes its own
//! action; a rule for a different OS takes the opposite one (an `allow` for
//! another platform excludes us, a `disallow` for another platform keeps
//! us). An `arch` clause on the same rule is evaluated the same way against
//! the current architecture and can overwrite the outcome of the name clause.

use crate::game::installer::types::{Arch, OsType};
use crate::game::launcher::version_parser::{LibraryEntry, Rule, RuleAction};

pub fn is_library_needed(library: &LibraryEntry, os: OsType, arch: Arch) -> bool {
    rules_allow(&library.rules, os, arch)
}

/// Evaluate a rule list for the given platform. An empty list allows.
pub fn rules_allow(rules: &[Rule], os: OsType, arch: Arch) -> bool {
    let mut needed = true;

    for rule in rules {
        let allow = rule.action == RuleAction::Allow;
        match &rule.os {
            Some(os_rule) => {
                if let Some(name) = &os_rule.name {
                    needed = if os.matches(name) { allow } else { !allow };
                }
                if let Some(rule_arch) = &os_rule.arch {
                    needed = if rule_arch == arch.as_str() { allow } else { !allow };
                }
            }
            // No platform clause: the rule applies everywhere.
            None => needed = allow,
        }
    }

    needed
}
