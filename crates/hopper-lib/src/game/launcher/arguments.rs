//! Argument expansion and placeholder substitution.

use crate::game::installer::types::{Arch, OsType};
use crate::game::launcher::rules::rules_allow;
use crate::game::launcher::version_parser::Argument;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").ok());

/// Replace every `${name}` token. Unknown names become the empty string.
pub fn substitute_variables(text: &str, variables: &HashMap<String, String>) -> String {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &regex::Captures| {
        variables.get(&caps[1]).cloned().unwrap_or_default()
    })
    .into_owned()
}

/// Expand an argument template: conditional entries are kept when their
/// rules allow the platform, then every token is substituted.
pub fn expand_arguments(
    template: &[Argument],
    variables: &HashMap<String, String>,
    os: OsType,
    arch: Arch,
) -> Vec<String> {
    let mut out = Vec::new();
    for arg in template {
        match arg {
            Argument::Simple(value) => out.push(substitute_variables(value, variables)),
            Argument::Conditional { rules, value } => {
                if rules_allow(rules, os, arch) {
                    out.extend(
                        value
                            .values()
                            .iter()
                            .map(|v| substitute_variables(v, variables)),
                    );
                }
            }
        }
    }
    out
}

/// Drop demo-mode flags and any quick play flag whose value is empty.
pub fn filter_game_arguments(args: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.into_iter().peekable();

    while let Some(arg) = iter.next() {
        if arg.starts_with("--demo") {
            continue;
        }
        if arg.starts_with("--quickPlay") {
            let value = match iter.peek() {
                Some(next) if !next.starts_with("--") => iter.next(),
                _ => None,
            };
            match value {
                Some(v) if !v.trim().is_empty() => {
                    out.push(arg);
                    out.push(v);
                }
                _ => log::debug!("Dropping {} without a value", arg),
            }
            continue;
        }
        out.push(arg);
    }

    out
}

/// Splits a string into whitespace-separated tokens while respecting
/// single and double quotes. Quotes are removed from returned tokens.
pub fn split_preserving_quotes(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_double = false;
    let mut in_single = false;

    for c in s.chars() {
        match c {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            c if c.is_whitespace() && !in_double && !in_single => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            c => buf.push(c),
        }
    }

    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::launcher::version_parser::Argument;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unresolved_placeholders_become_empty() {
        let v = vars(&[("auth_player_name", "Steve")]);
        assert_eq!(substitute_variables("${auth_player_name}", &v), "Steve");
        assert_eq!(substitute_variables("${nope}", &v), "");
        assert_eq!(
            substitute_variables("-Dname=${auth_player_name}-${nope}", &v),
            "-Dname=Steve-"
        );
        assert_eq!(substitute_variables("no placeholders", &v), "no placeholders");
    }

    #[test]
    fn demo_and_empty_quick_play_are_removed() {
        let args: Vec<String> = [
            "--username", "Steve", "--demo", "--quickPlayPath", "", "--quickPlaySingleplayer",
            "World", "--width", "854",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(
            filter_game_arguments(args),
            vec!["--username", "Steve", "--quickPlaySingleplayer", "World", "--width", "854"]
        );
    }

    #[test]
    fn quick_play_flag_at_end_is_removed() {
        let args = vec!["--version".to_string(), "1.20.1".into(), "--quickPlayMultiplayer".into()];
        assert_eq!(filter_game_arguments(args), vec!["--version", "1.20.1"]);
    }

    #[test]
    fn conditional_arguments_follow_os_rules() {
        let template: Vec<Argument> = serde_json::from_str(
            r#"[
                "-Djava.library.path=${natives_directory}",
                { "rules": [{ "action": "allow", "os": { "name": "osx" } }], "value": ["-XstartOnFirstThread"] },
                { "rules": [{ "action": "allow", "os": { "name": "windows" } }], "value": "-XX:HeapDumpPath=x" }
            ]"#,
        )
        .unwrap();
        let v = vars(&[("natives_directory", "/n")]);

        assert_eq!(
            expand_arguments(&template, &v, OsType::MacOS, Arch::Arm64),
            vec!["-Djava.library.path=/n", "-XstartOnFirstThread"]
        );
        assert_eq!(
            expand_arguments(&template, &v, OsType::Linux, Arch::X64),
            vec!["-Djava.library.path=/n"]
        );
    }

    #[test]
    fn split_respects_quotes() {
        assert_eq!(
            split_preserving_quotes(r#"--a "b c" 'd e' f"#),
            vec!["--a", "b c", "d e", "f"]
        );
    }
}
