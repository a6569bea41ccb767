/// Convert a user-provided build name into a folder name.
///
/// Characters that are invalid in Windows paths and any whitespace become
/// `_`, runs of `_` collapse to one. Case and other characters are kept.
pub fn sanitize_build_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for ch in name.trim().chars() {
        let mapped = match ch {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        };
        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        out.push(mapped);
    }

    // "." and ".." would resolve outside the instances directory.
    if out.is_empty() || out.chars().all(|c| c == '.') {
        return "build".to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_and_collapses() {
        assert_eq!(sanitize_build_name("My Build"), "My_Build");
        assert_eq!(sanitize_build_name("  a  <>  b  "), "a_b");
        assert_eq!(sanitize_build_name("x/y\\z:w"), "x_y_z_w");
        assert_eq!(sanitize_build_name("already_fine-1.20"), "already_fine-1.20");
    }

    #[test]
    fn never_escapes_the_instances_dir() {
        assert_eq!(sanitize_build_name(""), "build");
        assert_eq!(sanitize_build_name(".."), "build");
        assert_eq!(sanitize_build_name("../etc"), ".._etc");
    }
}
