use std::path::PathBuf;

/// Value of `--name=value` or `--name value`; blank values are ignored.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|arg| arg == name)
}

pub fn db_dir_arg(args: &[String]) -> Option<PathBuf> {
    arg_value(args, "--db-dir").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn both_forms_are_accepted() {
        assert_eq!(
            db_dir_arg(&args(&["--db-dir=/tmp/wh"])),
            Some(PathBuf::from("/tmp/wh"))
        );
        assert_eq!(
            db_dir_arg(&args(&["--views", "--db-dir", "/tmp/wh"])),
            Some(PathBuf::from("/tmp/wh"))
        );
    }

    #[test]
    fn blank_or_missing_values_are_ignored() {
        assert_eq!(arg_value(&args(&["--db-dir="]), "--db-dir"), None);
        assert_eq!(arg_value(&args(&["--db-dir"]), "--db-dir"), None);
        assert_eq!(arg_value(&args(&["--db-dir", "--json"]), "--db-dir"), None);
        assert!(has_flag(&args(&["--json"]), "--json"));
        assert!(!has_flag(&args(&["--json=1"]), "--json"));
    }
}
