/// Helper utilities for db-dump

/// Turn a host path into something usable inside a file name
pub fn sanitize_label(label: &str) -> String {
    label.replace('/', "_")
}

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Mask sensitive data (show only first and last N characters)
pub fn mask_sensitive(value: &str, visible_chars: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= visible_chars * 2 {
        "*".repeat(chars.len())
    } else {
        let start: String = chars[..visible_chars].iter().collect();
        let end: String = chars[chars.len() - visible_chars..].iter().collect();
        format!("{}...{}", start, end)
    }
}

/// Hide the values of secret-looking `KEY=VALUE` entries
pub fn redact_env(env: &[String]) -> Vec<String> {
    env.iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, _))
                if key.contains("PASSWORD")
                    || key.contains("SECRET")
                    || key.contains("KEY")
                    || key.contains("TOKEN") =>
            {
                format!("{}=***HIDDEN***", key)
            }
            _ => entry.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("/opt/icinga"), "_opt_icinga");
        assert_eq!(sanitize_label("plain"), "plain");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_mask_sensitive() {
        assert_eq!(mask_sensitive("5e7f294e4c92a9aa661fae8d347d832d", 4), "5e7f...832d");
        assert_eq!(mask_sensitive("changeme", 4), "********");
    }

    #[test]
    fn test_redact_env() {
        let env = vec![
            "MYSQL_USER=shop".to_string(),
            "MYSQL_ROOT_PASSWORD=hunter2".to_string(),
            "PATH=/usr/bin".to_string(),
            "NO_VALUE".to_string(),
        ];
        assert_eq!(
            redact_env(&env),
            vec![
                "MYSQL_USER=shop".to_string(),
                "MYSQL_ROOT_PASSWORD=***HIDDEN***".to_string(),
                "PATH=/usr/bin".to_string(),
                "NO_VALUE".to_string(),
            ]
        );
    }
}
