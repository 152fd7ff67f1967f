//! Name validation rules, enforced server-side regardless of what a client
//! sends (spec.md §6).

const MAX_NAME_LEN: usize = 20;

/// `^[a-z0-9_-]{1,20}$`
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// `^[A-Za-z0-9 ]{1,20}$`
pub fn is_valid_player_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names() {
        assert!(is_valid_table_name("alice-table_1"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("Alice"));
        assert!(!is_valid_table_name("has space"));
        assert!(!is_valid_table_name(&"a".repeat(21)));
    }

    #[test]
    fn player_names() {
        assert!(is_valid_player_name("Alice 2"));
        assert!(!is_valid_player_name(""));
        assert!(!is_valid_player_name("Alice-2"));
        assert!(!is_valid_player_name(&"a".repeat(21)));
    }
}
