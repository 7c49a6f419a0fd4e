//! Search filter templates with escaped substitutions.

use ldap3::ldap_escape;

/// Placeholder for the submitted username.
pub const USERNAME_PLACEHOLDER: &str = "{{username}}";

/// Placeholder for the DN of the user entry found by the user search.
pub const USER_DN_PLACEHOLDER: &str = "{{userDN}}";

/// Renders the user search filter for `username`.
#[must_use]
pub fn user_filter(template: &str, username: &str) -> String {
    render(template, &[(USERNAME_PLACEHOLDER, username)])
}

/// Renders the group search filter for a user entry.
#[must_use]
pub fn group_filter(template: &str, user_dn: &str, username: &str) -> String {
    render(
        template,
        &[(USER_DN_PLACEHOLDER, user_dn), (USERNAME_PLACEHOLDER, username)],
    )
}

/// Replaces placeholders with RFC 4515 escaped values in a single pass.
///
/// Substituted text is never scanned again, so a value that itself looks
/// like a placeholder is inserted literally.
fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while !rest.is_empty() {
        for (placeholder, value) in substitutions {
            if let Some(after) = rest.strip_prefix(placeholder) {
                out.push_str(&ldap_escape(*value));
                rest = after;
                continue 'scan;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ldap::config::{DEFAULT_GROUP_FILTER, DEFAULT_USER_FILTER};

    #[test]
    fn substitutes_plain_username() {
        assert_eq!(
            user_filter(DEFAULT_USER_FILTER, "alice"),
            "(&(objectClass=inetOrgPerson)(uid=alice))"
        );
    }

    #[test]
    fn metacharacters_cannot_change_filter_structure() {
        let rendered = user_filter(DEFAULT_USER_FILTER, "*)(uid=*");

        assert!(!rendered.contains('*'));
        assert_eq!(rendered.matches('(').count(), 3);
        assert_eq!(rendered.matches(')').count(), 3);
        assert!(rendered.starts_with("(&(objectClass=inetOrgPerson)(uid="));
        assert!(rendered.ends_with("))"));
    }

    #[test]
    fn backslash_and_nul_are_escaped() {
        let rendered = user_filter("(uid={{username}})", "a\\b\0c");
        assert!(!rendered.contains('\0'));
        assert_eq!(rendered.matches('\\').count(), 2);
    }

    #[test]
    fn group_filter_substitutes_both_placeholders() {
        let rendered = group_filter(
            "(&(member={{userDN}})(memberUid={{username}}))",
            "uid=alice,ou=people,dc=example,dc=org",
            "alice",
        );
        assert_eq!(
            rendered,
            "(&(member=uid=alice,ou=people,dc=example,dc=org)(memberUid=alice))"
        );
    }

    #[test]
    fn default_group_filter_uses_user_dn() {
        let rendered = group_filter(
            DEFAULT_GROUP_FILTER,
            "uid=bob,ou=people,dc=example,dc=org",
            "bob",
        );
        assert_eq!(
            rendered,
            "(&(objectClass=groupOfNames)(member=uid=bob,ou=people,dc=example,dc=org))"
        );
    }

    #[test]
    fn placeholder_looking_values_are_inserted_literally() {
        let rendered = group_filter("(&(a={{userDN}})(b={{username}}))", "{{username}}", "x");
        assert_eq!(rendered, "(&(a={{username}})(b=x))");
    }
}
