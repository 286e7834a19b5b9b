//! Field naming strategies applied to struct fields on the wire.

/// How declared struct field names map to JSON keys.
///
/// Applies to struct fields only. Map keys are user data and are written
/// exactly as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldNaming {
    /// `hostName` → `host_name`. The registry's convention.
    #[default]
    SnakeCase,
    /// Declared names are used unchanged.
    AsDeclared,
}

impl FieldNaming {
    /// Translates a declared field name into its wire name.
    pub fn apply(self, declared: &str) -> String {
        match self {
            Self::SnakeCase => snake_case(declared),
            Self::AsDeclared => declared.to_owned(),
        }
    }
}

/// Converts a field name to snake_case.
///
/// An uppercase letter is lowered and prefixed with `_`, unless it directly
/// follows another translated uppercase letter or an underscore, so acronyms
/// collapse (`URLPath` → `urlpath`). A single leading underscore is dropped.
pub fn snake_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len() * 2);
    let mut prev_translated = false;

    for (i, c) in input.chars().enumerate() {
        if i == 0 && c == '_' {
            continue;
        }
        if c.is_uppercase() {
            if !prev_translated && !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(c.to_lowercase());
            prev_translated = true;
        } else {
            result.push(c);
            prev_translated = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_becomes_snake_case() {
        assert_eq!(snake_case("hostName"), "host_name");
        assert_eq!(snake_case("leaseRenewalIntervalInSecs"), "lease_renewal_interval_in_secs");
        assert_eq!(snake_case("ipAddr"), "ip_addr");
    }

    #[test]
    fn snake_case_is_idempotent() {
        assert_eq!(snake_case("host_name"), "host_name");
        assert_eq!(snake_case(&snake_case("vipAddress")), "vip_address");
    }

    #[test]
    fn acronyms_collapse() {
        assert_eq!(snake_case("URLPath"), "urlpath");
        assert_eq!(snake_case("homePageURL"), "home_page_url");
    }

    #[test]
    fn leading_underscore_dropped_once() {
        assert_eq!(snake_case("_hidden"), "hidden");
        assert_eq!(snake_case("__twice"), "_twice");
    }

    #[test]
    fn markers_pass_through() {
        assert_eq!(snake_case("$"), "$");
        assert_eq!(snake_case("@enabled"), "@enabled");
        assert_eq!(snake_case("@class"), "@class");
    }

    #[test]
    fn as_declared_is_identity() {
        assert_eq!(FieldNaming::AsDeclared.apply("hostName"), "hostName");
    }
}
