//! SOQL safety helpers.
//!
//! Every value interpolated into a Tooling API query goes through one of
//! these functions: names through [`soql::escape_like`] or
//! [`soql::escape_string`], record ids through [`soql::id_list`] or
//! [`is_valid_salesforce_id`].

/// Returns true if `id` looks like a 15 or 18 character Salesforce ID.
///
/// ```rust
/// use apex_coverage_tooling::security::is_valid_salesforce_id;
///
/// assert!(is_valid_salesforce_id("01p000000000001"));
/// assert!(is_valid_salesforce_id("01p000000000001AAA"));
/// assert!(!is_valid_salesforce_id("01p'; DELETE--"));
/// ```
#[must_use]
pub fn is_valid_salesforce_id(id: &str) -> bool {
    let len = id.len();
    (len == 15 || len == 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// SOQL escaping utilities.
pub mod soql {
    use crate::error::{Error, ErrorKind, Result};

    /// Escape a string value for use inside a SOQL string literal.
    ///
    /// ```rust
    /// use apex_coverage_tooling::security::soql;
    ///
    /// assert_eq!(soql::escape_string("O'Brien"), "O\\'Brien");
    /// ```
    #[must_use]
    pub fn escape_string(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 8);
        for ch in value.chars() {
            match ch {
                '\'' => escaped.push_str("\\'"),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// Escape a LIKE pattern while keeping its `%` and `_` wildcards.
    ///
    /// Test class patterns are user-supplied wildcards (`%Test`), so only
    /// the string-literal metacharacters are escaped here.
    #[must_use]
    pub fn escape_like(pattern: &str) -> String {
        escape_string(pattern)
    }

    /// Build the body of an `IN (...)` clause from record ids.
    ///
    /// Fails with `InvalidId` on the first value that is not a Salesforce ID.
    pub fn id_list<S: AsRef<str>>(ids: &[S]) -> Result<String> {
        let mut quoted = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            if !super::is_valid_salesforce_id(id) {
                return Err(Error::new(ErrorKind::InvalidId(id.to_string())));
            }
            quoted.push(format!("'{}'", id));
        }
        Ok(quoted.join(", "))
    }
}
