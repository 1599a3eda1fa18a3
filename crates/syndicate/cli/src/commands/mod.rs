//! CLI command implementations

pub mod group;
pub mod proposal;

use syndicate_types::{Amount, MemberId};

use crate::error::{CliError, CliResult};

/// Parse a positive amount in the smallest currency unit
pub(crate) fn parse_amount(raw: &str) -> CliResult<Amount> {
    raw.trim()
        .parse::<u64>()
        .map(Amount::new)
        .map_err(|_| CliError::InvalidArgument(format!("'{}' is not a whole amount", raw)))
}

pub(crate) fn member(raw: &str) -> CliResult<MemberId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidArgument("member id must not be empty".into()));
    }
    Ok(MemberId::new(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000").unwrap(), Amount::new(1000));
        assert_eq!(parse_amount("0").unwrap(), Amount::zero());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("1.5").is_err());
    }

    #[test]
    fn test_member_rejects_blank() {
        assert!(member("  ").is_err());
        assert_eq!(member(" alice ").unwrap(), MemberId::new("alice"));
    }
}
