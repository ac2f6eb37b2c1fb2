/// Shared utility functions for API handlers

/// Validate Ethereum address format
pub fn is_valid_eth_address(address: &str) -> bool {
    address.len() == 42 && address.starts_with("0x") &&
    address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Wallet addresses are stored and compared lowercase
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Normalize then validate, returning the lowercase form
pub fn parse_eth_address(address: &str) -> Option<String> {
    let address = normalize_address(address);
    is_valid_eth_address(&address).then_some(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_eth_address("0x1234567890123456789012345678901234567890"));
        assert!(is_valid_eth_address("0xabcdefABCDEF0123456789abcdefABCDEF012345"));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_eth_address(""));
        assert!(!is_valid_eth_address("0x123"));
        assert!(!is_valid_eth_address("1234567890123456789012345678901234567890ab"));
        assert!(!is_valid_eth_address("0xg234567890123456789012345678901234567890"));
        assert!(!is_valid_eth_address("0x12345678901234567890123456789012345678901"));
    }

    #[test]
    fn test_parse_lowercases() {
        assert_eq!(
            parse_eth_address(" 0xABCDEF0123456789ABCDEF0123456789ABCDEF01 "),
            Some("0xabcdef0123456789abcdef0123456789abcdef01".to_string())
        );
        assert_eq!(parse_eth_address("not-an-address"), None);
        // Upper-case prefix is normalized before the prefix check
        assert_eq!(
            parse_eth_address("0XABCDEF0123456789ABCDEF0123456789ABCDEF01"),
            Some("0xabcdef0123456789abcdef0123456789abcdef01".to_string())
        );
    }
}
