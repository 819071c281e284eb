//! Hex byte-string helpers for command input and output

/// Parse a hex byte string
///
/// Accepts an optional `0x` prefix, and whitespace, `:` or `,` between
/// bytes (e.g. `"9F 00 00"`, `"0x9f0000"`, `"de:ad:be:ef"`).
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let trimmed = s.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let mut bytes = Vec::new();
    for group in body.split(|c: char| c.is_whitespace() || c == ':' || c == ',') {
        let group = group
            .strip_prefix("0x")
            .or_else(|| group.strip_prefix("0X"))
            .unwrap_or(group);
        if group.is_empty() {
            continue;
        }
        if group.len() % 2 != 0 {
            return Err(format!("Odd number of hex digits in '{}'", group));
        }
        for i in (0..group.len()).step_by(2) {
            let pair = group
                .get(i..i + 2)
                .ok_or_else(|| format!("Invalid hex value: {}", group))?;
            let byte = u8::from_str_radix(pair, 16)
                .map_err(|_| format!("Invalid hex value: {}", pair))?;
            bytes.push(byte);
        }
    }

    if bytes.is_empty() {
        return Err("No data given".to_string());
    }
    Ok(bytes)
}

/// Format bytes as space-separated upper-case hex
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("AA55"), Ok(vec![0xAA, 0x55]));
        assert_eq!(parse_hex_bytes("0x9f0000"), Ok(vec![0x9F, 0x00, 0x00]));
        assert_eq!(parse_hex_bytes("9F 00 00"), Ok(vec![0x9F, 0x00, 0x00]));
        assert_eq!(parse_hex_bytes("de:ad,be ef"), Ok(vec![0xDE, 0xAD, 0xBE, 0xEF]));
        assert_eq!(parse_hex_bytes("0x0F 0x10"), Ok(vec![0x0F, 0x10]));
    }

    #[test]
    fn test_parse_hex_bytes_errors() {
        assert!(parse_hex_bytes("").is_err());
        assert!(parse_hex_bytes("0x").is_err());
        assert!(parse_hex_bytes("ABC").is_err());
        assert!(parse_hex_bytes("zz").is_err());
        assert!(parse_hex_bytes("é1").is_err());
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xAA, 0x05]), "AA 05");
        assert_eq!(format_hex(&[]), "");
    }
}
