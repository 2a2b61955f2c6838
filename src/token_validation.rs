//! Per-token checks for user supplied (custom) tokens.

use crate::errors::TokenValidationError;
use crate::stores::CustomToken;
use crate::types::{parse_address, ChainId, Token};

pub const MAX_DECIMALS: u32 = 18;

const LOGO_URI_SCHEMES: [&str; 4] = ["data:", "ipfs://", "http://", "https://"];

/// Validates `custom` and turns it into a [`Token`] flagged as custom.
pub fn validate_custom_token(
    custom: &CustomToken,
    allowed_chains: &[ChainId],
) -> Result<Token, TokenValidationError> {
    if !allowed_chains.contains(&custom.chain_id) {
        return Err(TokenValidationError::UnsupportedChain(custom.chain_id));
    }
    let address = parse_address(&custom.address)
        .ok_or_else(|| TokenValidationError::InvalidAddress(custom.address.clone()))?;
    if custom.symbol.trim().is_empty() {
        return Err(TokenValidationError::EmptySymbol);
    }
    if custom.decimals > MAX_DECIMALS {
        return Err(TokenValidationError::TooManyDecimals(custom.decimals));
    }
    if !custom.logo_uri.is_empty()
        && !LOGO_URI_SCHEMES
            .iter()
            .any(|scheme| custom.logo_uri.starts_with(scheme))
    {
        return Err(TokenValidationError::InvalidLogoUri(custom.logo_uri.clone()));
    }

    Ok(Token {
        cross_chain_id: custom.cross_chain_id.clone(),
        chain_id: custom.chain_id,
        address,
        decimals: custom.decimals as u8,
        name: custom.name.clone(),
        symbol: custom.symbol.clone(),
        logo_uri: custom.logo_uri.clone(),
        custom_token: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(decimals: u32) -> CustomToken {
        CustomToken {
            chain_id: 1,
            address: "0x744d70fdbe2ba4cf95131626614a1763df805b9e".into(),
            name: "Status Network Token".into(),
            symbol: "SNT".into(),
            decimals,
            logo_uri: String::new(),
            cross_chain_id: String::new(),
        }
    }

    #[test]
    fn test_decimals_boundary() {
        let token = validate_custom_token(&custom(18), &[1]).unwrap();
        assert!(token.custom_token);
        assert_eq!(token.decimals, 18);
        assert_eq!(
            validate_custom_token(&custom(19), &[1]),
            Err(TokenValidationError::TooManyDecimals(19))
        );
    }

    #[test]
    fn test_rejections() {
        assert_eq!(
            validate_custom_token(&custom(18), &[10]),
            Err(TokenValidationError::UnsupportedChain(1))
        );

        let mut t = custom(18);
        t.address = "0x744d70fdbe2ba4cf95131626614a1763df805b".into();
        assert!(matches!(
            validate_custom_token(&t, &[1]),
            Err(TokenValidationError::InvalidAddress(_))
        ));

        let mut t = custom(18);
        t.symbol = "  ".into();
        assert_eq!(validate_custom_token(&t, &[1]), Err(TokenValidationError::EmptySymbol));

        let mut t = custom(18);
        t.logo_uri = "ftp://example.org/snt.png".into();
        assert!(matches!(
            validate_custom_token(&t, &[1]),
            Err(TokenValidationError::InvalidLogoUri(_))
        ));
    }

    #[test]
    fn test_logo_uri_schemes() {
        for uri in [
            "data:image/png;base64,AAAA",
            "ipfs://QmHash",
            "http://example.org/a.png",
            "https://example.org/a.png",
        ] {
            let mut t = custom(6);
            t.logo_uri = uri.into();
            assert!(validate_custom_token(&t, &[1]).is_ok(), "{} should be accepted", uri);
        }
    }
}
