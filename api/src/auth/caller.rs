use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::error::{ApiError, ApiResult};
use crate::api::utils::parse_eth_address;
use crate::config::AppConfig;

/// Header carrying the self-declared wallet address of the caller
pub const CALLER_HEADER: &str = "x-wallet-address";

/// Caller identity taken from `x-wallet-address`. No signature is checked;
/// the address is only normalized and format-validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller(pub Option<String>);

impl Caller {
    pub fn address(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// 401 when no identity was supplied
    pub fn require(&self) -> ApiResult<&str> {
        self.address().ok_or_else(|| {
            ApiError::Unauthorized(format!("Missing caller address ({} header)", CALLER_HEADER))
        })
    }

    /// Use a body field when the header is absent
    pub fn or_body_field(self, field: Option<&str>) -> ApiResult<Self> {
        if self.0.is_some() {
            return Ok(self);
        }
        match field.map(str::trim).filter(|f| !f.is_empty()) {
            Some(raw) => parse_caller(raw).map(|a| Caller(Some(a))),
            None => Ok(self),
        }
    }
}

fn parse_caller(raw: &str) -> ApiResult<String> {
    parse_eth_address(raw)
        .ok_or_else(|| ApiError::BadRequest("Invalid caller address format".to_string()))
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(CALLER_HEADER) else {
            return Ok(Caller(None));
        };

        let raw = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("Invalid caller address header".to_string()))?
            .trim();
        if raw.is_empty() {
            return Ok(Caller(None));
        }

        parse_caller(raw).map(|address| Caller(Some(address)))
    }
}

/// Owner-only routes: 401 without identity, 403 for anyone but the blog owner
pub fn require_blog_owner<'a>(config: &AppConfig, caller: &'a Caller) -> ApiResult<&'a str> {
    let address = caller.require()?;
    if !config.is_blog_owner(address) {
        return Err(ApiError::Forbidden(
            "Only the blog owner can perform this action".to_string(),
        ));
    }
    Ok(address)
}
