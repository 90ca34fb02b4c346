//! Wire header names and typed access to an `http::HeaderMap`.
//!
//! Headers only exist at the transport edge. Everything past
//! [`LogicalStoreResponse::from_headers`](super::LogicalStoreResponse::from_headers)
//! works with typed fields. Names are lowercase; `HeaderMap` lookups are
//! case-insensitive, so `x-ms-global-Committed-lsn` on the wire matches.

use std::str::FromStr;

use http::{HeaderMap, HeaderValue};

use crate::barrier::{BarrierError, BarrierResult};

pub const LSN: &str = "lsn";
pub const GLOBAL_COMMITTED_LSN: &str = "x-ms-global-committed-lsn";
pub const NUMBER_OF_READ_REGIONS: &str = "x-ms-number-of-read-regions";
pub const ITEM_LSN: &str = "x-ms-item-lsn";
pub const SUB_STATUS: &str = "x-ms-substatus";
pub const QUORUM_ACKED_LSN: &str = "x-ms-quorum-acked-lsn";
pub const ACTIVITY_ID: &str = "x-ms-activity-id";

/// Header value as text. Absent is `None`; non-ASCII is malformed.
pub(crate) fn text<'a>(wire: &'a HeaderMap, name: &'static str) -> BarrierResult<Option<&'a str>> {
    match wire.get(name) {
        None => Ok(None),
        Some(value) => value.to_str().map(Some).map_err(|_| {
            BarrierError::malformed_response(format!("header '{}' is not visible ASCII", name))
        }),
    }
}

/// Header value parsed as a number. Absent is `None`; garbage is malformed.
pub(crate) fn number<T: FromStr>(wire: &HeaderMap, name: &'static str) -> BarrierResult<Option<T>> {
    match text(wire, name)? {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            BarrierError::malformed_response(format!(
                "header '{}' has non-numeric value '{}'",
                name, raw
            ))
        }),
    }
}

/// Set a text header, replacing any previous value.
pub(crate) fn set_text(wire: &mut HeaderMap, name: &'static str, value: &str) -> BarrierResult<()> {
    let value = HeaderValue::from_str(value).map_err(|_| {
        BarrierError::malformed_response(format!("header '{}' value is not encodable", name))
    })?;
    wire.insert(name, value);
    Ok(())
}

/// Set a numeric header, replacing any previous value.
pub(crate) fn set_number(wire: &mut HeaderMap, name: &'static str, value: u64) {
    wire.insert(name, HeaderValue::from(value));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::BarrierErrorKind;

    #[test]
    fn test_lookup_ignores_wire_case() {
        let mut wire = HeaderMap::new();
        wire.insert(
            http::HeaderName::from_bytes(b"x-ms-global-Committed-lsn").unwrap(),
            HeaderValue::from_static("10"),
        );

        assert_eq!(number::<u64>(&wire, GLOBAL_COMMITTED_LSN).unwrap(), Some(10));
        assert_eq!(wire.get("X-MS-GLOBAL-COMMITTED-LSN").unwrap(), "10");
    }

    #[test]
    fn test_set_replaces() {
        let mut wire = HeaderMap::new();
        set_number(&mut wire, LSN, 1);
        set_number(&mut wire, LSN, 2);

        assert_eq!(wire.len(), 1);
        assert_eq!(text(&wire, LSN).unwrap(), Some("2"));
    }

    #[test]
    fn test_absent_and_garbage() {
        let mut wire = HeaderMap::new();
        assert_eq!(number::<u64>(&wire, ITEM_LSN).unwrap(), None);

        wire.insert(ITEM_LSN, HeaderValue::from_static("12x"));
        let err = number::<u64>(&wire, ITEM_LSN).unwrap_err();
        assert_eq!(err.kind, BarrierErrorKind::MalformedResponse);
        assert!(err.message.contains("12x"));
    }

    #[test]
    fn test_unencodable_text_is_rejected() {
        let mut wire = HeaderMap::new();
        let err = set_text(&mut wire, ACTIVITY_ID, "bad\nid").unwrap_err();
        assert_eq!(err.kind, BarrierErrorKind::MalformedResponse);
        assert!(wire.is_empty());
    }
}
