//! Logical Store Response
//!
//! The typed view of a replica response that all barrier logic works with.
//! The central predicate is [`LogicalStoreResponse::is_globally_committed`]:
//! an LSN is globally committed iff the reported global committed LSN is at
//! least as large.

use http::HeaderMap;

use super::headers;
use super::lsn::Lsn;
use super::status::{StatusCode, SubStatusCode};
use crate::barrier::BarrierResult;

/// A store response with the consistency-relevant fields lifted out of the
/// wire headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalStoreResponse {
    /// HTTP-like status
    pub status_code: StatusCode,

    /// Fine-grained reason for the status
    pub sub_status_code: SubStatusCode,

    /// LSN assigned to the operation at the serving replica
    pub lsn: Option<Lsn>,

    /// Highest LSN durably committed across all regions at response time
    pub global_committed_lsn: Option<Lsn>,

    /// Number of read regions on the account; absent means zero
    pub number_of_read_regions: u32,

    /// LSN of the item version returned (reads only)
    pub item_lsn: Option<Lsn>,

    /// Quorum-acknowledged LSN at the serving replica, diagnostics only
    pub quorum_acked_lsn: Option<Lsn>,

    /// Backend activity id, if the transport reported one
    pub activity_id: Option<String>,
}

impl LogicalStoreResponse {
    /// A response with only a status set.
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            sub_status_code: SubStatusCode::UNKNOWN,
            lsn: None,
            global_committed_lsn: None,
            number_of_read_regions: 0,
            item_lsn: None,
            quorum_acked_lsn: None,
            activity_id: None,
        }
    }

    /// 410 Gone with sub-status LeaseNotFound.
    pub fn lease_not_found() -> Self {
        Self::new(StatusCode::GONE).with_sub_status(SubStatusCode::LEASE_NOT_FOUND)
    }

    pub fn with_sub_status(mut self, sub_status: SubStatusCode) -> Self {
        self.sub_status_code = sub_status;
        self
    }

    pub fn with_lsn(mut self, lsn: u64) -> Self {
        self.lsn = Some(Lsn::new(lsn));
        self
    }

    pub fn with_global_committed_lsn(mut self, lsn: u64) -> Self {
        self.global_committed_lsn = Some(Lsn::new(lsn));
        self
    }

    pub fn with_number_of_read_regions(mut self, regions: u32) -> Self {
        self.number_of_read_regions = regions;
        self
    }

    pub fn with_item_lsn(mut self, lsn: u64) -> Self {
        self.item_lsn = Some(Lsn::new(lsn));
        self
    }

    pub fn with_quorum_acked_lsn(mut self, lsn: u64) -> Self {
        self.quorum_acked_lsn = Some(Lsn::new(lsn));
        self
    }

    pub fn with_activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    /// True for 410 with sub-status LeaseNotFound.
    pub fn is_lease_not_found(&self) -> bool {
        self.status_code == StatusCode::GONE
            && self.sub_status_code == SubStatusCode::LEASE_NOT_FOUND
    }

    /// More than one read region: barrier checks apply.
    pub fn is_multi_region(&self) -> bool {
        self.number_of_read_regions > 1
    }

    /// The LSN a point read has to confirm.
    ///
    /// When the item LSN is present the lower of item LSN and LSN is used;
    /// the replica may have applied later operations to other items.
    pub fn read_lsn(&self) -> Option<Lsn> {
        match (self.item_lsn, self.lsn) {
            (Some(item), Some(lsn)) => Some(item.min(lsn)),
            (Some(item), None) => Some(item),
            (None, lsn) => lsn,
        }
    }

    /// `global_committed_lsn >= required`. An absent global committed LSN
    /// never confirms anything.
    pub fn is_globally_committed(&self, required: Lsn) -> bool {
        self.global_committed_lsn
            .map_or(false, |committed| committed >= required)
    }

    /// Build the typed view from a raw status and the wire headers.
    ///
    /// Numeric headers that do not parse are a malformed response; absent
    /// headers are `None` (or zero read regions).
    pub fn from_headers(status: u16, wire: &HeaderMap) -> BarrierResult<Self> {
        Ok(Self {
            status_code: StatusCode::new(status),
            sub_status_code: headers::number::<u32>(wire, headers::SUB_STATUS)?
                .map(SubStatusCode::new)
                .unwrap_or_default(),
            lsn: headers::number::<u64>(wire, headers::LSN)?.map(Lsn::new),
            global_committed_lsn: headers::number::<u64>(wire, headers::GLOBAL_COMMITTED_LSN)?
                .map(Lsn::new),
            number_of_read_regions: headers::number::<u32>(wire, headers::NUMBER_OF_READ_REGIONS)?
                .unwrap_or(0),
            item_lsn: headers::number::<u64>(wire, headers::ITEM_LSN)?.map(Lsn::new),
            quorum_acked_lsn: headers::number::<u64>(wire, headers::QUORUM_ACKED_LSN)?
                .map(Lsn::new),
            activity_id: headers::text(wire, headers::ACTIVITY_ID)?.map(str::to_string),
        })
    }

    /// Render the typed fields back into wire headers. Absent fields are
    /// omitted; zero read regions is omitted as well. Fails only when the
    /// activity id cannot be carried in a header value.
    pub fn to_headers(&self) -> BarrierResult<HeaderMap> {
        let mut out = HeaderMap::new();
        if self.sub_status_code != SubStatusCode::UNKNOWN {
            headers::set_number(&mut out, headers::SUB_STATUS, u64::from(self.sub_status_code.as_u32()));
        }
        if let Some(lsn) = self.lsn {
            headers::set_number(&mut out, headers::LSN, lsn.value());
        }
        if let Some(lsn) = self.global_committed_lsn {
            headers::set_number(&mut out, headers::GLOBAL_COMMITTED_LSN, lsn.value());
        }
        if self.number_of_read_regions > 0 {
            headers::set_number(
                &mut out,
                headers::NUMBER_OF_READ_REGIONS,
                u64::from(self.number_of_read_regions),
            );
        }
        if let Some(lsn) = self.item_lsn {
            headers::set_number(&mut out, headers::ITEM_LSN, lsn.value());
        }
        if let Some(lsn) = self.quorum_acked_lsn {
            headers::set_number(&mut out, headers::QUORUM_ACKED_LSN, lsn.value());
        }
        if let Some(ref id) = self.activity_id {
            headers::set_text(&mut out, headers::ACTIVITY_ID, id)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrier::BarrierErrorKind;
    use http::HeaderValue;

    fn wire(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    #[test]
    fn test_globally_committed_predicate() {
        let response = LogicalStoreResponse::new(StatusCode::OK).with_global_committed_lsn(100);

        assert!(response.is_globally_committed(Lsn::new(100)));
        assert!(response.is_globally_committed(Lsn::new(99)));
        assert!(!response.is_globally_committed(Lsn::new(101)));
    }

    #[test]
    fn test_zero_global_committed_lsn_is_behind() {
        let response = LogicalStoreResponse::new(StatusCode::CREATED)
            .with_lsn(17)
            .with_global_committed_lsn(0);
        assert!(!response.is_globally_committed(Lsn::new(17)));
    }

    #[test]
    fn test_absent_global_committed_lsn_confirms_nothing() {
        let response = LogicalStoreResponse::new(StatusCode::OK);
        assert!(!response.is_globally_committed(Lsn::ZERO));
    }

    #[test]
    fn test_read_lsn_prefers_lower_of_item_and_lsn() {
        let response = LogicalStoreResponse::new(StatusCode::OK)
            .with_lsn(120)
            .with_item_lsn(100);
        assert_eq!(response.read_lsn(), Some(Lsn::new(100)));

        let no_item = LogicalStoreResponse::new(StatusCode::OK).with_lsn(120);
        assert_eq!(no_item.read_lsn(), Some(Lsn::new(120)));

        let neither = LogicalStoreResponse::new(StatusCode::OK);
        assert_eq!(neither.read_lsn(), None);
    }

    #[test]
    fn test_lease_not_found() {
        let response = LogicalStoreResponse::lease_not_found();
        assert!(response.is_lease_not_found());
        assert_eq!(response.status_code, StatusCode::GONE);

        let other_gone = LogicalStoreResponse::new(StatusCode::GONE);
        assert!(!other_gone.is_lease_not_found());
    }

    #[test]
    fn test_multi_region_requires_more_than_one() {
        let base = LogicalStoreResponse::new(StatusCode::OK);
        assert!(!base.clone().with_number_of_read_regions(0).is_multi_region());
        assert!(!base.clone().with_number_of_read_regions(1).is_multi_region());
        assert!(base.with_number_of_read_regions(2).is_multi_region());
    }

    #[test]
    fn test_from_headers() {
        let wire = wire(&[
            (headers::NUMBER_OF_READ_REGIONS, "2"),
            (headers::GLOBAL_COMMITTED_LSN, "50"),
            (headers::LSN, "100"),
            (headers::ITEM_LSN, "100"),
        ]);

        let response = LogicalStoreResponse::from_headers(200, &wire).unwrap();
        assert_eq!(response.status_code, StatusCode::OK);
        assert_eq!(response.number_of_read_regions, 2);
        assert_eq!(response.global_committed_lsn, Some(Lsn::new(50)));
        assert_eq!(response.lsn, Some(Lsn::new(100)));
        assert_eq!(response.item_lsn, Some(Lsn::new(100)));
        assert_eq!(response.sub_status_code, SubStatusCode::UNKNOWN);
    }

    #[test]
    fn test_from_headers_lease_not_found() {
        let wire = wire(&[(headers::SUB_STATUS, "1022")]);
        let response = LogicalStoreResponse::from_headers(410, &wire).unwrap();
        assert!(response.is_lease_not_found());
        assert_eq!(response.lsn, None);
        assert_eq!(response.number_of_read_regions, 0);
    }

    #[test]
    fn test_from_headers_rejects_garbage() {
        let wire = wire(&[(headers::GLOBAL_COMMITTED_LSN, "not-a-number")]);
        let err = LogicalStoreResponse::from_headers(200, &wire).unwrap_err();
        assert_eq!(err.kind, BarrierErrorKind::MalformedResponse);
        assert!(err.message.contains("not-a-number"));
    }

    #[test]
    fn test_to_headers_carries_fields_verbatim() {
        let response = LogicalStoreResponse::lease_not_found()
            .with_number_of_read_regions(3)
            .with_lsn(8)
            .with_activity_id("abc");

        let wire = response.to_headers().unwrap();
        assert_eq!(wire.get(headers::SUB_STATUS).unwrap(), "1022");
        assert_eq!(wire.get(headers::NUMBER_OF_READ_REGIONS).unwrap(), "3");
        assert_eq!(wire.get(headers::LSN).unwrap(), "8");
        assert_eq!(wire.get(headers::ACTIVITY_ID).unwrap(), "abc");
        assert!(wire.get(headers::GLOBAL_COMMITTED_LSN).is_none());

        let parsed = LogicalStoreResponse::from_headers(410, &wire).unwrap();
        assert_eq!(parsed, response);
    }
}
