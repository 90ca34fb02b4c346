//! Status and sub-status codes carried by store responses.

use std::fmt;

/// HTTP-like status code of a store response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const CREATED: StatusCode = StatusCode(201);
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    pub const NOT_MODIFIED: StatusCode = StatusCode(304);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const REQUEST_TIMEOUT: StatusCode = StatusCode(408);
    pub const CONFLICT: StatusCode = StatusCode(409);
    pub const GONE: StatusCode = StatusCode(410);
    pub const PRECONDITION_FAILED: StatusCode = StatusCode(412);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    /// First status code that counts as an error.
    const STARTING_ERROR_CODE: u16 = 400;

    /// Create a status code from its numeric value.
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    /// Numeric value.
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// True for every status below 400.
    pub fn is_success(&self) -> bool {
        self.0 < Self::STARTING_ERROR_CODE
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fine-grained reason attached to a status code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SubStatusCode(u32);

impl SubStatusCode {
    pub const UNKNOWN: SubStatusCode = SubStatusCode(0);
    /// Session token not yet available on the replica (only meaningful with 404).
    pub const READ_SESSION_NOT_AVAILABLE: SubStatusCode = SubStatusCode(1002);
    /// Replica cannot serve the barrier check, e.g. ownership changed.
    pub const LEASE_NOT_FOUND: SubStatusCode = SubStatusCode(1022);

    pub fn new(code: u32) -> Self {
        Self(code)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
