//! Operation descriptors for the Firecrawl API.
//!
//! Each remote call is described by one row of a dispatch table: HTTP method,
//! path template and the status-code policy. The client is generic over this
//! table instead of carrying one hand-written method per endpoint.

use std::fmt;

/// HTTP method used by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// How a non-2xx response outside of 400 is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// 402/429/500 become a typed response carrying the API's error message
    TypedResponse,
    /// Every non-2xx is a generic HTTP error
    Generic,
}

/// Status codes that a `TypedResponse` operation converts instead of failing
pub const TYPED_ERROR_CODES: &[u16] = &[402, 429, 500];

/// One Firecrawl API operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CrawlStart,
    CrawlStatus,
    Scrape,
    Map,
    ExtractStart,
    ExtractStatus,
}

struct Descriptor {
    method: Method,
    path: &'static str,
    policy: ErrorPolicy,
    label: &'static str,
}

const fn descriptor(op: Operation) -> Descriptor {
    match op {
        Operation::CrawlStart => Descriptor {
            method: Method::Post,
            path: "/crawl",
            policy: ErrorPolicy::Generic,
            label: "crawl",
        },
        Operation::CrawlStatus => Descriptor {
            method: Method::Get,
            path: "/crawl/{id}",
            policy: ErrorPolicy::TypedResponse,
            label: "crawl status",
        },
        Operation::Scrape => Descriptor {
            method: Method::Post,
            path: "/scrape",
            policy: ErrorPolicy::Generic,
            label: "scrape",
        },
        Operation::Map => Descriptor {
            method: Method::Post,
            path: "/map",
            policy: ErrorPolicy::Generic,
            label: "map",
        },
        Operation::ExtractStart => Descriptor {
            method: Method::Post,
            path: "/extract",
            policy: ErrorPolicy::Generic,
            label: "extract",
        },
        Operation::ExtractStatus => Descriptor {
            method: Method::Get,
            path: "/extract/{id}",
            policy: ErrorPolicy::TypedResponse,
            label: "extract status",
        },
    }
}

impl Operation {
    pub fn method(self) -> Method {
        descriptor(self).method
    }

    pub fn policy(self) -> ErrorPolicy {
        descriptor(self).policy
    }

    /// Short human label used in log lines
    pub fn label(self) -> &'static str {
        descriptor(self).label
    }

    /// Resolve the request path, substituting the job id for status operations
    pub fn path(self, job_id: Option<&str>) -> String {
        let template = descriptor(self).path;
        match job_id {
            Some(id) => template.replace("{id}", id),
            None => template.to_string(),
        }
    }

    /// Whether this status code is answered with a typed error response
    pub fn converts_status(self, status: u16) -> bool {
        self.policy() == ErrorPolicy::TypedResponse && TYPED_ERROR_CODES.contains(&status)
    }
}
