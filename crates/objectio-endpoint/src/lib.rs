//! Endpoint parsing, `{A...B}` brace expansion, and erasure-set grouping.
//!
//! An endpoint is either a local absolute filesystem path (`/mnt/disk1`)
//! or an HTTP(S) URL (`http://host:port/path`). Admin tooling accepts a
//! compact brace-ellipsis notation to describe many endpoints at once;
//! this module expands that notation into the endpoint list and then
//! groups the list into fixed-size erasure sets in expansion order.

use objectio_common::{Error, Result};
use std::fmt;

/// A single disk endpoint: a local path or a remote URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// A local absolute filesystem path.
    Path(String),
    /// An `http(s)://host[:port]/path` URL.
    Url(UrlEndpoint),
}

/// The parsed components of a URL endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlEndpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Https => "https",
        })
    }
}

impl fmt::Display for UrlEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme, host_display(&self.host), self.port, self.path)
    }
}

fn host_display(host: &str) -> String {
    if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => f.write_str(p),
            Self::Url(u) => write!(f, "{u}"),
        }
    }
}

/// The set of hostnames/addresses considered "this machine" for `is_local`.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "0.0.0.0", "::"];

impl Endpoint {
    /// Parse a single endpoint string (no brace expansion).
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(rest) = s.strip_prefix("https://") {
            Self::parse_url(Scheme::Https, rest)
        } else if let Some(rest) = s.strip_prefix("http://") {
            Self::parse_url(Scheme::Http, rest)
        } else if let Some(stripped) = s.strip_prefix('/') {
            if stripped.is_empty() {
                return Err(Error::invalid_argument("endpoint: root path '/' is not a valid disk endpoint"));
            }
            Ok(Self::Path(s.to_string()))
        } else {
            Err(Error::invalid_argument(format!(
                "endpoint: unsupported scheme in '{s}' (expected local path or http(s)://)"
            )))
        }
    }

    fn parse_url(scheme: Scheme, rest: &str) -> Result<Self> {
        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], rest[idx..].to_string()),
            None => (rest, "/".to_string()),
        };
        if authority.is_empty() {
            return Err(Error::invalid_argument("endpoint: missing host"));
        }

        let (host, port_str) = if let Some(bracket_end) = authority.strip_prefix('[') {
            let end = bracket_end
                .find(']')
                .ok_or_else(|| Error::invalid_argument("endpoint: unterminated IPv6 literal"))?;
            let host = &bracket_end[..end];
            let after = &bracket_end[end + 1..];
            let port = after
                .strip_prefix(':')
                .ok_or_else(|| Error::invalid_argument("endpoint: missing port after IPv6 host"))?;
            (host.to_string(), port.to_string())
        } else {
            let mut parts = authority.rsplitn(2, ':');
            let port_str = parts.next().unwrap_or_default();
            let host = parts.next();
            match host {
                Some(h) => (h.to_string(), port_str.to_string()),
                None => {
                    return Err(Error::invalid_argument("endpoint: missing port"));
                }
            }
        };

        if host.is_empty() {
            return Err(Error::invalid_argument("endpoint: empty host"));
        }

        let port: u16 = port_str
            .parse()
            .map_err(|_| Error::invalid_argument(format!("endpoint: invalid port '{port_str}'")))?;
        if port == 0 {
            return Err(Error::invalid_argument("endpoint: port must be in 1..=65535"));
        }

        Ok(Self::Url(UrlEndpoint { scheme, host, port, path }))
    }

    /// True for local path endpoints, and for URL endpoints whose host
    /// resolves to this machine (loopback addresses or the system hostname).
    #[must_use]
    pub fn is_local(&self) -> bool {
        match self {
            Self::Path(_) => true,
            Self::Url(u) => {
                LOOPBACK_HOSTS.contains(&u.host.as_str()) || Some(u.host.as_str()) == system_hostname().as_deref()
            }
        }
    }
}

fn system_hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|os| os.into_string().ok())
}

/// Detect and expand a single `{A...B}` brace range in `pattern`.
///
/// Returns `None` if `pattern` contains no brace range. Supports a
/// decimal-integer range (`A ≤ B`) or a single-ASCII-letter range
/// (`A ≤ B`); anything else is `INVALID_ARG`. Only one brace group per
/// pattern is supported, matching the admin CLI's documented form.
pub fn expand_braces(pattern: &str) -> Result<Vec<String>> {
    let Some(open) = pattern.find('{') else {
        return Ok(vec![pattern.to_string()]);
    };
    let close = pattern[open..]
        .find('}')
        .map(|i| open + i)
        .ok_or_else(|| Error::invalid_argument(format!("endpoint pattern: unterminated '{{' in '{pattern}'")))?;

    let prefix = &pattern[..open];
    let body = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    let (a, b) = body
        .split_once("...")
        .ok_or_else(|| Error::invalid_argument(format!("endpoint pattern: expected 'A...B' inside braces, got '{body}'")))?;

    let values = if let (Ok(lo), Ok(hi)) = (a.parse::<i64>(), b.parse::<i64>()) {
        if lo > hi {
            return Err(Error::invalid_argument(format!(
                "endpoint pattern: numeric range {lo}...{hi} has lo > hi"
            )));
        }
        (lo..=hi).map(|n| n.to_string()).collect::<Vec<_>>()
    } else if a.len() == 1 && b.len() == 1 && a.chars().next().unwrap().is_ascii_alphabetic() && b.chars().next().unwrap().is_ascii_alphabetic() {
        let lo = a.as_bytes()[0];
        let hi = b.as_bytes()[0];
        if lo > hi {
            return Err(Error::invalid_argument(format!(
                "endpoint pattern: alphabetic range {a}...{b} has lo > hi"
            )));
        }
        (lo..=hi).map(|c| (c as char).to_string()).collect::<Vec<_>>()
    } else {
        return Err(Error::invalid_argument(format!(
            "endpoint pattern: malformed range '{body}' (expected decimal integers or single letters)"
        )));
    };

    // Recurse in case the suffix contains another brace group, producing
    // the Cartesian product in left-to-right order.
    let suffix_expansions = expand_braces(suffix)?;
    let mut out = Vec::with_capacity(values.len() * suffix_expansions.len());
    for v in &values {
        for s in &suffix_expansions {
            out.push(format!("{prefix}{v}{s}"));
        }
    }
    Ok(out)
}

/// Expand every brace-ellipsis pattern in `patterns`, in order, and parse
/// each resulting string into an [`Endpoint`].
pub fn expand_endpoints(patterns: &[impl AsRef<str>]) -> Result<Vec<Endpoint>> {
    let mut out = Vec::new();
    for pattern in patterns {
        for expanded in expand_braces(pattern.as_ref())? {
            out.push(Endpoint::parse(&expanded)?);
        }
    }
    Ok(out)
}

/// Slice `endpoints` into `disks_per_set`-sized erasure sets, preserving
/// order. `endpoints.len()` must be an exact multiple of `disks_per_set`.
pub fn group_into_sets(endpoints: Vec<Endpoint>, disks_per_set: usize) -> Result<Vec<Vec<Endpoint>>> {
    if disks_per_set == 0 {
        return Err(Error::invalid_argument("group_into_sets: disks_per_set must be > 0"));
    }
    if endpoints.len() % disks_per_set != 0 {
        return Err(Error::invalid_argument(format!(
            "group_into_sets: {} endpoints is not a multiple of disks_per_set={}",
            endpoints.len(),
            disks_per_set
        )));
    }
    Ok(endpoints
        .chunks(disks_per_set)
        .map(<[Endpoint]>::to_vec)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_local_path() {
        let e = Endpoint::parse("/mnt/disk1").unwrap();
        assert!(e.is_local());
        assert_eq!(e.to_string(), "/mnt/disk1");
    }

    #[test]
    fn reject_root_path() {
        assert!(Endpoint::parse("/").is_err());
    }

    #[test]
    fn parse_http_url() {
        let e = Endpoint::parse("http://node1:9000/disk1").unwrap();
        match &e {
            Endpoint::Url(u) => {
                assert_eq!(u.host, "node1");
                assert_eq!(u.port, 9000);
                assert_eq!(u.path, "/disk1");
            }
            Endpoint::Path(_) => panic!("expected Url"),
        }
    }

    #[test]
    fn parse_https_ipv6_url() {
        let e = Endpoint::parse("https://[::1]:9443/disk1").unwrap();
        assert!(e.is_local());
        match e {
            Endpoint::Url(u) => {
                assert_eq!(u.host, "::1");
                assert_eq!(u.port, 9443);
            }
            Endpoint::Path(_) => panic!("expected Url"),
        }
    }

    #[test]
    fn reject_bad_scheme() {
        assert!(Endpoint::parse("ftp://node1:21/disk1").is_err());
    }

    #[test]
    fn reject_bad_port() {
        assert!(Endpoint::parse("http://node1:70000/disk1").is_err());
        assert!(Endpoint::parse("http://node1:0/disk1").is_err());
    }

    #[test]
    fn loopback_is_local() {
        let e = Endpoint::parse("http://127.0.0.1:9000/disk1").unwrap();
        assert!(e.is_local());
        let e = Endpoint::parse("http://localhost:9000/disk1").unwrap();
        assert!(e.is_local());
    }

    #[test]
    fn remote_is_not_local() {
        let e = Endpoint::parse("http://some-remote-host-xyz:9000/disk1").unwrap();
        assert!(!e.is_local());
    }

    #[test]
    fn numeric_brace_expansion() {
        let out = expand_braces("node{1...3}").unwrap();
        assert_eq!(out, vec!["node1", "node2", "node3"]);
    }

    #[test]
    fn numeric_brace_single_value() {
        assert_eq!(expand_braces("node{1...1}").unwrap(), vec!["node1"]);
    }

    #[test]
    fn alphabetic_brace_single_value() {
        assert_eq!(expand_braces("disk{a...a}").unwrap(), vec!["diska"]);
    }

    #[test]
    fn malformed_brace_is_invalid_arg() {
        assert!(expand_braces("node{5...3}").is_err());
        assert!(expand_braces("node{ab...cd}").is_err());
    }

    #[test]
    fn nested_brace_cartesian_product() {
        let out = expand_endpoints(&["http://node{1...2}:9000/disk{a...b}"]).unwrap();
        let strs: Vec<String> = out.iter().map(ToString::to_string).collect();
        assert_eq!(
            strs,
            vec![
                "http://node1:9000/diska",
                "http://node1:9000/diskb",
                "http://node2:9000/diska",
                "http://node2:9000/diskb",
            ]
        );
    }

    #[test]
    fn scenario_endpoint_expansion_and_grouping() {
        let endpoints = expand_endpoints(&["http://node{1...2}:9000/disk{a...b}"]).unwrap();
        let sets = group_into_sets(endpoints, 2).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0][0].to_string(), "http://node1:9000/diska");
        assert_eq!(sets[0][1].to_string(), "http://node1:9000/diskb");
        assert_eq!(sets[1][0].to_string(), "http://node2:9000/diska");
        assert_eq!(sets[1][1].to_string(), "http://node2:9000/diskb");
    }

    #[test]
    fn group_requires_exact_multiple() {
        let endpoints = expand_endpoints(&["/d{1...3}"]).unwrap();
        assert!(group_into_sets(endpoints, 2).is_err());
    }
}
