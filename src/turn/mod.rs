//! TURN relay address providers
//!
//! Sessions are seeded with the public addresses of the TURN/STUN relay so
//! both peers can gather relay candidates. The registry only needs the
//! addresses; where they come from is up to the provider:
//!
//! - [`StaticTurnIps`]: fixed addresses from configuration
//! - [`DnsTurnIps`]: resolves a host name and caches the result

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::pin::Pin;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;

/// Boxed future returned by [`TurnIpProvider::get`]
pub type TurnFuture<'a> = Pin<Box<dyn Future<Output = Result<TurnAddrs, TurnError>> + Send + 'a>>;

/// Errors from TURN address providers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// Name resolution failed
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// Resolution returned no usable address
    #[error("no address available")]
    NoAddress,

    /// Provider did not answer in time
    #[error("lookup timed out")]
    Timeout,
}

/// Public addresses of the TURN relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnAddrs {
    pub v4: Option<Ipv4Addr>,
    pub v6: Option<Ipv6Addr>,
}

impl TurnAddrs {
    pub fn new(v4: Option<Ipv4Addr>, v6: Option<Ipv6Addr>) -> Self {
        Self { v4, v6 }
    }

    /// Check if neither family is available
    pub fn is_empty(&self) -> bool {
        self.v4.is_none() && self.v6.is_none()
    }

    /// Available addresses, v4 first
    pub fn iter(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.v4
            .map(IpAddr::V4)
            .into_iter()
            .chain(self.v6.map(IpAddr::V6))
    }

    fn from_addrs(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut result = Self::default();
        for addr in addrs {
            match addr {
                IpAddr::V4(v4) if result.v4.is_none() => result.v4 = Some(v4),
                IpAddr::V6(v6) if result.v6.is_none() => result.v6 = Some(v6),
                _ => {}
            }
        }
        result
    }
}

/// Source of TURN relay addresses
pub trait TurnIpProvider: Send + Sync + 'static {
    /// Get the current relay addresses
    fn get(&self) -> TurnFuture<'_>;
}

/// Provider returning fixed addresses
#[derive(Debug, Clone, Default)]
pub struct StaticTurnIps {
    addrs: TurnAddrs,
}

impl StaticTurnIps {
    pub fn new(v4: Option<Ipv4Addr>, v6: Option<Ipv6Addr>) -> Self {
        Self {
            addrs: TurnAddrs::new(v4, v6),
        }
    }
}

impl TurnIpProvider for StaticTurnIps {
    fn get(&self) -> TurnFuture<'_> {
        let addrs = self.addrs;
        Box::pin(async move { Ok(addrs) })
    }
}

/// Provider resolving a host name, cached for `ttl`
#[derive(Debug)]
pub struct DnsTurnIps {
    host: String,
    ttl: Duration,
    cache: Mutex<Option<(TurnAddrs, Instant)>>,
}

impl DnsTurnIps {
    pub fn new(host: impl Into<String>, ttl: Duration) -> Self {
        Self {
            host: host.into(),
            ttl,
            cache: Mutex::new(None),
        }
    }

    async fn resolve(&self) -> Result<TurnAddrs, TurnError> {
        let mut cache = self.cache.lock().await;

        if let Some((addrs, resolved_at)) = *cache {
            if resolved_at.elapsed() < self.ttl {
                return Ok(addrs);
            }
        }

        let resolved = tokio::net::lookup_host((self.host.as_str(), 0))
            .await
            .map_err(|e| TurnError::Lookup(e.to_string()))?;
        let addrs = TurnAddrs::from_addrs(resolved.map(|a| a.ip()));
        if addrs.is_empty() {
            return Err(TurnError::NoAddress);
        }

        tracing::debug!(host = %self.host, v4 = ?addrs.v4, v6 = ?addrs.v6, "Resolved TURN addresses");
        *cache = Some((addrs, Instant::now()));
        Ok(addrs)
    }
}

impl TurnIpProvider for DnsTurnIps {
    fn get(&self) -> TurnFuture<'_> {
        Box::pin(self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticTurnIps::new(Some(Ipv4Addr::new(1, 2, 3, 4)), None);
        let addrs = provider.get().await.unwrap();

        assert_eq!(addrs.v4, Some(Ipv4Addr::new(1, 2, 3, 4)));
        assert!(addrs.v6.is_none());
        assert!(!addrs.is_empty());
    }

    #[test]
    fn test_from_addrs_keeps_first_of_each_family() {
        let addrs = TurnAddrs::from_addrs([
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
        ]);

        assert_eq!(addrs.v4, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(addrs.v6, Some(Ipv6Addr::LOCALHOST));
        assert_eq!(addrs.iter().count(), 2);
    }

    #[tokio::test]
    async fn test_dns_provider_resolves_ip_literal() {
        let provider = DnsTurnIps::new("127.0.0.1", Duration::from_secs(60));
        let addrs = provider.get().await.unwrap();

        assert_eq!(addrs.v4, Some(Ipv4Addr::LOCALHOST));

        // Second call is served from cache
        let again = provider.get().await.unwrap();
        assert_eq!(addrs, again);
    }
}
