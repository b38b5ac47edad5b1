// # IP Source Trait
//
// Defines the interface for discovering the host's current public IP.
//
// ## Implementations
//
// - HTTP-based: `hddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use hddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> hddns_core::Result<()> {
//     let source = /* IpSource implementation */;
//     let current_ip = source.current().await?;
//     println!("public IP: {}", current_ip);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform the I/O needed to learn the public IP (HTTP, sockets)
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `RecordSetProvider`)
/// - ❌ Implement retry logic or polling loops (owned by `SyncEngine`)
/// - ❌ Cache the IP across calls
///
/// Implementations must bound every request with a timeout.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IP address
    ///
    /// Each call asks the source afresh.
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error)`: Source unreachable or answer not an IP address
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Short name of this source (for logging)
    fn source_name(&self) -> &'static str;
}
