//! External content scanner.

use async_trait::async_trait;

/// Outcome of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean,
    /// Payload rejected, with the scanner's finding
    Infected(String),
    /// Scanner could not be reached
    Unavailable(String),
}

/// Scans artifact payloads before they are stored
#[async_trait]
pub trait ContentValidator: Send + Sync {
    async fn scan(&self, data: &[u8]) -> ScanVerdict;
}

/// Accepts every payload
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

#[async_trait]
impl ContentValidator for NoopValidator {
    async fn scan(&self, _data: &[u8]) -> ScanVerdict {
        ScanVerdict::Clean
    }
}
