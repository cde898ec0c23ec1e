use super::super::fixtures::vex_document;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use vex_discovery::prelude::{DiscoveryError, Options, PackageUrl, Prober, VexDocument};

/// Mock Prober returning canned documents
pub struct MockProber {
    documents: usize,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockProber {
    pub fn new(documents: usize) -> Self {
        Self {
            documents,
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_failure() -> Self {
        Self {
            documents: 0,
            should_fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for MockProber {
    async fn find_documents_from_purl(
        &self,
        _options: &Options,
        purl: &PackageUrl,
    ) -> Result<Vec<VexDocument>, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(DiscoveryError::UnsupportedScheme {
                scheme: purl.purl_type().to_string(),
            });
        }

        Ok((0..self.documents)
            .map(|i| vex_document(&format!("https://example.com/vex/{}-{}", purl.name(), i)))
            .collect())
    }
}
