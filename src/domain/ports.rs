use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 給日誌用的完整位置
    fn location(&self, path: &str) -> String;
}

/// A single browser page driven by CSS selectors.
///
/// Implementations own the remote session; `close` must be safe to call once at
/// the end of a run whatever state the page is in.
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;
    async fn current_url(&mut self) -> Result<String>;
    async fn click(&mut self, selector: &str) -> Result<()>;
    /// Clicks the first `item` inside the `index`-th element matching `container`.
    async fn click_within(&mut self, container: &str, index: usize, item: &str) -> Result<()>;
    async fn fill(&mut self, selector: &str, text: &str) -> Result<()>;
    async fn is_present(&mut self, selector: &str) -> Result<bool>;
    async fn page_source(&mut self) -> Result<String>;
    /// PNG bytes of the current viewport
    async fn screenshot(&mut self) -> Result<Vec<u8>>;
    async fn close(&mut self) -> Result<()>;
}
