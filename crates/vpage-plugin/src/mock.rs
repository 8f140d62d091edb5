//! Mock pipeline implementation for testing.
//!
//! Provides [`MockPipeline`] and [`MockFactory`] for exercising the plugin,
//! dev server and build driver without a render worker.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vpage_routes::ModuleId;

use crate::error::PipelineError;
use crate::host::{ModulePipeline, PipelineFactory, ServerModule};

/// Per-page rendering behavior shared by mock pipelines.
#[derive(Debug, Clone, Default)]
struct Behavior {
    html: HashMap<String, String>,
    failures: HashSet<String>,
    missing: HashSet<String>,
}

impl Behavior {
    fn html_for(&self, page: &str) -> String {
        self.html
            .get(page)
            .cloned()
            .unwrap_or_else(|| format!("<html><body data-page=\"{page}\">{page}</body></html>"))
    }
}

/// In-memory module pipeline.
///
/// Server entries render `<html><body data-page="<page>"><page></body></html>`
/// unless configured otherwise. `transform_html` returns its input unchanged
/// and records the call. `transform_client` prefixes the source with a
/// `// bundled <id>` line.
///
/// # Example
///
/// ```ignore
/// use vpage_plugin::MockPipeline;
///
/// let pipeline = MockPipeline::new()
///     .with_html("index", "<html>Home</html>")
///     .with_failure("broken");
/// ```
#[derive(Debug, Default)]
pub struct MockPipeline {
    behavior: Behavior,
    transforms: Mutex<Vec<(String, String)>>,
    closed: Arc<AtomicUsize>,
}

impl MockPipeline {
    /// Create a pipeline with default rendering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `html` for a page.
    #[must_use]
    pub fn with_html(mut self, page: impl Into<String>, html: impl Into<String>) -> Self {
        self.behavior.html.insert(page.into(), html.into());
        self
    }

    /// Make `render()` fail for a page.
    #[must_use]
    pub fn with_failure(mut self, page: impl Into<String>) -> Self {
        self.behavior.failures.insert(page.into());
        self
    }

    /// Make loading or compiling a page's entries fail.
    #[must_use]
    pub fn with_missing(mut self, page: impl Into<String>) -> Self {
        self.behavior.missing.insert(page.into());
        self
    }

    /// Recorded `(url, original_url)` pairs passed to `transform_html`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn transform_calls(&self) -> Vec<(String, String)> {
        self.transforms.lock().unwrap().clone()
    }
}

struct MockModule {
    page: String,
    result: Result<String, String>,
}

#[async_trait]
impl ServerModule for MockModule {
    async fn render(&self) -> Result<String, PipelineError> {
        self.result
            .clone()
            .map_err(|message| PipelineError::Worker(format!("{message} ({})", self.page)))
    }
}

#[async_trait]
impl ModulePipeline for MockPipeline {
    async fn load_module(&self, id: &ModuleId) -> Result<Box<dyn ServerModule>, PipelineError> {
        let ModuleId::ServerEntry(page) = id else {
            return Err(PipelineError::ModuleNotFound(id.to_string()));
        };
        let page = page.as_str();
        if self.behavior.missing.contains(page) {
            return Err(PipelineError::ModuleNotFound(id.to_string()));
        }
        let result = if self.behavior.failures.contains(page) {
            Err("render failed".to_owned())
        } else {
            Ok(self.behavior.html_for(page))
        };
        Ok(Box::new(MockModule {
            page: page.to_owned(),
            result,
        }))
    }

    async fn transform_html(
        &self,
        url: &str,
        html: &str,
        original_url: &str,
    ) -> Result<String, PipelineError> {
        self.transforms
            .lock()
            .map_err(|_| PipelineError::Protocol("mock lock poisoned".to_owned()))?
            .push((url.to_owned(), original_url.to_owned()));
        Ok(html.to_owned())
    }

    async fn transform_client(&self, id: &ModuleId, source: &str) -> Result<String, PipelineError> {
        let ModuleId::ClientEntry(page) = id else {
            return Err(PipelineError::ModuleNotFound(id.to_string()));
        };
        if self.behavior.missing.contains(page.as_str()) {
            return Err(PipelineError::ModuleNotFound(id.to_string()));
        }
        Ok(format!("// bundled {id}\n{source}"))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory producing [`MockPipeline`] instances.
///
/// Counts created instances and `close()` calls across all of them.
#[derive(Debug, Default)]
pub struct MockFactory {
    behavior: Behavior,
    delay: Option<Duration>,
    fail_create: bool,
    created: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl MockFactory {
    /// Create a factory with default rendering.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `html` for a page in every created pipeline.
    #[must_use]
    pub fn with_html(mut self, page: impl Into<String>, html: impl Into<String>) -> Self {
        self.behavior.html.insert(page.into(), html.into());
        self
    }

    /// Make `render()` fail for a page in every created pipeline.
    #[must_use]
    pub fn with_failure(mut self, page: impl Into<String>) -> Self {
        self.behavior.failures.insert(page.into());
        self
    }

    /// Sleep before each creation completes.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every creation fail.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Number of pipelines created.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of `close()` calls across created pipelines.
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineFactory for MockFactory {
    async fn create(&self) -> Result<Arc<dyn ModulePipeline>, PipelineError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create {
            return Err(PipelineError::Worker("mock creation failed".to_owned()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPipeline {
            behavior: self.behavior.clone(),
            transforms: Mutex::new(Vec::new()),
            closed: Arc::clone(&self.closed),
        }))
    }
}
