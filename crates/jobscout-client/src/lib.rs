#[cfg(feature = "browser")]
pub mod browser;
pub mod cleaner;
pub mod direct;
pub mod dom;
pub mod executor;
pub mod extract;
pub mod fingerprint;
pub mod guard;
mod http;
pub mod proxy;
pub mod timing;
pub mod tor;

#[cfg(feature = "browser")]
pub use browser::{BrowserConfig, BrowserExecutor, BrowserPool};
pub use cleaner::TextCleaner;
pub use direct::DirectExecutor;
pub use dom::{DomNode, DomQuery, HtmlDocument};
pub use executor::{Executor, ExecutorSettings, detect_executors};
pub use extract::ExtractorSuite;
pub use fingerprint::{Fingerprint, SessionFingerprints};
pub use proxy::{ProxyExecutor, ProxyPool, ProxyPoolConfig};
pub use timing::{BrowserBehavior, HumanTiming};
pub use tor::{TorConfig, TorController, TorExecutor};
