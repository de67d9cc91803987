use crate::domain::ports::SessionHandler;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_millis(1000);

impl<F> SessionHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_session_expired(&self) {
        self()
    }
}

/// 會話失效後延遲呼叫 `reload`，呼叫端不等待
#[derive(Clone)]
pub struct DelayedReload {
    delay: Duration,
    reload: Arc<dyn Fn() + Send + Sync>,
}

impl DelayedReload {
    pub fn new<F>(reload: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            delay: DEFAULT_RELOAD_DELAY,
            reload: Arc::new(reload),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl SessionHandler for DelayedReload {
    fn on_session_expired(&self) {
        let reload = Arc::clone(&self.reload);
        let delay = self.delay;
        tracing::debug!("🔄 Reload scheduled in {:?}", delay);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    reload();
                });
            }
            Err(_) => {
                // 不在 tokio runtime 內
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    reload();
                });
            }
        }
    }
}
