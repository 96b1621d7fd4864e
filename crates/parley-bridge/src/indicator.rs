//! Reaction-based status on the triggering message.
//!
//! none → working (:thinking_face:) → success (:checkered_flag:) | failure (:interrobang:)
//!
//! The working marker is always removed before a terminal marker is added.
//! Every host call is best-effort: failures are logged and swallowed.

use std::sync::Arc;

use tracing::debug;

use parley_core::types::MessageId;

use crate::host::OutboundRenderer;

pub const WORKING: &str = ":thinking_face:";
pub const SUCCESS: &str = ":checkered_flag:";
pub const FAILURE: &str = ":interrobang:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    None,
    Working,
    Succeeded,
    Failed,
}

/// Handle that owns the reaction status of a single message.
///
/// Dropping a handle that is still `Working` schedules removal of the marker
/// on the current runtime.
pub struct Indicator {
    renderer: Arc<dyn OutboundRenderer>,
    message_id: MessageId,
    state: IndicatorState,
    enabled: bool,
}

impl Indicator {
    pub fn new(renderer: Arc<dyn OutboundRenderer>, message_id: MessageId, enabled: bool) -> Self {
        Self {
            renderer,
            message_id,
            state: IndicatorState::None,
            enabled,
        }
    }

    pub fn state(&self) -> IndicatorState {
        self.state
    }

    /// Show the working marker.
    pub async fn working(&mut self) {
        if !self.enabled || self.state != IndicatorState::None {
            return;
        }
        self.add(WORKING).await;
        self.state = IndicatorState::Working;
    }

    pub async fn succeed(&mut self) {
        self.finish(SUCCESS, IndicatorState::Succeeded).await;
    }

    pub async fn fail(&mut self) {
        self.finish(FAILURE, IndicatorState::Failed).await;
    }

    async fn finish(&mut self, symbol: &str, terminal: IndicatorState) {
        if !self.enabled || matches!(self.state, IndicatorState::Succeeded | IndicatorState::Failed) {
            return;
        }
        if let Err(e) = self.renderer.remove_indicators(&self.message_id).await {
            debug!(error = %e, message = %self.message_id, "indicator removal failed");
        }
        self.add(symbol).await;
        self.state = terminal;
    }

    async fn add(&self, symbol: &str) {
        if let Err(e) = self.renderer.add_indicator(&self.message_id, symbol).await {
            debug!(error = %e, message = %self.message_id, symbol, "indicator add failed");
        }
    }
}

impl Drop for Indicator {
    fn drop(&mut self) {
        if self.state != IndicatorState::Working {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let renderer = Arc::clone(&self.renderer);
        let message_id = self.message_id.clone();
        handle.spawn(async move {
            let _ = renderer.remove_indicators(&message_id).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use async_trait::async_trait;
    use parley_core::types::Room;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OutboundRenderer for Recorder {
        async fn send_to_thread(&self, _: &Room, _: &str, _: &str) -> Result<(), RenderError> {
            Ok(())
        }
        async fn send_notification(&self, _: &Room, _: &str) -> Result<(), RenderError> {
            Ok(())
        }
        async fn add_indicator(&self, _: &MessageId, symbol: &str) -> Result<(), RenderError> {
            self.calls.lock().unwrap().push(format!("add {symbol}"));
            if self.fail {
                return Err(RenderError("no permission".into()));
            }
            Ok(())
        }
        async fn remove_indicators(&self, _: &MessageId) -> Result<(), RenderError> {
            self.calls.lock().unwrap().push("remove".into());
            Ok(())
        }
    }

    #[tokio::test]
    async fn success_path_removes_working_first() {
        let rec = Arc::new(Recorder::default());
        let mut ind = Indicator::new(rec.clone(), "m1".into(), true);
        ind.working().await;
        assert_eq!(ind.state(), IndicatorState::Working);
        ind.succeed().await;
        assert_eq!(ind.state(), IndicatorState::Succeeded);
        assert_eq!(rec.calls(), ["add :thinking_face:", "remove", "add :checkered_flag:"]);
    }

    #[tokio::test]
    async fn failure_path_removes_working_first() {
        let rec = Arc::new(Recorder::default());
        let mut ind = Indicator::new(rec.clone(), "m1".into(), true);
        ind.working().await;
        ind.fail().await;
        assert_eq!(rec.calls(), ["add :thinking_face:", "remove", "add :interrobang:"]);
    }

    #[tokio::test]
    async fn terminal_state_is_final() {
        let rec = Arc::new(Recorder::default());
        let mut ind = Indicator::new(rec.clone(), "m1".into(), true);
        ind.working().await;
        ind.succeed().await;
        ind.fail().await;
        ind.working().await;
        assert_eq!(ind.state(), IndicatorState::Succeeded);
        assert_eq!(rec.calls().len(), 3);
    }

    #[tokio::test]
    async fn disabled_makes_no_calls() {
        let rec = Arc::new(Recorder::default());
        let mut ind = Indicator::new(rec.clone(), "m1".into(), false);
        ind.working().await;
        ind.succeed().await;
        assert!(rec.calls().is_empty());
        assert_eq!(ind.state(), IndicatorState::None);
    }

    #[tokio::test]
    async fn host_errors_do_not_block_transitions() {
        let rec = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let mut ind = Indicator::new(rec.clone(), "m1".into(), true);
        ind.working().await;
        ind.fail().await;
        assert_eq!(ind.state(), IndicatorState::Failed);
    }

    #[tokio::test]
    async fn drop_while_working_cleans_up() {
        let rec = Arc::new(Recorder::default());
        {
            let mut ind = Indicator::new(rec.clone(), "m1".into(), true);
            ind.working().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(rec.calls(), ["add :thinking_face:", "remove"]);
    }
}
