use crate::engine::StopHandle;

/// Passed to every handler invocation.
///
/// `stop_loop` is how a handler halts the consumer: the request is recorded
/// and the poll loop begins shutdown once the current batch has been fully
/// dispatched.
pub struct DispatchContext {
    stop: StopHandle,
    bot_username: Option<String>,
}

impl DispatchContext {
    pub fn new(stop: StopHandle, bot_username: Option<String>) -> Self {
        Self { stop, bot_username }
    }

    pub fn stop_loop(&self) {
        self.stop.request();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    pub fn bot_username(&self) -> Option<&str> {
        self.bot_username.as_deref()
    }
}
