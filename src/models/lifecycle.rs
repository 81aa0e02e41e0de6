use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Ready,
    Stopping,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Launch,
    BecameReady,
    Stop,
    Exited,
    Fault,
}

impl LifecycleState {
    /// 根据事件返回下一个状态，非法转换返回 `None`
    pub fn on(self, event: LifecycleEvent) -> Option<LifecycleState> {
        use LifecycleEvent::*;
        use LifecycleState::*;

        match (self, event) {
            (Stopped, Launch) | (Failed, Launch) => Some(Starting),
            (Starting, BecameReady) => Some(Ready),
            (Starting, Fault) | (Stopping, Fault) => Some(Failed),
            (Ready, Stop) | (Failed, Stop) => Some(Stopping),
            (Stopping, Exited) => Some(Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Starting => "starting",
            LifecycleState::Ready => "ready",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 记录单个进程在启动/停止过程中的状态变化
#[derive(Debug)]
pub struct Lifecycle {
    name: String,
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new(name: &str, state: LifecycleState) -> Self {
        Self {
            name: name.to_string(),
            state,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn advance(&mut self, event: LifecycleEvent) {
        match self.state.on(event) {
            Some(next) => {
                log::debug!("{}: {} -> {}", self.name, self.state, next);
                self.state = next;
            }
            None => log::debug!("{}: ignoring {:?} while {}", self.name, event, self.state),
        }
    }
}
