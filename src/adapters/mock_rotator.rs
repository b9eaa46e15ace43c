//! Mock rotator: slews instantly to whatever it is told.
//!
//! Like `MockRadio`, clones share state so a test can inspect the commanded
//! positions after handing one clone to the control loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{AzEl, LinkError, LinkResult};
use crate::adapters::mock_radio::DEFAULT_CALL_LOG_LIMIT;
use crate::ports::RotatorLink;

#[derive(Debug)]
struct MockRotatorState {
    position: AzEl,
    offline: bool,
    /// Positions commanded with `set_pos`, oldest first
    commands: VecDeque<AzEl>,
    command_log_limit: usize,
    queries: usize,
}

#[derive(Debug, Clone)]
pub struct MockRotator {
    state: Arc<Mutex<MockRotatorState>>,
}

impl MockRotator {
    pub fn new(position: AzEl) -> Self {
        log::info!(
            "[MOCK ROTATOR] Initialized at az={:.1} el={:.1}",
            position.az,
            position.el
        );
        Self {
            state: Arc::new(Mutex::new(MockRotatorState {
                position,
                offline: false,
                commands: VecDeque::new(),
                command_log_limit: DEFAULT_CALL_LOG_LIMIT,
                queries: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockRotatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn position(&self) -> AzEl {
        self.lock().position
    }

    /// Move the antenna behind the controller's back
    pub fn nudge(&self, position: AzEl) {
        self.lock().position = position;
    }

    /// Keep at most `limit` commanded positions, dropping the oldest
    pub fn set_command_log_limit(&self, limit: usize) {
        let mut state = self.lock();
        state.command_log_limit = limit;
        while state.commands.len() > limit {
            state.commands.pop_front();
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn commands(&self) -> Vec<AzEl> {
        self.lock().commands.iter().copied().collect()
    }

    pub fn queries(&self) -> usize {
        self.lock().queries
    }
}

impl Default for MockRotator {
    fn default() -> Self {
        Self::new(AzEl::new(0.0, 0.0))
    }
}

impl RotatorLink for MockRotator {
    fn get_pos(&mut self) -> LinkResult<AzEl> {
        let mut state = self.lock();
        state.queries += 1;
        if state.offline {
            return Err(LinkError::Connect("mock rotator is offline".to_string()));
        }
        log::info!(
            "[MOCK ROTATOR] GET POS → p → {:.2} {:.2}",
            state.position.az,
            state.position.el
        );
        Ok(state.position)
    }

    fn set_pos(&mut self, pos: AzEl) -> LinkResult<()> {
        let mut state = self.lock();
        if state.offline {
            return Err(LinkError::Connect("mock rotator is offline".to_string()));
        }
        log::info!("[MOCK ROTATOR] SET POS → P {:7.2} {:7.2}", pos.az, pos.el);
        if state.command_log_limit > 0 {
            if state.commands.len() >= state.command_log_limit {
                state.commands.pop_front();
            }
            state.commands.push_back(pos);
        }
        state.position = pos;
        Ok(())
    }
}
