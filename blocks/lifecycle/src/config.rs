/// Engine tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Command channel capacity.
    pub command_capacity: usize,
    /// UI push channel capacity.
    pub ui_capacity: usize,
    /// Completing a task under this many seconds earns the speed bonus.
    pub speed_bonus_threshold_secs: u32,
    pub speed_bonus: u32,
    /// Fixed bonus for attaching a photo proof.
    pub photo_bonus: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_capacity: 64,
            ui_capacity: 256,
            speed_bonus_threshold_secs: 300,
            speed_bonus: 20,
            photo_bonus: 10,
        }
    }
}
