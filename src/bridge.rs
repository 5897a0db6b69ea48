use crate::backend::{
    default_stack_root, detect_stack_tools, ControlEvent, StackConfig, StackController,
    StartParams, ToolStatus,
};

/// The only surface the view is given. Five callable operations
/// (`start`, `stop`, `upload_files`, `poll`, `shutdown`) and the
/// `ControlEvent` notifications coming back out of `poll`; the
/// controller itself, the spawn helpers, and the launch configuration
/// all stay behind it. The view never holds a process handle and never
/// builds a command line.
pub struct ControlBridge {
    controller: StackController,
    tools: Vec<ToolStatus>,
}

impl ControlBridge {
    pub fn new() -> Self {
        Self::with_config(StackConfig::for_platform(default_stack_root()))
    }

    fn with_config(config: StackConfig) -> Self {
        Self {
            controller: StackController::new(config),
            tools: Vec::new(),
        }
    }

    pub fn start(&mut self, params: StartParams) {
        self.controller.start(params);
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn upload_files(&mut self) {
        self.controller.upload_files();
    }

    pub fn poll(&mut self) -> Vec<ControlEvent> {
        self.controller.poll()
    }

    /// Host-shutdown hook, not a view control: kills a busy slot and
    /// fires the teardown command without waiting for it.
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
    }

    /// Probe the external tools once and keep the snapshot for display.
    pub fn refresh_tools(&mut self) {
        self.tools = detect_stack_tools(self.controller.config());
    }

    pub fn tools(&self) -> &[ToolStatus] {
        &self.tools
    }
}
