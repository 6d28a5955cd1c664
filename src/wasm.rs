use wasm_bindgen::prelude::*;

use crate::WorkOrderCore;

#[wasm_bindgen]
pub struct WorkOrderApp {
    core: WorkOrderCore,
}

#[wasm_bindgen]
impl WorkOrderApp {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            core: WorkOrderCore::new(),
        }
    }

    /// Apply one JSON command and return the JSON UI tree.
    pub fn dispatch(&mut self, command: &str) -> String {
        self.core.dispatch(command)
    }
}

impl Default for WorkOrderApp {
    fn default() -> Self {
        Self::new()
    }
}
