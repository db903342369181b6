pub mod flow;
pub mod playback;
pub mod settings;
pub mod song;

use serde::Serialize;
use tauri::State;

use crate::flow::Workflow;
use crate::state::AppState;

#[derive(Serialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

#[tauri::command]
pub fn get_app_info() -> AppInfo {
    AppInfo {
        name: "Co-Compose".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Snapshot of the workflow for the frontend to render.
#[tauri::command]
pub fn get_workflow(state: State<'_, AppState>) -> Workflow {
    state.workflow.lock().unwrap().clone()
}
