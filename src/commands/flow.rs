use tauri::State;

use crate::emotion::UserEmotion;
use crate::error::AppError;
use crate::flow::Workflow;
use crate::state::AppState;

#[tauri::command]
pub fn start_flow(state: State<'_, AppState>) -> Result<Workflow, AppError> {
    let mut workflow = state.workflow.lock().unwrap();
    workflow.start()?;
    Ok(workflow.clone())
}

/// The performance is over; open the emotion input screen.
#[tauri::command]
pub fn begin_emotion_input(state: State<'_, AppState>) -> Result<Workflow, AppError> {
    let mut workflow = state.workflow.lock().unwrap();
    workflow.begin_input()?;
    Ok(workflow.clone())
}

/// Record one reaction. Blank text is ignored and yields `None`.
#[tauri::command]
pub fn add_emotion(text: String, state: State<'_, AppState>) -> Option<UserEmotion> {
    let mut workflow = state.workflow.lock().unwrap();
    let added = workflow.board_mut().add(&text).cloned();
    crate::app_log!(
        "[flow] add_emotion accepted={} total={}",
        added.is_some(),
        workflow.board().len()
    );
    added
}

#[tauri::command]
pub fn remove_emotion(id: String, state: State<'_, AppState>) -> bool {
    state.workflow.lock().unwrap().board_mut().remove(&id)
}

#[tauri::command]
pub fn finalize_emotions(state: State<'_, AppState>) -> Result<Workflow, AppError> {
    let mut workflow = state.workflow.lock().unwrap();
    workflow.finalize_emotions()?;
    Ok(workflow.clone())
}

#[tauri::command]
pub fn restart_flow(state: State<'_, AppState>) -> Workflow {
    let mut workflow = state.workflow.lock().unwrap();
    workflow.restart();
    crate::app_log!("[flow] restarted");
    workflow.clone()
}
