pub mod config;
pub mod history;
pub mod run;
pub mod stats;
pub mod timer;

use pomodoro_core::{SessionStore, Settings, TimerController, CONTROLLER_KEY};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Restore the persisted controller, or start fresh from `settings`.
fn load_controller(store: &SessionStore, settings: &Settings) -> TimerController {
    match store.kv_get(CONTROLLER_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<TimerController>(&json) {
            Ok(mut controller) => {
                controller.apply_settings(settings);
                controller
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable timer state");
                TimerController::new(settings)
            }
        },
        Ok(None) => TimerController::new(settings),
        Err(e) => {
            tracing::warn!(error = %e, "could not read timer state");
            TimerController::new(settings)
        }
    }
}

fn save_controller(store: &SessionStore, controller: &TimerController) -> CliResult {
    let json = serde_json::to_string(controller)?;
    store.kv_set(CONTROLLER_KEY, &json)?;
    Ok(())
}
