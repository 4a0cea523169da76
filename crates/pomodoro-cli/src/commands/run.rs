//! Foreground timer: the runtime ticks, stdin steers.

use std::io::Write;

use chrono::Utc;
use pomodoro_core::notify::{title_for, Alert, NotificationView, Notifier};
use pomodoro_core::{
    spawn_session_writer, PeriodType, SessionStore, SettingsStore, TimerHandle, TimerRuntime,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::{load_controller, save_controller, CliResult};

const HELP: &str = "controls: s start, p pause, r reset, k skip, q quit";

/// Redraws one status line in place; rings the bell when a period ends.
struct TerminalNotifier<W> {
    out: W,
}

impl<W: Write + Send + 'static> Notifier for TerminalNotifier<W> {
    fn on_state(&mut self, view: &NotificationView) {
        let controls: Vec<&str> = view.controls.iter().map(|c| c.label()).collect();
        let _ = write!(
            self.out,
            "\r\x1b[2K{}  {}  [{}]",
            view.title,
            view.remaining,
            controls.join(" / ")
        );
        let _ = self.out.flush();
    }

    fn on_period_finished(&mut self, finished: PeriodType, alert: Alert) {
        let bell = if alert.sound { "\x07" } else { "" };
        let _ = writeln!(self.out, "\r\x1b[2K{bell}{} finished", title_for(finished));
    }
}

pub fn run() -> CliResult {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = rt.block_on(foreground());
    // Stdin may still be blocked in a read.
    rt.shutdown_background();
    result
}

async fn foreground() -> CliResult {
    let settings = SettingsStore::open()?;
    let store = SessionStore::open()?;

    let current = settings.current();
    let mut controller = load_controller(&store, &current);
    let mut direct = store.clone();
    for event in controller.catch_up(&current, &mut direct, Utc::now()) {
        tracing::info!(?event, "caught up while away");
    }

    let runtime = TimerRuntime::new();
    let (sink, writer) = spawn_session_writer(store.clone(), runtime.commands());
    let notifier = TerminalNotifier {
        out: std::io::stdout(),
    };
    let (handle, join) = runtime.spawn(controller, settings.subscribe(), sink, notifier);

    println!("{HELP}");
    let steered = steer(BufReader::new(tokio::io::stdin()), &handle).await;

    // An error here means the runtime already stopped on its own.
    let _ = handle.shutdown();
    let controller = join.await?;
    // The runtime dropped its sink; the writer drains what is queued and ends.
    writer.await?;
    save_controller(&store, &controller)?;
    println!();
    steered
}

/// Forward one command per input line until `q` or end of input.
async fn steer<R: AsyncBufRead + Unpin>(input: R, handle: &TimerHandle) -> CliResult {
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "s" => handle.start()?,
            "p" => handle.pause()?,
            "r" => handle.reset()?,
            "k" => handle.skip()?,
            "q" => break,
            "" => {}
            other => println!("\nunknown command '{other}' ({HELP})"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomodoro_core::notify::Control;
    use pomodoro_core::{Database, NullNotifier, Settings, TimerController, TimerState};
    use tokio::sync::watch;

    #[test]
    fn notifier_draws_status_line_and_rings() {
        let mut notifier = TerminalNotifier { out: Vec::new() };
        notifier.on_state(&NotificationView {
            title: "Focus time".to_string(),
            remaining: "24:59".to_string(),
            state: TimerState::Running,
            controls: [Control::Pause, Control::Reset, Control::Skip],
        });
        notifier.on_period_finished(
            PeriodType::Work,
            Alert {
                sound: true,
                vibrate: false,
            },
        );

        let text = String::from_utf8(notifier.out).unwrap();
        assert!(text.starts_with("\r\x1b[2KFocus time  24:59  [Pause / Reset / Skip]"));
        assert!(text.ends_with("\x07Focus time finished\n"));
    }

    #[test]
    fn silent_alert_does_not_ring() {
        let mut notifier = TerminalNotifier { out: Vec::new() };
        notifier.on_period_finished(
            PeriodType::ShortBreak,
            Alert {
                sound: false,
                vibrate: false,
            },
        );
        let text = String::from_utf8(notifier.out).unwrap();
        assert!(!text.contains('\x07'));
        assert!(text.contains("Short break finished"));
    }

    #[tokio::test]
    async fn steer_stops_at_quit() {
        let settings = Settings::default();
        let (_settings_tx, settings_rx) = watch::channel(settings.clone());
        let store = SessionStore::new(Database::open_memory().unwrap());
        let (handle, join) = TimerRuntime::new().spawn(
            TimerController::new(&settings),
            settings_rx,
            store,
            NullNotifier,
        );

        steer(&b"s\nbogus\nk\nq\ns\n"[..], &handle).await.unwrap();
        handle.shutdown().unwrap();

        let controller = join.await.unwrap();
        assert_eq!(controller.engine().period(), PeriodType::ShortBreak);
        assert_eq!(controller.state(), TimerState::Idle);
    }
}
