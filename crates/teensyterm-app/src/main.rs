slint::include_modules!();

mod settings;

use anyhow::{Context, Result};
use settings::Settings;
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use teensyterm_core::{ConnectionState, Monitor, SystemPorts, TextEncoding};

/// How often the driver loop reads the port and redraws.
const TICK: Duration = Duration::from_millis(20);

type SharedMonitor = Rc<RefCell<Monitor<SystemPorts>>>;

/// Log revisions last pushed to the window.
#[derive(Debug, Clone, Copy)]
struct Shown {
    system: u64,
    output: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = Settings::path();
    let settings = settings_path
        .as_deref()
        .map(Settings::load)
        .unwrap_or_default();

    let mut monitor = Monitor::new(SystemPorts, settings.monitor_config())
        .context("open backup file")?;
    monitor.brief();
    let monitor: SharedMonitor = Rc::new(RefCell::new(monitor));

    let shown = Rc::new(Cell::new(None::<Shown>));

    let app = MainWindow::new()?;
    app.set_port_name(settings.port.clone().into());
    app.set_file_name(settings.file_name.clone().into());
    app.set_auto_save(settings.auto_save);
    app.set_auto_scroll(settings.auto_scroll);
    let encodings: Vec<slint::SharedString> = TextEncoding::ALL
        .iter()
        .map(|e| e.to_string().into())
        .collect();
    app.set_encodings(Rc::new(slint::VecModel::from(encodings)).into());
    app.set_encoding(settings.text_encoding().to_string().into());
    refresh(&app, &monitor.borrow(), &shown);

    // Send button and Enter in the command field
    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.on_send_clicked(move |text| {
            let Some(app) = app_weak.upgrade() else { return };
            if monitor.borrow_mut().send(&text) {
                app.set_command_text("".into());
            }
            refresh(&app, &monitor.borrow(), &shown);
        });
    }

    // Open serial port
    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.on_connect_clicked(move |port| {
            let Some(app) = app_weak.upgrade() else { return };
            monitor.borrow_mut().connect(&port);
            refresh(&app, &monitor.borrow(), &shown);
        });
    }

    // Close serial port
    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.on_disconnect_clicked(move || {
            let Some(app) = app_weak.upgrade() else { return };
            monitor.borrow_mut().disconnect();
            refresh(&app, &monitor.borrow(), &shown);
        });
    }

    // Scan ports
    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.on_scan_clicked(move || {
            let Some(app) = app_weak.upgrade() else { return };
            monitor.borrow_mut().scan_ports();
            refresh(&app, &monitor.borrow(), &shown);
        });
    }

    // Save snapshot
    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.on_save_clicked(move |name| {
            let Some(app) = app_weak.upgrade() else { return };
            monitor.borrow_mut().request_save(&name);
            refresh(&app, &monitor.borrow(), &shown);
        });
    }

    // Clear output
    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.on_clear_clicked(move || {
            let Some(app) = app_weak.upgrade() else { return };
            monitor.borrow_mut().request_clear();
            refresh(&app, &monitor.borrow(), &shown);
        });
    }

    {
        let monitor = monitor.clone();
        app.on_auto_save_toggled(move |enabled| {
            monitor.borrow_mut().set_mirror_enabled(enabled);
        });
    }

    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.on_encoding_changed(move |name| {
            let Some(app) = app_weak.upgrade() else { return };
            let encoding = name.as_str().parse().unwrap_or_default();
            log::debug!("decoding incoming text as {encoding}");
            monitor.borrow_mut().set_encoding(encoding);
            refresh(&app, &monitor.borrow(), &shown);
        });
    }

    // Confirmation dialog
    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.on_prompt_answered(move |yes| {
            let Some(app) = app_weak.upgrade() else { return };
            monitor.borrow_mut().answer(yes);
            if !monitor.borrow().is_running() {
                let _ = app.hide();
                let _ = slint::quit_event_loop();
                return;
            }
            refresh(&app, &monitor.borrow(), &shown);
        });
    }

    // Window close asks first
    {
        let app_weak = app.as_weak();
        let monitor = monitor.clone();
        let shown = shown.clone();
        app.window().on_close_requested(move || {
            if let Some(app) = app_weak.upgrade() {
                monitor.borrow_mut().request_quit();
                refresh(&app, &monitor.borrow(), &shown);
            }
            slint::CloseRequestResponse::KeepWindowShown
        });
    }

    // Driver loop
    let app_weak = app.as_weak();
    let monitor_clone = monitor.clone();
    let timer = slint::Timer::default();
    timer.start(slint::TimerMode::Repeated, TICK, move || {
        let Some(app) = app_weak.upgrade() else { return };
        let changed = monitor_clone.borrow_mut().tick();
        if changed {
            refresh(&app, &monitor_clone.borrow(), &shown);
        }
    });

    app.run()?;
    timer.stop();

    if let Some(path) = settings_path {
        remember(&app, settings, &path)?;
    }
    Ok(())
}

fn remember(app: &MainWindow, mut settings: Settings, path: &Path) -> Result<()> {
    settings.port = app.get_port_name().to_string();
    settings.file_name = app.get_file_name().to_string();
    settings.auto_save = app.get_auto_save();
    settings.auto_scroll = app.get_auto_scroll();
    settings.encoding = app.get_encoding().to_string();
    settings.save(path)?;
    log::info!("settings saved to {}", path.display());
    Ok(())
}

/// Pushes monitor state into the window. Log panes are only re-sent when
/// their revision moved since the last call.
fn refresh(app: &MainWindow, monitor: &Monitor<SystemPorts>, shown: &Cell<Option<Shown>>) {
    let log = monitor.log();
    let now = Shown {
        system: log.system_revision(),
        output: log.output_revision(),
    };
    let before = shown.get();

    if before.map(|b| b.system) != Some(now.system) {
        app.set_log_text(log.system_text().into());
        app.invoke_scroll_log_to_end();
    }

    if before.map(|b| b.output) != Some(now.output) {
        app.set_output_text(log.output_text().into());
        if app.get_auto_scroll() {
            app.invoke_scroll_output_to_end();
        }
    }
    shown.set(Some(now));

    let connected = monitor.state() == ConnectionState::Connected;
    app.set_connected(connected);
    let status = match monitor.port_name() {
        Some(name) if connected => format!("Connected to {name}"),
        _ => "Disconnected".to_string(),
    };
    app.set_status_text(status.into());

    match monitor.pending() {
        Some(prompt) => {
            app.set_prompt_title(prompt.title().into());
            app.set_prompt_message(prompt.message().into());
            app.set_prompt_visible(true);
        }
        None => app.set_prompt_visible(false),
    }
}
