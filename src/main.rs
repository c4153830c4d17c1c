use std::future::Future;
use std::path::PathBuf;

use iced::alignment;
use iced::futures::{SinkExt, Stream};
use iced::widget::{button, checkbox, column, container, horizontal_space, row, scrollable, text, text_input};
use iced::{Element, Length, Size, Task, Theme};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing_subscriber::EnvFilter;

mod config;
mod deps;
mod download;
mod messages;
mod process;
mod update;


use config::{SettingsStore, CONFIG_FILE, OUTPUT_DIR_KEY};
use deps::BinPaths;
use download::DownloadRequest;
use messages::{Message, WorkerEvent};
use process::LineSink;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    iced::application(App::title, App::update, App::view)
        .window(iced::window::Settings {
            size: Size::new(600.0, 600.0),
            resizable: false,
            ..Default::default()
        })
        .theme(App::theme)
        .run_with(|| (App::new(), Task::none()))
}

/// Gate for the download and update buttons: both are disabled together
/// while either operation is in flight, so at most one child process can be
/// launched from this window at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Busy,
}

struct App {
    bin_paths: BinPaths,
    settings: SettingsStore,
    url: String,
    save_path: String,
    audio_only: bool,
    phase: Phase,
    deps_ok: bool,
    console: Vec<String>,
}

impl App {
    fn new() -> Self {
        Self::with_parts(BinPaths::resolve(), SettingsStore::new(CONFIG_FILE))
    }

    fn with_parts(bin_paths: BinPaths, settings: SettingsStore) -> Self {
        let save_path = settings
            .get(OUTPUT_DIR_KEY)
            .and_then(|value| value.as_str().map(str::to_owned))
            .unwrap_or_default();

        let mut app = App {
            bin_paths,
            settings,
            url: String::new(),
            save_path,
            audio_only: false,
            phase: Phase::Ready,
            deps_ok: true,
            console: Vec::new(),
        };
        app.console.push(format!("yt-dlp Simplified {VERSION}"));
        app.run_startup_checks();
        app
    }

    fn run_startup_checks(&mut self) {
        self.console.push("Executing file check...".to_string());

        let problems = self.bin_paths.check();
        if problems.is_empty() {
            self.console.push("Dependencies found. Standby...".to_string());
        } else {
            for problem in problems {
                self.console.push(format!("Error: {problem}"));
            }
            self.console
                .push("Error: Add missing files to the bins folder or fix permissions.".to_string());
            self.deps_ok = false;
            self.console
                .push("All operations disabled until dependencies are fixed.".to_string());
        }
    }

    fn title(&self) -> String {
        format!("yt-dlp Simplified {VERSION}")
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn actions_enabled(&self) -> bool {
        self.deps_ok && self.phase == Phase::Ready
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::UrlChanged(url) => {
                self.url = url;
                Task::none()
            }
            Message::AudioOnlyToggled(audio_only) => {
                self.audio_only = audio_only;
                Task::none()
            }
            Message::BrowsePressed => Task::perform(
                async {
                    rfd::AsyncFileDialog::new()
                        .set_title("Choose save location...")
                        .pick_folder()
                        .await
                        .map(|handle| handle.path().to_path_buf())
                },
                Message::FolderSelected,
            ),
            Message::FolderSelected(Some(path)) => {
                self.save_path = path.to_string_lossy().into_owned();
                if let Err(e) = self.settings.write(OUTPUT_DIR_KEY, self.save_path.as_str()) {
                    tracing::warn!(error = %e, "failed to persist output directory");
                    self.console
                        .push("Warning: Could not save location.".to_string());
                    return Self::snap_console();
                }
                Task::none()
            }
            Message::FolderSelected(None) => Task::none(),
            Message::DownloadPressed => self.start_download(),
            Message::UpdatePressed => self.start_update(),
            Message::Worker(WorkerEvent::Line(line)) => {
                self.console.push(line);
                Self::snap_console()
            }
            Message::Worker(WorkerEvent::Finished) => {
                self.phase = Phase::Ready;
                Task::none()
            }
        }
    }

    fn start_download(&mut self) -> Task<Message> {
        // Enter in the URL field can fire this while disabled or busy.
        if !self.actions_enabled() {
            return Task::none();
        }

        let url = self.url.trim().to_string();
        let save_path = self.save_path.trim().to_string();

        if url.is_empty() {
            self.console.push("Error: Please enter a valid URL.".to_string());
            return Self::snap_console();
        }
        if save_path.is_empty() {
            self.console
                .push("Error: Please choose a save location (directory).".to_string());
            return Self::snap_console();
        }
        if !download::verify_link(&url) {
            self.console.push("Error: Invalid URL provided.".to_string());
            return Self::snap_console();
        }

        self.phase = Phase::Busy;
        self.console.push(format!("Starting download for: {url}"));

        let paths = self.bin_paths.clone();
        let request = DownloadRequest {
            link: url,
            audio_only: self.audio_only,
            save_dir: PathBuf::from(save_path),
        };
        Task::batch([
            Self::snap_console(),
            Task::run(
                worker_stream(move |mut sink| async move {
                    download::run_download(&paths, &request, &mut sink).await;
                }),
                Message::Worker,
            ),
        ])
    }

    fn start_update(&mut self) -> Task<Message> {
        if !self.actions_enabled() {
            return Task::none();
        }

        self.phase = Phase::Busy;
        self.console.push("Initializing yt-dlp update...".to_string());

        let paths = self.bin_paths.clone();
        Task::batch([
            Self::snap_console(),
            Task::run(
                worker_stream(move |mut sink| async move {
                    update::run_update(&paths, &mut sink).await;
                }),
                Message::Worker,
            ),
        ])
    }

    fn console_id() -> scrollable::Id {
        scrollable::Id::new("console")
    }

    fn snap_console() -> Task<Message> {
        scrollable::snap_to(Self::console_id(), scrollable::RelativeOffset::END)
    }

    fn view(&self) -> Element<'_, Message> {
        let actions_enabled = self.actions_enabled();

        let url_row = row![
            text("Enter URL:"),
            text_input("https://...", &self.url)
                .on_input(Message::UrlChanged)
                .on_submit(Message::DownloadPressed)
                .padding(8),
        ]
        .spacing(10)
        .align_y(alignment::Vertical::Center);

        let browse_label = if self.save_path.is_empty() {
            "Choose Location"
        } else {
            "Change Location"
        };
        // The location field is display-only; it has no on_input and is
        // populated from the settings store and the folder picker.
        let location_row = row![
            button(text(browse_label))
                .on_press(Message::BrowsePressed)
                .padding(8),
            text_input("No location chosen", &self.save_path).padding(8),
        ]
        .spacing(10)
        .align_y(alignment::Vertical::Center);

        let controls_row = row![
            checkbox("Audio only", self.audio_only).on_toggle(Message::AudioOnlyToggled),
            horizontal_space(),
            button(text("Update yt-dlp"))
                .on_press_maybe(actions_enabled.then_some(Message::UpdatePressed))
                .padding(8),
            button(text("Download"))
                .on_press_maybe(actions_enabled.then_some(Message::DownloadPressed))
                .padding(8),
        ]
        .spacing(10)
        .align_y(alignment::Vertical::Center);

        let lines: Vec<Element<'_, Message>> = self
            .console
            .iter()
            .map(|line| text(line.as_str()).size(13).into())
            .collect();
        let console = scrollable(column(lines).spacing(2).width(Length::Fill))
        .id(Self::console_id())
        .width(Length::Fill)
        .height(Length::Fill);

        container(column![url_row, location_row, controls_row, console].spacing(10))
            .padding(10)
            .into()
    }
}

/// Adapter between the runner's synchronous sink and the async message
/// stream: lines go through an unbounded channel so the worker never blocks
/// on the UI.
struct ChannelSink {
    tx: UnboundedSender<String>,
}

impl LineSink for ChannelSink {
    fn accept(&mut self, line: String) {
        let _ = self.tx.send(line);
    }
}

/// Runs one background unit of work, yielding each of its console lines in
/// order and a final `Finished` once the work is done. The stream is drained
/// by the runtime's single event loop, which preserves ordering without
/// exposing raw threads to the rest of the application.
fn worker_stream<F, Fut>(work: F) -> impl Stream<Item = WorkerEvent>
where
    F: FnOnce(ChannelSink) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    iced::stream::channel(16, move |mut output| async move {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(work(ChannelSink { tx }));

        while let Some(line) = rx.recv().await {
            let _ = output.send(WorkerEvent::Line(line)).await;
        }
        if let Err(e) = worker.await {
            let _ = output
                .send(WorkerEvent::Line(format!("An unexpected error occurred: {e}")))
                .await;
        }
        let _ = output.send(WorkerEvent::Finished).await;
    })
}
