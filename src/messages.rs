use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Message {
    UrlChanged(String),
    AudioOnlyToggled(bool),
    BrowsePressed,
    FolderSelected(Option<PathBuf>),
    DownloadPressed,
    UpdatePressed,
    Worker(WorkerEvent),
}

/// Events produced by a background download or update, delivered through
/// the runtime's message queue so the console only ever mutates on the UI
/// loop.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Line(String),
    Finished,
}
