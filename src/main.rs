mod app;
mod application;
mod domain;
mod service;
mod ui;
mod utils;

use iced::{window, Size};

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application(app::QueueApp::default, app::update, app::view)
        .title("Media Queue Downloader")
        .window(window::Settings {
            size: Size::new(900.0, 640.0),
            ..Default::default()
        })
        .run()
}
