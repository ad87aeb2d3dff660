pub mod config;
pub mod cycle;
pub mod error;
pub mod events;
pub mod images;
pub mod merge;
pub mod parser;
pub mod playback;
pub mod properties;
pub mod scan;
pub mod scheduler;
pub mod segment;
pub mod tasks {
    pub mod clock;
}
