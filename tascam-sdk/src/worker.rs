//! Background link worker
//!
//! Spawns a thread with its own single-threaded tokio runtime to run the
//! link supervisor, so the deck API can stay synchronous.

use std::thread::{self, JoinHandle};

use tascam_link::Supervisor;

pub fn spawn_link_worker(supervisor: Supervisor) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tascam-link".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to create tokio runtime for link worker: {}", e);
                    return;
                }
            };

            rt.block_on(supervisor.run());
        })
}
